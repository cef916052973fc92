//! Transformation client and its network seam.

mod client;
mod transport;
mod wire;

pub use client::{
    ClientConfig, GeminiModel, TransformationClient, TransformationClientBuilder,
    API_KEY_ENV_VARS, DEFAULT_TIMEOUT,
};
pub use transport::{HttpTransport, Transport, DEFAULT_BASE_URL};
pub use wire::{GenerateContentRequest, GenerateContentResponse};

#[cfg(test)]
pub(crate) use client::tests::{client as mock_client, MockTransport};
