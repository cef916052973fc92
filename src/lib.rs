#![warn(missing_docs)]
//! Retouch - edit images with natural-language instructions.
//!
//! Takes an image and an edit instruction, sends both to a Gemini
//! image-generation model, and returns the transformed image as a PNG
//! data URL.
//!
//! # Quick Start
//!
//! ```no_run
//! use retouch::{encode, ClientConfig, FileSource, TransformationClientBuilder, TransformationRequest};
//!
//! #[tokio::main]
//! async fn main() -> retouch::Result<()> {
//!     let client = TransformationClientBuilder::from_config(ClientConfig::from_env()).build()?;
//!     let image = encode(&FileSource::new("cat.png"))?;
//!     let request = TransformationRequest::new(image, "Give the cat a tiny wizard hat");
//!     let result = client.transform(&request).await?;
//!     result.save("wizard-cat.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `retouch` command-line front end.

mod error;
pub mod image;
pub mod session;
pub mod transform;

// Re-export error types at crate root
pub use error::{ErrorKind, RetouchError, Result, TransportError, FALLBACK_MESSAGE};

pub use image::{
    encode, EncodedImage, FileSource, ImageFormat, ImageSource, InMemorySource,
    TransformationRequest, TransformedImage,
};
pub use session::{Session, Status, Ticket};
pub use transform::{
    ClientConfig, GeminiModel, HttpTransport, TransformationClient, TransformationClientBuilder,
    Transport,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{RetouchError, Result};
    pub use crate::image::{encode, EncodedImage, FileSource, TransformationRequest, TransformedImage};
    pub use crate::session::{Session, Status};
    pub use crate::transform::{ClientConfig, TransformationClient};
}
