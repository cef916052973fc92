//! Image encoding and the request/result types.

pub mod encoder;
mod types;

pub use encoder::{encode, FileSource, ImageSource, InMemorySource};
pub use types::{EncodedImage, ImageFormat, TransformationRequest, TransformedImage};
