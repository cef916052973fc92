//! Turns user-selected files into [`EncodedImage`]s.

use crate::error::{RetouchError, Result};
use crate::image::types::{EncodedImage, ImageFormat};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Data-URL prefixes stripped before transmission.
const DATA_URL_PREFIXES: [&str; 4] = [
    "data:image/png;base64,",
    "data:image/jpeg;base64,",
    "data:image/jpg;base64,",
    "data:image/webp;base64,",
];

/// MIME type reported for content that is not a recognised image.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Image extensions beyond those covered by [`ImageFormat`].
const EXTRA_EXTENSIONS: [(&str, &str); 9] = [
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("avif", "image/avif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
];

/// A file-like input: a declared MIME type and readable binary content.
pub trait ImageSource {
    /// The declared MIME type.
    ///
    /// Sources that must inspect their content to answer may fail with the
    /// underlying read error.
    fn mime_type(&self) -> std::io::Result<String>;

    /// Reads the full binary content.
    fn read_bytes(&self) -> std::io::Result<Vec<u8>>;
}

/// An image file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    mime_type: Option<String>,
}

impl FileSource {
    /// Opens `path`, inferring the MIME type from its extension, or failing
    /// that from its first bytes.
    ///
    /// Content that matches no known image signature is reported as
    /// `application/octet-stream` and will be rejected by [`encode`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_from_extension(&path).map(str::to_string);
        Self { path, mime_type }
    }

    /// Opens `path` with an explicitly declared MIME type.
    pub fn with_mime_type(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: Some(mime_type.into()),
        }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileSource {
    fn mime_type(&self) -> std::io::Result<String> {
        match self.mime_type {
            Some(ref mime_type) => Ok(mime_type.clone()),
            None => sniff_mime_type(&self.path).map(str::to_string),
        }
    }

    fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if let Some(format) = ImageFormat::from_extension(&ext) {
        return Some(format.mime_type());
    }
    EXTRA_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Identifies an image by its leading bytes. Open and read errors propagate.
fn sniff_mime_type(path: &Path) -> std::io::Result<&'static str> {
    let mut header = Vec::with_capacity(12);
    std::fs::File::open(path)?
        .take(12)
        .read_to_end(&mut header)?;

    if let Some(format) = ImageFormat::from_magic_bytes(&header) {
        return Ok(format.mime_type());
    }

    let mime = if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        "image/gif"
    } else if header.starts_with(b"BM") {
        "image/bmp"
    } else if header.starts_with(b"II*\0") || header.starts_with(b"MM\0*") {
        "image/tiff"
    } else if header.len() == 12 && &header[4..8] == b"ftyp" {
        match &header[8..12] {
            b"heic" | b"heix" => "image/heic",
            b"mif1" | b"msf1" => "image/heif",
            b"avif" | b"avis" => "image/avif",
            _ => UNKNOWN_MIME,
        }
    } else {
        UNKNOWN_MIME
    };
    Ok(mime)
}

/// Image bytes already held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    mime_type: String,
    bytes: Vec<u8>,
}

impl InMemorySource {
    /// Creates a source from bytes and their declared MIME type.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

impl ImageSource for InMemorySource {
    fn mime_type(&self) -> std::io::Result<String> {
        Ok(self.mime_type.clone())
    }

    fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Reads and base64-encodes an image source.
///
/// The MIME type is checked before the content is read: a type not
/// starting with `image/` fails with [`RetouchError::InvalidInput`]. Read
/// failures, including those hit while sniffing the type, surface as
/// [`RetouchError::Io`].
pub fn encode(source: &impl ImageSource) -> Result<EncodedImage> {
    let mime_type = source.mime_type()?;
    if !mime_type.starts_with("image/") {
        return Err(RetouchError::InvalidInput(format!(
            "not an image file (type: {mime_type})"
        )));
    }

    let bytes = source.read_bytes()?;
    tracing::debug!(
        mime_type = mime_type.as_str(),
        size_bytes = bytes.len(),
        "encoded input image"
    );
    EncodedImage::from_bytes(&bytes, mime_type)
}

/// Strips a leading `data:image/(png|jpeg|jpg|webp);base64,` prefix.
///
/// Other prefixes are left untouched.
pub fn strip_data_url_prefix(data: &str) -> &str {
    DATA_URL_PREFIXES
        .iter()
        .find_map(|prefix| data.strip_prefix(prefix))
        .unwrap_or(data)
}
