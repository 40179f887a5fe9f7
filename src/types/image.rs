//! The image picked by the user

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::PathBuf;
use std::sync::Arc;

/// Raw file contents of the selected image. Decoding is deferred to prediction time.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    /// Path the image was read from
    pub path: PathBuf,
    /// File bytes, shared with inference workers
    pub bytes: Arc<[u8]>,
}

impl SelectedImage {
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// MIME type sniffed from the file header
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream")
    }

    /// `data:<mime>;base64,<payload>` URL of the file
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
