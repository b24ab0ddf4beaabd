//! Backend that serves a fixed image, for offline runs.

use std::path::Path;

use tracing::info;

use super::{GenerateFuture, GenerationRequest, TextToImage};

/// Always returns the same image bytes, whatever the prompt.
#[derive(Clone, Debug)]
pub struct FileSource {
    bytes: Vec<u8>,
}

impl FileSource {
    /// Reads the image once; every generation reuses it.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        info!(
            "Using {} ({} bytes) as the generated image",
            path.display(),
            bytes.len()
        );
        Ok(Self { bytes })
    }

    /// Wraps bytes already in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl TextToImage for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn generate<'a>(&'a self, _request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(async move { Ok(self.bytes.clone()) })
    }
}
