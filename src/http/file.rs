//! Whole-file loading for the static handler.

use bytes::Bytes;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Contents of a file loaded for a single response.
#[derive(Debug, Clone)]
pub struct Payload {
    content: Bytes,
}

impl Payload {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self { content: content.into() }
    }

    /// Exact byte length of the file.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn into_bytes(self) -> Bytes {
        self.content
    }
}

/// Reads the whole file at `path` into memory.
///
/// Returns `None` if the file cannot be opened or read for any reason. A
/// missing file, a permission error, a directory and an I/O error are all
/// reported the same way; the cause is only traced.
pub async fn load(path: &Path) -> Option<Payload> {
    match read_all(path).await {
        Ok(payload) => {
            tracing::trace!(path = %path.display(), bytes = payload.len(), "Loaded file");
            Some(payload)
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Failed to load file");
            None
        }
    }
}

async fn read_all(path: &Path) -> std::io::Result<Payload> {
    let mut file = File::open(path).await?;
    let len = file.metadata().await?.len() as usize;

    let mut content = Vec::with_capacity(len);
    file.read_to_end(&mut content).await?;

    Ok(Payload::new(content))
}
