use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Receives the finished capture. The slice is only valid for the call.
pub trait CaptureSink: Send + Sync {
    fn save(&self, capture: &[u8]);
}

impl<F> CaptureSink for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn save(&self, capture: &[u8]) {
        self(capture)
    }
}

/// Writes each capture to a file, replacing what was there.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, capture: &[u8]) -> io::Result<()> {
        fs::write(&self.path, capture)
    }
}

impl CaptureSink for FileSink {
    fn save(&self, capture: &[u8]) {
        match self.write(capture) {
            Ok(()) => info!(
                path = %self.path.display(),
                bytes = capture.len(),
                "capture written"
            ),
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to write capture"
            ),
        }
    }
}
