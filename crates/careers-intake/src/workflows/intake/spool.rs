use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Scoped holder for the uploaded CV bytes on local disk.
///
/// Ingestion writes the multipart file part here and hands the spool to the
/// orchestrator. Dropping it removes the file, so no exit path can leave the
/// upload behind.
#[derive(Debug)]
pub struct SpooledCv {
    file: NamedTempFile,
}

impl SpooledCv {
    /// Write the uploaded bytes to a fresh temporary file.
    pub fn write(bytes: &[u8]) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new().prefix("cv-").tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the spooled bytes back for upload.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }
}
