use std::io::Write;
use std::path::Path;

use tempfile::TempPath;

/// A document snapshot written to the system temp directory for the analyzer
/// to read.
///
/// The file is deleted by [`StagedFile::remove`] or, failing that, when the
/// value is dropped. Removal errors are logged and otherwise ignored.
#[derive(Debug)]
pub struct StagedFile {
    path: Option<TempPath>,
}

impl StagedFile {
    /// Write `text` to `temp_<unix-millis>_<random>.yml` in the temp directory.
    pub fn create(text: &str) -> std::io::Result<Self> {
        Self::create_in(&std::env::temp_dir(), text)
    }

    pub fn create_in(dir: &Path, text: &str) -> std::io::Result<Self> {
        let prefix = format!("temp_{}_", chrono::Utc::now().timestamp_millis());
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".yml")
            .tempfile_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;

        // Close our handle so the analyzer can open the file on every platform.
        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), bytes = text.len(), "staged document");
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Delete the staged file now.
    pub fn remove(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let shown = path.display().to_string();
        match path.close() {
            Ok(()) => tracing::debug!(path = %shown, "removed staged file"),
            Err(error) => tracing::warn!(path = %shown, %error, "failed to remove staged file"),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.release();
    }
}
