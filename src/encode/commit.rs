use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::error::{WyrError, WyrResult};
use std::path::{Path, PathBuf};

/// Reserved final output path plus a hidden partial file next to it.
///
/// Writers produce their file elsewhere (the job's working directory). `commit` stages it as the
/// partial file and renames that into place, so the final path only ever holds a complete file.
/// Dropping an uncommitted guard removes the partial file.
#[derive(Debug)]
pub struct PartialOutput {
    final_path: PathBuf,
    partial_path: PathBuf,
    committed: bool,
}

impl PartialOutput {
    /// Reserve `final_path`, creating its parent directory.
    pub fn new(final_path: impl Into<PathBuf>) -> WyrResult<Self> {
        let final_path = final_path.into();
        let name = final_path
            .file_name()
            .ok_or_else(|| {
                WyrError::validation(format!(
                    "output path '{}' has no file name",
                    final_path.display()
                ))
            })?
            .to_string_lossy()
            .into_owned();
        ensure_parent_dir(&final_path)?;
        let partial_path = final_path.with_file_name(format!(".{name}.partial"));
        let _ = std::fs::remove_file(&partial_path);
        Ok(Self {
            final_path,
            partial_path,
            committed: false,
        })
    }

    /// Staging file used while committing.
    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    /// Final destination.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Move `written` to the final path.
    ///
    /// `written` may live on another filesystem; it is then copied to the partial file first.
    pub fn commit(mut self, written: &Path) -> WyrResult<PathBuf> {
        if std::fs::rename(written, &self.partial_path).is_err() {
            std::fs::copy(written, &self.partial_path).map_err(|e| {
                WyrError::encode(format!(
                    "failed to copy '{}' to '{}': {e}",
                    written.display(),
                    self.partial_path.display()
                ))
            })?;
            let _ = std::fs::remove_file(written);
        }
        std::fs::rename(&self.partial_path, &self.final_path).map_err(|e| {
            WyrError::encode(format!(
                "failed to move '{}' to '{}': {e}",
                self.partial_path.display(),
                self.final_path.display()
            ))
        })?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.partial_path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/commit.rs"]
mod tests;
