//! Keeps the generated style entry file on disk in sync.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::aggregate::ImportStatement;
use crate::error::StyleError;
use crate::region::ManagedRegion;

/// What a sync did to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The file content changed and was written
    Written,

    /// The file already had the desired content
    Unchanged,
}

/// The generated style entry file.
#[derive(Debug, Clone)]
pub struct GeneratedStyleFile {
    path: PathBuf,
    region: ManagedRegion,
}

impl GeneratedStyleFile {
    /// Create a handle for the generated file at `path`.
    pub fn new(path: impl Into<PathBuf>, extension: &str) -> Result<Self, StyleError> {
        Ok(Self {
            path: path.into(),
            region: ManagedRegion::new(extension)?,
        })
    }

    /// Rewrite the managed region with `imports`.
    ///
    /// A missing file is treated as empty. The file is only written when the
    /// rendered content differs from what is on disk. The write is not atomic;
    /// a single writer is assumed.
    pub fn sync(&self, imports: &[ImportStatement]) -> Result<SyncOutcome, StyleError> {
        let current = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(StyleError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let desired = self.region.render(&current, imports)?;
        if desired == current {
            tracing::debug!("{} is up to date", self.path.display());
            return Ok(SyncOutcome::Unchanged);
        }

        fs::write(&self.path, desired).map_err(|e| StyleError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        tracing::info!(
            "Wrote {} style imports to {}",
            imports.len(),
            self.path.display()
        );

        Ok(SyncOutcome::Written)
    }
}

/// Sync `imports` into the file at `target`.
pub fn sync(
    imports: &[ImportStatement],
    target: &Path,
    extension: &str,
) -> Result<SyncOutcome, StyleError> {
    GeneratedStyleFile::new(target, extension)?.sync(imports)
}
