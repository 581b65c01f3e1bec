//! Recursive style fragment discovery.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::StyleError;

/// Extension of style fragments when none is configured.
pub const DEFAULT_EXTENSION: &str = "pcss";

/// A style fragment found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPath {
    /// Path as produced by the traversal (rooted at the scanned directory)
    pub path: PathBuf,

    /// Path relative to the source root, always `/`-separated
    pub relative: String,
}

/// A generated `import "./<relative>";` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    fragment: FragmentPath,
}

impl ImportStatement {
    pub fn new(fragment: FragmentPath) -> Self {
        Self { fragment }
    }

    /// The fragment this statement imports.
    pub fn fragment(&self) -> &FragmentPath {
        &self.fragment
    }

    /// Render the statement as a single source line, without the newline.
    pub fn line(&self) -> String {
        format!("import \"./{}\";", self.fragment.relative)
    }
}

impl fmt::Display for ImportStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}

/// Walks a directory tree and collects style fragments.
#[derive(Debug, Clone)]
pub struct StyleAggregator {
    source_root: PathBuf,
    suffix: String,
}

impl StyleAggregator {
    /// Create an aggregator whose import paths are relative to `source_root`.
    ///
    /// `extension` is given without the leading dot (e.g. `"pcss"`).
    pub fn new(source_root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            source_root: source_root.into(),
            suffix: format!(".{}", extension.trim_start_matches('.')),
        }
    }

    /// Collect one import statement per fragment under `root_dir`.
    ///
    /// Traversal is depth-first in directory-listing order: a subdirectory's
    /// fragments appear where the subdirectory itself is listed. Entries are
    /// not sorted. A missing or unreadable directory is an error.
    pub fn aggregate(&self, root_dir: &Path) -> Result<Vec<ImportStatement>, StyleError> {
        let mut imports = Vec::new();

        for entry in WalkDir::new(root_dir).follow_links(true) {
            let entry = entry.map_err(|e| walk_error(root_dir, e))?;

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !name.ends_with(&self.suffix) {
                continue;
            }

            let path = entry.path();
            let relative = self.relative_path(path, root_dir);
            tracing::debug!("Found style fragment {}", relative);

            imports.push(ImportStatement::new(FragmentPath {
                path: path.to_path_buf(),
                relative,
            }));
        }

        Ok(imports)
    }

    /// Relative, `/`-separated path of a fragment.
    ///
    /// Fragments outside the source root are made relative to the scanned
    /// directory instead.
    fn relative_path(&self, path: &Path, root_dir: &Path) -> String {
        let relative = path
            .strip_prefix(&self.source_root)
            .or_else(|_| path.strip_prefix(root_dir))
            .unwrap_or(path);

        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn walk_error(root_dir: &Path, err: walkdir::Error) -> StyleError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root_dir.to_path_buf());

    let source = match err.into_io_error() {
        Some(io) => io,
        None => std::io::Error::other("filesystem loop detected"),
    };

    StyleError::Io { path, source }
}
