//! Asset folder copy instructions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

/// Copy one folder from the public root into the build root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyInstruction {
    /// Folder to copy from
    pub source_path: PathBuf,

    /// Folder to copy into
    pub destination_path: PathBuf,

    /// Whether a missing source fails the copy step
    pub missing_is_fatal: bool,
}

/// Map folder names to copy instructions.
///
/// A missing source folder only produces a warning; the instruction is still
/// returned and tolerates the absence at copy time.
pub fn build_copy_specs<S: AsRef<str>>(
    folder_names: &[S],
    public_root: &Path,
    build_root: &Path,
) -> Vec<CopyInstruction> {
    folder_names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let source_path = public_root.join(name);

            if !source_path.exists() {
                tracing::warn!("Source folder \"{}\" does not exist", source_path.display());
            }

            CopyInstruction {
                source_path,
                destination_path: build_root.join(name),
                missing_is_fatal: false,
            }
        })
        .collect()
}

/// Errors that can occur while copying assets.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("Source folder not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to copy {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Carry out copy instructions. Returns the number of files copied.
pub fn copy_assets<'a>(
    instructions: impl IntoIterator<Item = &'a CopyInstruction>,
) -> Result<usize, CopyError> {
    let mut copied = 0;

    for instruction in instructions {
        if !instruction.source_path.exists() {
            if instruction.missing_is_fatal {
                return Err(CopyError::MissingSource(instruction.source_path.clone()));
            }
            tracing::debug!(
                "Skipping missing asset folder {}",
                instruction.source_path.display()
            );
            continue;
        }

        copied += copy_tree(&instruction.source_path, &instruction.destination_path)?;
    }

    Ok(copied)
}

fn copy_tree(source: &Path, destination: &Path) -> Result<usize, CopyError> {
    let mut copied = 0;

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| CopyError::Io {
            path: e.path().unwrap_or(source).to_path_buf(),
            source: e.into(),
        })?;

        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = destination.join(relative);
        let io_error = |e| CopyError::Io {
            path: entry.path().to_path_buf(),
            source: e,
        };

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_error)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
            fs::copy(entry.path(), &target).map_err(io_error)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn maps_folder_names_to_paths() {
        let specs = build_copy_specs(&["assets", "fonts"], Path::new("public"), Path::new("build"));

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].source_path, Path::new("public/assets"));
        assert_eq!(specs[0].destination_path, Path::new("build/assets"));
        assert_eq!(specs[1].destination_path, Path::new("build/fonts"));
    }

    #[test]
    fn missing_source_is_tolerated() {
        let temp = tempdir().unwrap();

        let specs = build_copy_specs(
            &["assets"],
            &temp.path().join("public"),
            &temp.path().join("build"),
        );

        assert_eq!(specs.len(), 1);
        assert!(!specs[0].missing_is_fatal);
        assert_eq!(copy_assets(&specs).unwrap(), 0);
    }

    #[test]
    fn copies_nested_files() {
        let temp = tempdir().unwrap();
        let public = temp.path().join("public");
        let build = temp.path().join("build");
        fs::create_dir_all(public.join("assets/images")).unwrap();
        fs::write(public.join("assets/logo.svg"), "<svg/>").unwrap();
        fs::write(public.join("assets/images/map.png"), [0u8; 4]).unwrap();

        let specs = build_copy_specs(&["assets"], &public, &build);
        let copied = copy_assets(&specs).unwrap();

        assert_eq!(copied, 2);
        assert!(build.join("assets/logo.svg").exists());
        assert!(build.join("assets/images/map.png").exists());
    }

    #[test]
    fn fatal_missing_source_errors() {
        let temp = tempdir().unwrap();
        let instruction = CopyInstruction {
            source_path: temp.path().join("nope"),
            destination_path: temp.path().join("out"),
            missing_is_fatal: true,
        };

        let result = copy_assets([&instruction]);

        assert!(matches!(result, Err(CopyError::MissingSource(_))));
    }
}
