//! Writes a build configuration's outputs to disk.
//!
//! The bundler owns script and stylesheet bundling. Emitting covers what the
//! configuration fully determines on its own: the HTML documents, the copied
//! asset folders, and the configuration file handed to the bundler.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;

use crate::assets::{copy_assets, CopyError};
use crate::config::BuildConfig;

/// File name of the serialized configuration inside the build directory.
pub const CONFIG_FILE_NAME: &str = "trellis.config.json";

static BETWEEN_TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s*\n\s*<").expect("Invalid between-tags regex"));

static WHITESPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("Invalid whitespace regex"));

// Elements whose text is kept byte for byte; one capture group per element
static RAW_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>(.*?)</script\s*>|<style\b[^>]*>(.*?)</style\s*>|<pre\b[^>]*>(.*?)</pre\s*>|<textarea\b[^>]*>(.*?)</textarea\s*>",
    )
    .expect("Invalid raw text regex")
});

/// Result of an emit.
#[derive(Debug)]
pub struct EmitReport {
    /// Number of HTML documents written
    pub pages: usize,

    /// Number of asset files copied
    pub assets: usize,

    /// Where the configuration was written
    pub config_path: PathBuf,

    /// Total emit time in milliseconds
    pub duration_ms: u64,
}

/// Errors that can occur while emitting.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy assets: {0}")]
    Copy(#[from] CopyError),

    #[error("Failed to serialize build configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> EmitError + '_ {
    move |source| EmitError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Write pages, copy assets and save the configuration.
pub fn emit(config: &BuildConfig) -> Result<EmitReport, EmitError> {
    let start = Instant::now();
    let out = &config.output_path;

    if config.clean_output && out.exists() {
        fs::remove_dir_all(out).map_err(write_error(out))?;
    }
    fs::create_dir_all(out).map_err(write_error(out))?;

    let mut pages = 0;
    for task in config.pages() {
        let path = out.join(&task.output_filename);
        let html = if task.collapse_whitespace {
            collapse_whitespace(&task.rendered_markup)
        } else {
            task.rendered_markup.clone()
        };

        fs::write(&path, html).map_err(write_error(&path))?;
        tracing::debug!("Wrote {}", path.display());
        pages += 1;
    }

    let assets = copy_assets(config.copy_instructions())?;

    let config_path = out.join(CONFIG_FILE_NAME);
    fs::write(&config_path, config.to_json()?).map_err(write_error(&config_path))?;

    Ok(EmitReport {
        pages,
        assets,
        config_path,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Collapse whitespace in an HTML document.
///
/// Whitespace spanning a line break between two tags is removed; any other
/// run of whitespace becomes a single space. The contents of `script`,
/// `style`, `pre` and `textarea` elements are left untouched.
pub fn collapse_whitespace(html: &str) -> String {
    let html = html.trim();
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for caps in RAW_TEXT_RE.captures_iter(html) {
        let Some(text) = caps.iter().skip(1).flatten().next() else {
            continue;
        };

        out.push_str(&collapse_markup(&html[last..text.start()]));
        out.push_str(text.as_str());
        last = text.end();
    }
    out.push_str(&collapse_markup(&html[last..]));

    out
}

fn collapse_markup(markup: &str) -> String {
    let markup = BETWEEN_TAGS_RE.replace_all(markup, "><");
    WHITESPACE_RUN_RE.replace_all(&markup, " ").into_owned()
}
