//! The bundler configuration produced by a build.
//!
//! [`BuildConfig`] is the single value handed to the external bundler. It is
//! serialized as camelCase JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use trellis_pages::PageTask;

use crate::assets::CopyInstruction;

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn is_dev(self) -> bool {
        self == Mode::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mode flag is neither `development` nor `production`.
#[derive(Debug, thiserror::Error)]
#[error("Unknown build mode '{0}': expected 'development' or 'production'")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Mode::Development),
            "production" => Ok(Mode::Production),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// How source maps are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceMapMode {
    /// Full maps inlined into the evaluated modules
    #[serde(rename = "eval-source-map")]
    Inline,

    /// Separate `.map` files
    #[serde(rename = "source-map")]
    External,
}

impl SourceMapMode {
    pub fn for_mode(mode: Mode) -> Self {
        if mode.is_dev() {
            SourceMapMode::Inline
        } else {
            SourceMapMode::External
        }
    }
}

/// A loader in a rule's loader chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loader {
    /// Loader name
    pub loader: String,

    /// Loader options
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl Loader {
    pub fn new(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
            options: Value::Null,
        }
    }

    pub fn with_options(loader: &str, options: Value) -> Self {
        Self {
            loader: loader.to_string(),
            options,
        }
    }
}

/// A module rule: which files it matches and how they are handled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModuleRule {
    /// Files run through a loader chain (applied last to first)
    #[serde(rename_all = "camelCase")]
    Loaders { test: String, uses: Vec<Loader> },

    /// Files emitted as separate resources
    #[serde(rename = "asset/resource", rename_all = "camelCase")]
    AssetResource {
        test: String,
        /// JavaScript `RegExp` flags for `test`
        #[serde(skip_serializing_if = "String::is_empty")]
        flags: String,
        filename: String,
    },
}

impl ModuleRule {
    /// Pattern of file names the rule applies to.
    pub fn test(&self) -> &str {
        match self {
            ModuleRule::Loaders { test, .. } | ModuleRule::AssetResource { test, .. } => test,
        }
    }
}

/// A plugin the bundler should run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "plugin", rename_all = "camelCase")]
pub enum PluginDescriptor {
    /// Generate one HTML document
    Html(PageTask),

    /// Copy asset folders into the output
    Copy { patterns: Vec<CopyInstruction> },

    /// Extract styles into standalone CSS files
    #[serde(rename_all = "camelCase")]
    CssExtract { filename: String },

    /// Compile-time constants; values are JavaScript expressions
    Define { definitions: BTreeMap<String, String> },
}

/// Dev-server behavior, present only for interactive builds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevServerOptions {
    /// Directory served as-is
    pub static_dir: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Open a browser on start
    pub open: bool,

    /// Serve `index.html` for unknown paths
    pub history_api_fallback: bool,

    /// Reload on change
    pub hot: bool,

    /// Globs (relative to the project root) that trigger a rebuild
    pub watch_files: Vec<String>,
}

/// Minimizers run when minimization is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Minimizer {
    CssMinimizer,
    Terser,
}

/// The complete configuration handed to the bundler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub mode: Mode,
    pub entry_path: PathBuf,
    pub output_path: PathBuf,
    pub output_filename_pattern: String,
    /// Empty the output directory before writing
    pub clean_output: bool,
    pub module_rules: Vec<ModuleRule>,
    pub plugins: Vec<PluginDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServerOptions>,
    pub resolve_aliases: BTreeMap<String, PathBuf>,
    pub resolve_extensions: Vec<String>,
    pub source_map_mode: SourceMapMode,
    pub minimize_enabled: bool,
    pub minimizers: Vec<Minimizer>,
}

impl BuildConfig {
    /// HTML documents to generate, in discovery order.
    pub fn pages(&self) -> impl Iterator<Item = &PageTask> {
        self.plugins.iter().filter_map(|p| match p {
            PluginDescriptor::Html(task) => Some(task),
            _ => None,
        })
    }

    /// Asset copy instructions.
    pub fn copy_instructions(&self) -> impl Iterator<Item = &CopyInstruction> {
        self.plugins
            .iter()
            .filter_map(|p| match p {
                PluginDescriptor::Copy { patterns } => Some(patterns),
                _ => None,
            })
            .flatten()
    }

    /// Look up a compile-time constant.
    pub fn definition(&self, key: &str) -> Option<&str> {
        self.plugins.iter().find_map(|p| match p {
            PluginDescriptor::Define { definitions } => definitions.get(key).map(String::as_str),
            _ => None,
        })
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
