//! Project configuration file (trellis.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use trellis_build::{resolve_in, ProjectLayout};

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub pages: PagesConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default = "default_src")]
    pub src: String,
    /// Relative to `src`
    #[serde(default = "default_pages")]
    pub pages: String,
    #[serde(default = "default_public")]
    pub public: String,
    #[serde(default = "default_build")]
    pub build: String,
    /// Relative to `src`
    #[serde(default = "default_entry")]
    pub entry: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylesConfig {
    #[serde(default = "default_style_extension")]
    pub extension: String,
    /// Relative to `src`
    #[serde(default = "default_generated_file")]
    pub generated_file: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagesConfig {
    #[serde(default = "default_page_extension")]
    pub extension: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetsConfig {
    #[serde(default = "default_copy")]
    pub copy: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_open")]
    pub open: bool,
    pub watch: Option<Vec<String>>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            pages: default_pages(),
            public: default_public(),
            build: default_build(),
            entry: default_entry(),
        }
    }
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            extension: default_style_extension(),
            generated_file: default_generated_file(),
        }
    }
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            extension: default_page_extension(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            copy: default_copy(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            open: default_open(),
            watch: None,
        }
    }
}

fn default_src() -> String {
    "src".to_string()
}
fn default_pages() -> String {
    "pages".to_string()
}
fn default_public() -> String {
    "public".to_string()
}
fn default_build() -> String {
    "build".to_string()
}
fn default_entry() -> String {
    "app.js".to_string()
}
fn default_style_extension() -> String {
    trellis_build::DEFAULT_STYLE_EXTENSION.to_string()
}
fn default_generated_file() -> String {
    "styles.js".to_string()
}
fn default_page_extension() -> String {
    trellis_build::DEFAULT_PAGE_EXTENSION.to_string()
}
fn default_copy() -> Vec<String> {
    vec!["assets".to_string()]
}
fn default_port() -> u16 {
    8888
}
fn default_open() -> bool {
    true
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());

        Ok(config)
    }

    /// Project layout rooted at `root`.
    pub fn layout(&self, root: &Path) -> ProjectLayout {
        let mut layout = ProjectLayout::new(root);
        let source_dir = resolve_in(root, &self.paths.src);

        layout.pages_dir = resolve_in(&source_dir, &self.paths.pages);
        layout.entry = resolve_in(&source_dir, &self.paths.entry);
        layout.generated_style_file = resolve_in(&source_dir, &self.styles.generated_file);
        layout.public_dir = resolve_in(root, &self.paths.public);
        layout.build_dir = resolve_in(root, &self.paths.build);
        layout.style_extension = self.styles.extension.trim_start_matches('.').to_string();
        layout.page_extension = self.pages.extension.trim_start_matches('.').to_string();
        layout.copy_folders = self.assets.copy.clone();
        layout.dev_port = self.server.port;
        layout.open_browser = self.server.open;
        if let Some(watch) = &self.server.watch {
            layout.watch_files = watch.clone();
        }

        // Aliases follow the configured directories
        for (alias, dir) in [
            ("@assets", layout.public_dir.join("assets")),
            ("@app", source_dir.join("app")),
            ("@components", source_dir.join("components")),
            ("@shared", source_dir.join("shared")),
        ] {
            layout.aliases.insert(alias.to_string(), dir);
        }
        layout.source_dir = source_dir;

        layout
    }
}

/// Directory the config file lives in, which is the project root.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
