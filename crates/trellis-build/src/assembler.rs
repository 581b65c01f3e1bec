//! Bundler configuration assembly.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use trellis_pages::{PageError, PageRegistry, PageSource, DEFAULT_PAGE_EXTENSION};
use trellis_styles::{GeneratedStyleFile, StyleAggregator, StyleError, DEFAULT_EXTENSION};

use crate::assets::build_copy_specs;
use crate::config::{
    BuildConfig, DevServerOptions, Loader, Minimizer, Mode, ModuleRule, PluginDescriptor,
    SourceMapMode,
};

/// Value embedded for `process.env.API_URL` when `API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:8888";

/// Environment variable carrying the API base URL.
pub const API_URL_VAR: &str = "API_URL";

/// Where things live in a project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Project root
    pub root: PathBuf,

    /// Source root; fragment imports are relative to it
    pub source_dir: PathBuf,

    /// Page modules directory
    pub pages_dir: PathBuf,

    /// Static files served as-is and copied into the build
    pub public_dir: PathBuf,

    /// Build output directory
    pub build_dir: PathBuf,

    /// Application entry module
    pub entry: PathBuf,

    /// Generated style entry file
    pub generated_style_file: PathBuf,

    /// Style fragment extension (without the dot)
    pub style_extension: String,

    /// Page module extension (without the dot)
    pub page_extension: String,

    /// Folders under the public root copied into the build
    pub copy_folders: Vec<String>,

    /// Dev-server port
    pub dev_port: u16,

    /// Open a browser when the dev server starts
    pub open_browser: bool,

    /// Globs relative to the root that trigger a dev rebuild
    pub watch_files: Vec<String>,

    /// Import aliases
    pub aliases: BTreeMap<String, PathBuf>,
}

impl ProjectLayout {
    /// The conventional layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let source_dir = root.join("src");
        let public_dir = root.join("public");

        let aliases = BTreeMap::from([
            ("@assets".to_string(), public_dir.join("assets")),
            ("@app".to_string(), source_dir.join("app")),
            ("@components".to_string(), source_dir.join("components")),
            ("@shared".to_string(), source_dir.join("shared")),
        ]);

        Self {
            pages_dir: source_dir.join("pages"),
            build_dir: root.join("build"),
            entry: source_dir.join("app.js"),
            generated_style_file: source_dir.join("styles.js"),
            style_extension: DEFAULT_EXTENSION.to_string(),
            page_extension: DEFAULT_PAGE_EXTENSION.to_string(),
            copy_folders: vec!["assets".to_string()],
            dev_port: 8888,
            open_browser: true,
            watch_files: default_watch_files(),
            aliases,
            root,
            source_dir,
            public_dir,
        }
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Globs watched by the dev server unless configured otherwise.
pub fn default_watch_files() -> Vec<String> {
    ["src/**/*.js", "src/**/*.pcss", "src/**/*.html", "src/**/*.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Environment a build runs in.
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,

    /// The consumer runs an interactive dev server
    pub serve: bool,
}

impl BuildEnv {
    /// An environment with no variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();

        Self { vars, serve: false }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn serving(mut self, serve: bool) -> Self {
        self.serve = serve;
        self
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// `API_URL` verbatim, or the local default when unset.
    pub fn api_url(&self) -> &str {
        self.var(API_URL_VAR).unwrap_or(DEFAULT_API_URL)
    }
}

/// Errors that abort configuration assembly.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error(transparent)]
    Pages(#[from] PageError),

    #[error(transparent)]
    Styles(#[from] StyleError),
}

/// Builds the bundler configuration for a project.
#[derive(Clone)]
pub struct BuildConfigAssembler {
    layout: ProjectLayout,
    pages: Vec<Arc<dyn PageSource>>,
}

impl fmt::Debug for BuildConfigAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pages: Vec<&str> = self.pages.iter().map(|p| p.name()).collect();
        f.debug_struct("BuildConfigAssembler")
            .field("layout", &self.layout)
            .field("pages", &pages)
            .finish()
    }
}

impl BuildConfigAssembler {
    pub fn new(layout: ProjectLayout) -> Self {
        Self {
            layout,
            pages: Vec::new(),
        }
    }

    /// Add a page registered in code.
    ///
    /// Registered pages render after the page modules found on disk. A name
    /// already used by a page module fails assembly with
    /// [`PageError::DuplicatePage`].
    pub fn with_page(mut self, page: impl PageSource + 'static) -> Self {
        self.pages.push(Arc::new(page));
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Discover pages, sync style imports, plan asset copies, and assemble
    /// the configuration.
    ///
    /// Every step runs before the configuration is returned. A failure in
    /// page discovery or style syncing aborts assembly.
    pub fn assemble(&self, mode: Mode, env: &BuildEnv) -> Result<BuildConfig, AssembleError> {
        let start = Instant::now();
        let layout = &self.layout;
        let is_dev = mode.is_dev();

        tracing::info!("Assembling {} build...", mode);

        let mut registry = PageRegistry::discover(
            &layout.pages_dir,
            &layout.page_extension,
            Some(layout.source_dir.as_path()),
        )?;
        for page in &self.pages {
            registry.register(Arc::clone(page))?;
        }
        let pages = registry.render_all(is_dev)?;

        let imports = StyleAggregator::new(&layout.source_dir, &layout.style_extension)
            .aggregate(&layout.source_dir)?;
        GeneratedStyleFile::new(&layout.generated_style_file, &layout.style_extension)?
            .sync(&imports)?;

        let copies = build_copy_specs(
            layout.copy_folders.as_slice(),
            &layout.public_dir,
            &layout.build_dir,
        );

        let mut plugins: Vec<PluginDescriptor> =
            pages.into_iter().map(PluginDescriptor::Html).collect();
        plugins.push(PluginDescriptor::Copy { patterns: copies });
        plugins.push(PluginDescriptor::CssExtract {
            filename: "styles/[name][hash].css".to_string(),
        });
        plugins.push(PluginDescriptor::Define {
            definitions: BTreeMap::from([(
                "process.env.API_URL".to_string(),
                Value::String(env.api_url().to_string()).to_string(),
            )]),
        });

        let config = BuildConfig {
            mode,
            entry_path: layout.entry.clone(),
            output_path: layout.build_dir.clone(),
            output_filename_pattern: "[name].[contenthash].bundle.js".to_string(),
            clean_output: true,
            module_rules: self.module_rules(is_dev),
            plugins,
            dev_server: env.serve.then(|| self.dev_server()),
            resolve_aliases: layout.aliases.clone(),
            resolve_extensions: vec![".js".to_string(), format!(".{}", layout.style_extension)],
            source_map_mode: SourceMapMode::for_mode(mode),
            minimize_enabled: !is_dev,
            minimizers: vec![Minimizer::CssMinimizer, Minimizer::Terser],
        };

        tracing::info!(
            "Assembled {} pages and {} style imports in {}ms",
            config.pages().count(),
            imports.len(),
            start.elapsed().as_millis()
        );

        Ok(config)
    }

    fn module_rules(&self, is_dev: bool) -> Vec<ModuleRule> {
        let style_loader = if is_dev {
            Loader::new("style-loader")
        } else {
            Loader::new("mini-css-extract-plugin/loader")
        };

        vec![
            ModuleRule::Loaders {
                test: format!(r"\.{}$", regex::escape(&self.layout.style_extension)),
                uses: vec![
                    style_loader,
                    Loader::with_options(
                        "css-loader",
                        json!({ "importLoaders": 1, "sourceMap": is_dev }),
                    ),
                    Loader::new("postcss-loader"),
                ],
            },
            ModuleRule::AssetResource {
                test: r"\.(png|jpe?g|gif|svg)$".to_string(),
                flags: "i".to_string(),
                filename: "assets/images/[name][ext]".to_string(),
            },
        ]
    }

    fn dev_server(&self) -> DevServerOptions {
        DevServerOptions {
            static_dir: self.layout.public_dir.clone(),
            port: self.layout.dev_port,
            open: self.layout.open_browser,
            history_api_fallback: true,
            hot: true,
            watch_files: self.layout.watch_files.clone(),
        }
    }
}

/// Resolve `path` against the layout root unless it is already absolute.
pub fn resolve_in(root: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use trellis_pages::FnPage;

    fn project() -> (tempfile::TempDir, ProjectLayout) {
        let temp = tempdir().unwrap();
        let layout = ProjectLayout::new(temp.path());
        fs::create_dir_all(&layout.pages_dir).unwrap();
        fs::create_dir_all(layout.source_dir.join("components/map")).unwrap();
        fs::create_dir_all(layout.public_dir.join("assets")).unwrap();
        fs::write(layout.pages_dir.join("home.page"), "<h1>Home</h1>").unwrap();
        fs::write(layout.pages_dir.join("about.page"), "<h1>About</h1>").unwrap();
        fs::write(layout.source_dir.join("components/map/map.pcss"), ".map {}").unwrap();
        (temp, layout)
    }

    #[test]
    fn production_minimizes_with_external_maps() {
        let (_temp, layout) = project();

        let config = BuildConfigAssembler::new(layout)
            .assemble(Mode::Production, &BuildEnv::new())
            .unwrap();

        assert!(config.minimize_enabled);
        assert_eq!(config.source_map_mode, SourceMapMode::External);
        assert!(config.dev_server.is_none());
        assert!(config.pages().all(|p| p.collapse_whitespace));
    }

    #[test]
    fn development_uses_inline_maps() {
        let (_temp, layout) = project();

        let config = BuildConfigAssembler::new(layout)
            .assemble(Mode::Development, &BuildEnv::new())
            .unwrap();

        assert!(!config.minimize_enabled);
        assert_eq!(config.source_map_mode, SourceMapMode::Inline);
        assert!(config.pages().all(|p| !p.collapse_whitespace));
    }

    #[test]
    fn style_loader_chain_follows_mode() {
        let (_temp, layout) = project();
        let assembler = BuildConfigAssembler::new(layout);

        let dev = assembler.assemble(Mode::Development, &BuildEnv::new()).unwrap();
        let prod = assembler.assemble(Mode::Production, &BuildEnv::new()).unwrap();

        let first_loader = |config: &BuildConfig| match &config.module_rules[0] {
            ModuleRule::Loaders { uses, .. } => uses[0].loader.clone(),
            other => panic!("unexpected rule {:?}", other),
        };
        assert_eq!(first_loader(&dev), "style-loader");
        assert_eq!(first_loader(&prod), "mini-css-extract-plugin/loader");
        assert_eq!(dev.module_rules[0].test(), r"\.pcss$");
    }

    #[test]
    fn dev_server_only_when_serving() {
        let (_temp, layout) = project();
        let assembler = BuildConfigAssembler::new(layout.clone());

        let config = assembler
            .assemble(Mode::Development, &BuildEnv::new().serving(true))
            .unwrap();

        let server = config.dev_server.unwrap();
        assert_eq!(server.port, 8888);
        assert!(server.hot);
        assert!(server.history_api_fallback);
        assert_eq!(server.static_dir, layout.public_dir);
        assert_eq!(server.watch_files, default_watch_files());
    }

    #[test]
    fn embeds_api_url_verbatim() {
        let (_temp, layout) = project();
        let assembler = BuildConfigAssembler::new(layout);

        let default = assembler.assemble(Mode::Production, &BuildEnv::new()).unwrap();
        let custom = assembler
            .assemble(
                Mode::Production,
                &BuildEnv::new().with_var(API_URL_VAR, "not a url"),
            )
            .unwrap();
        let empty = assembler
            .assemble(Mode::Production, &BuildEnv::new().with_var(API_URL_VAR, ""))
            .unwrap();

        assert_eq!(
            default.definition("process.env.API_URL"),
            Some("\"http://localhost:8888\"")
        );
        assert_eq!(custom.definition("process.env.API_URL"), Some("\"not a url\""));
        assert_eq!(empty.definition("process.env.API_URL"), Some("\"\""));
    }

    #[test]
    fn one_html_plugin_per_page() {
        let (_temp, layout) = project();

        let config = BuildConfigAssembler::new(layout)
            .assemble(Mode::Production, &BuildEnv::new())
            .unwrap();

        let mut files: Vec<&str> = config.pages().map(|p| p.output_filename.as_str()).collect();
        files.sort();
        assert_eq!(files, vec!["about.html", "home.html"]);
    }

    #[test]
    fn syncs_generated_style_file() {
        let (_temp, layout) = project();
        let target = layout.generated_style_file.clone();

        BuildConfigAssembler::new(layout)
            .assemble(Mode::Development, &BuildEnv::new())
            .unwrap();

        let content = fs::read_to_string(target).unwrap();
        assert!(content.contains("import \"./components/map/map.pcss\";"));
    }

    #[test]
    fn plans_asset_copies_into_build_dir() {
        let (_temp, layout) = project();
        let build_dir = layout.build_dir.clone();

        let config = BuildConfigAssembler::new(layout)
            .assemble(Mode::Production, &BuildEnv::new())
            .unwrap();

        let copies: Vec<_> = config.copy_instructions().collect();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].destination_path, build_dir.join("assets"));
        assert!(!copies[0].missing_is_fatal);
    }

    #[test]
    fn missing_pages_dir_aborts() {
        let (_temp, layout) = project();
        fs::remove_dir_all(&layout.pages_dir).unwrap();
        let target = layout.generated_style_file.clone();

        let result =
            BuildConfigAssembler::new(layout).assemble(Mode::Production, &BuildEnv::new());

        assert!(matches!(result, Err(AssembleError::Pages(PageError::Io { .. }))));
        assert!(!target.exists());
    }

    #[test]
    fn broken_page_aborts() {
        let (_temp, layout) = project();
        fs::write(layout.pages_dir.join("broken.page"), "{% endif %}").unwrap();

        let result =
            BuildConfigAssembler::new(layout).assemble(Mode::Production, &BuildEnv::new());

        assert!(matches!(
            result,
            Err(AssembleError::Pages(PageError::ModuleLoad { .. }))
        ));
    }

    #[test]
    fn registered_pages_follow_page_modules() {
        let (_temp, layout) = project();

        let config = BuildConfigAssembler::new(layout)
            .with_page(FnPage::new("contact", || "<h1>Contact</h1>".to_string()))
            .assemble(Mode::Development, &BuildEnv::new())
            .unwrap();

        let names: Vec<&str> = config.pages().map(|p| p.page_name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[2], "contact");
        let contact = config.pages().last().unwrap();
        assert_eq!(contact.output_filename, "contact.html");
        assert_eq!(contact.rendered_markup, "<h1>Contact</h1>");
    }

    #[test]
    fn registered_page_clashing_with_module_aborts() {
        let (_temp, layout) = project();

        let result = BuildConfigAssembler::new(layout)
            .with_page(FnPage::new("home", String::new))
            .assemble(Mode::Production, &BuildEnv::new());

        assert!(matches!(
            result,
            Err(AssembleError::Pages(PageError::DuplicatePage(name))) if name == "home"
        ));
    }

    #[test]
    fn image_rule_keeps_flags_separate() {
        let (_temp, layout) = project();

        let config = BuildConfigAssembler::new(layout)
            .assemble(Mode::Production, &BuildEnv::new())
            .unwrap();

        match &config.module_rules[1] {
            ModuleRule::AssetResource { test, flags, .. } => {
                assert_eq!(test, r"\.(png|jpe?g|gif|svg)$");
                assert_eq!(flags, "i");
            }
            other => panic!("unexpected rule {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn process_env_skips_non_unicode_variables() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var("TRELLIS_TEST_NON_UNICODE", OsStr::from_bytes(b"\xff\xfe"));
        std::env::set_var("TRELLIS_TEST_UNICODE", "kept");

        let env = BuildEnv::from_process();

        std::env::remove_var("TRELLIS_TEST_NON_UNICODE");
        std::env::remove_var("TRELLIS_TEST_UNICODE");
        assert_eq!(env.var("TRELLIS_TEST_NON_UNICODE"), None);
        assert_eq!(env.var("TRELLIS_TEST_UNICODE"), Some("kept"));
    }

    #[test]
    fn resolves_relative_paths_against_root() {
        let root = Path::new("/srv/site");

        assert_eq!(resolve_in(root, "src"), Path::new("/srv/site/src"));
        assert_eq!(resolve_in(root, "/tmp/out"), Path::new("/tmp/out"));
    }
}
