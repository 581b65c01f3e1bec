//! Page registry.
//!
//! Discovers page modules in a pages directory, holds pages registered in
//! code, and renders all of them into page tasks for the build.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::template::TemplatePage;
use crate::traits::{PageError, PageSource};

/// Extension of page modules when none is configured.
pub const DEFAULT_PAGE_EXTENSION: &str = "page";

/// One HTML document to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTask {
    /// Page name (source file name without extension)
    pub page_name: String,

    /// Rendered HTML document
    pub rendered_markup: String,

    /// Output file name, `<page_name>.html`
    pub output_filename: String,

    /// Collapse whitespace between tags when writing
    pub collapse_whitespace: bool,
}

impl PageTask {
    pub fn new(page_name: &str, rendered_markup: String, is_dev: bool) -> Self {
        Self {
            page_name: page_name.to_string(),
            rendered_markup,
            output_filename: format!("{}.html", page_name),
            collapse_whitespace: !is_dev,
        }
    }
}

/// A registry of page sources.
#[derive(Default)]
pub struct PageRegistry {
    pages: Vec<Box<dyn PageSource>>,
    names: HashSet<String>,
}

impl std::fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRegistry")
            .field("pages", &self.names())
            .finish()
    }
}

impl PageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every page module in `pages_dir`.
    ///
    /// Only direct children whose file name ends with `.<extension>` are
    /// considered. All modules are loaded, in parallel, before the registry is
    /// returned; the registry keeps the directory-listing order. Any module
    /// that fails to load fails the whole discovery.
    pub fn discover(
        pages_dir: &Path,
        extension: &str,
        include_root: Option<&Path>,
    ) -> Result<Self, PageError> {
        let files = list_page_files(pages_dir, extension)?;

        let loaded: Vec<TemplatePage> = files
            .par_iter()
            .map(|path| TemplatePage::load(path, include_root))
            .collect::<Result<_, _>>()?;

        let mut registry = Self::new();
        for page in loaded {
            registry.register(page)?;
        }

        if registry.is_empty() {
            tracing::warn!("No page modules found in {}", pages_dir.display());
        }

        tracing::info!(
            "Loaded {} page modules from {}",
            registry.len(),
            pages_dir.display()
        );

        Ok(registry)
    }

    /// Register a page source. Names must be unique.
    pub fn register(&mut self, page: impl PageSource + 'static) -> Result<(), PageError> {
        let name = page.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(PageError::DuplicatePage(name));
        }

        self.pages.push(Box::new(page));
        Ok(())
    }

    /// Registered page names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Render every page into a task, in registration order.
    ///
    /// Pages render in parallel. The first failure aborts the whole set, so
    /// either every page has a task or none does.
    pub fn render_all(&self, is_dev: bool) -> Result<Vec<PageTask>, PageError> {
        self.pages
            .par_iter()
            .map(|page| {
                let markup = page.render()?;
                Ok::<_, PageError>(PageTask::new(page.name(), markup, is_dev))
            })
            .collect()
    }
}

/// Discover the page modules in `pages_dir` and render them.
pub fn discover_pages(
    pages_dir: &Path,
    extension: &str,
    is_dev: bool,
) -> Result<Vec<PageTask>, PageError> {
    PageRegistry::discover(pages_dir, extension, None)?.render_all(is_dev)
}

/// Page module files in `pages_dir`, in directory-listing order.
fn list_page_files(pages_dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PageError> {
    let io_error = |source| PageError::Io {
        path: pages_dir.to_path_buf(),
        source,
    };

    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let mut files = Vec::new();

    for entry in fs::read_dir(pages_dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();

        if !path.is_file() {
            continue;
        }

        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&suffix));
        if matches {
            files.push(path);
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FnPage;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn discovers_one_task_per_page_module() {
        let temp = tempdir().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("home.page"), "<h1>X</h1>").unwrap();
        fs::write(pages.join("about.page"), "<h1>X</h1>").unwrap();

        let mut tasks = discover_pages(&pages, "page", false).unwrap();
        tasks.sort_by(|a, b| a.output_filename.cmp(&b.output_filename));

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].output_filename, "about.html");
        assert_eq!(tasks[1].output_filename, "home.html");
        assert!(tasks.iter().all(|t| t.rendered_markup == "<h1>X</h1>"));
    }

    #[test]
    fn ignores_other_files_and_directories() {
        let temp = tempdir().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir_all(pages.join("nested.page")).unwrap();
        fs::write(pages.join("index.page"), "<p>index</p>").unwrap();
        fs::write(pages.join("notes.md"), "# notes").unwrap();
        fs::write(pages.join("helper.js"), "export {}").unwrap();

        let tasks = discover_pages(&pages, "page", true).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].page_name, "index");
    }

    #[test]
    fn tasks_follow_directory_listing_order() {
        let temp = tempdir().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        for name in ["zeta", "alpha", "mid", "beta", "omega", "gamma", "delta", "kappa"] {
            fs::write(pages.join(format!("{}.page", name)), name).unwrap();
        }
        fs::write(pages.join("skip.txt"), "skip").unwrap();

        let expected: Vec<String> = fs::read_dir(&pages)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .filter_map(|name| name.strip_suffix(".page").map(String::from))
            .collect();

        let tasks = discover_pages(&pages, "page", false).unwrap();

        let names: Vec<String> = tasks.iter().map(|t| t.page_name.clone()).collect();
        assert_eq!(names, expected);
        assert!(tasks.iter().all(|t| t.rendered_markup == t.page_name));
    }

    #[test]
    fn whitespace_collapse_follows_mode() {
        let mut registry = PageRegistry::new();
        registry
            .register(FnPage::new("home", || "<h1>Home</h1>".to_string()))
            .unwrap();

        assert!(registry.render_all(false).unwrap()[0].collapse_whitespace);
        assert!(!registry.render_all(true).unwrap()[0].collapse_whitespace);
    }

    #[test]
    fn malformed_module_fails_discovery() {
        let temp = tempdir().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("good.page"), "<p>ok</p>").unwrap();
        fs::write(pages.join("bad.page"), "{% for %}").unwrap();

        let result = discover_pages(&pages, "page", false);

        assert!(matches!(result, Err(PageError::ModuleLoad { name, .. }) if name == "bad"));
    }

    #[test]
    fn render_failure_yields_no_tasks() {
        let temp = tempdir().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("good.page"), "<p>ok</p>").unwrap();
        fs::write(pages.join("needs-input.page"), "{{ missing.field }}").unwrap();

        let result = discover_pages(&pages, "page", false);

        assert!(matches!(result, Err(PageError::ModuleLoad { .. })));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = PageRegistry::new();
        registry
            .register(FnPage::new("home", String::new))
            .unwrap();

        let result = registry.register(FnPage::new("home", String::new));

        assert!(matches!(result, Err(PageError::DuplicatePage(name)) if name == "home"));
    }

    #[test]
    fn empty_pages_directory_yields_empty_registry() {
        let temp = tempdir().unwrap();

        let registry = PageRegistry::discover(temp.path(), "page", None).unwrap();

        assert!(registry.is_empty());
        assert!(registry.render_all(false).unwrap().is_empty());
    }

    #[test]
    fn errors_on_missing_pages_directory() {
        let temp = tempdir().unwrap();

        let result = discover_pages(&temp.path().join("pages"), "page", false);

        assert!(matches!(result, Err(PageError::Io { .. })));
    }
}
