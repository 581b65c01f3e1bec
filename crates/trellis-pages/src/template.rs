//! File-backed pages rendered with minijinja.
//!
//! A page module is a template file. Loading parses it, rendering evaluates it
//! with an empty context. Templates may `{% include %}` partials relative to
//! the include root, which is how pages pull in shared components.

use std::fs;
use std::path::Path;

use minijinja::{context, Environment, UndefinedBehavior};

use crate::traits::{PageError, PageSource};

/// A page loaded from a template file.
#[derive(Debug)]
pub struct TemplatePage {
    name: String,
    env: Environment<'static>,
}

impl TemplatePage {
    /// Load and parse the template at `path`.
    ///
    /// The page name is the file name up to its first `.`.
    pub fn load(path: &Path, include_root: Option<&Path>) -> Result<Self, PageError> {
        let name = page_name(path);

        let source = fs::read_to_string(path).map_err(|e| PageError::module_load(&name, e))?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        if let Some(root) = include_root {
            env.set_loader(minijinja::path_loader(root));
        }

        env.add_template_owned(name.clone(), source)
            .map_err(|e| PageError::module_load(&name, e))?;

        tracing::debug!("Loaded page module {} from {}", name, path.display());

        Ok(Self {
            name,
            env,
        })
    }
}

impl PageSource for TemplatePage {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> Result<String, PageError> {
        let tmpl = self
            .env
            .get_template(&self.name)
            .map_err(|e| PageError::module_load(&self.name, e))?;

        tmpl.render(context! {})
            .map_err(|e| PageError::module_load(&self.name, e))
    }
}

/// Derive a page name from its file name (`main.page` -> `main`).
pub fn page_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();

    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => file_name,
    }
}
