//! Trait definitions for page sources.

use std::path::PathBuf;
use std::sync::Arc;

/// Errors that can occur while discovering or rendering pages.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Failed to read pages directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load page module '{name}': {message}")]
    ModuleLoad { name: String, message: String },

    #[error("Duplicate page name '{0}': output filenames must be unique")]
    DuplicatePage(String),
}

impl PageError {
    pub(crate) fn module_load(name: &str, message: impl ToString) -> Self {
        Self::ModuleLoad {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

/// Something that produces a complete HTML document.
pub trait PageSource: Send + Sync {
    /// Page name; the output document is `<name>.html`
    fn name(&self) -> &str;

    /// Produce the page markup.
    fn render(&self) -> Result<String, PageError>;
}

impl<P: PageSource + ?Sized> PageSource for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn render(&self) -> Result<String, PageError> {
        (**self).render()
    }
}

/// A page backed by a plain function, for pages registered in code.
pub struct FnPage<F> {
    name: String,
    render: F,
}

impl<F> FnPage<F>
where
    F: Fn() -> String + Send + Sync,
{
    pub fn new(name: impl Into<String>, render: F) -> Self {
        Self {
            name: name.into(),
            render,
        }
    }
}

impl<F> PageSource for FnPage<F>
where
    F: Fn() -> String + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> Result<String, PageError> {
        Ok((self.render)())
    }
}

impl<F> std::fmt::Debug for FnPage<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPage").field("name", &self.name).finish()
    }
}
