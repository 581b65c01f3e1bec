//! Page sources and page discovery.
//!
//! Pages are anything implementing [`PageSource`]. Template files found in a
//! pages directory are the usual source; pages can also be registered in code.

pub mod registry;
pub mod template;
pub mod traits;

pub use registry::{discover_pages, PageRegistry, PageTask, DEFAULT_PAGE_EXTENSION};
pub use template::{page_name, TemplatePage};
pub use traits::{FnPage, PageError, PageSource};
