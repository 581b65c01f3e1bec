//! Build configuration assembly for trellis projects.
//!
//! Discovers pages and style fragments, keeps the generated style entry file
//! in sync, and assembles the configuration handed to the external bundler.

pub mod assembler;
pub mod assets;
pub mod config;
pub mod emit;

pub use assembler::{
    default_watch_files, resolve_in, AssembleError, BuildConfigAssembler, BuildEnv,
    ProjectLayout, API_URL_VAR, DEFAULT_API_URL,
};
pub use assets::{build_copy_specs, copy_assets, CopyError, CopyInstruction};
pub use config::{
    BuildConfig, DevServerOptions, Loader, Minimizer, Mode, ModuleRule, ParseModeError,
    PluginDescriptor, SourceMapMode,
};
pub use emit::{collapse_whitespace, emit, EmitError, EmitReport, CONFIG_FILE_NAME};
pub use trellis_pages::{PageError, PageTask, DEFAULT_PAGE_EXTENSION};
pub use trellis_styles::{StyleError, DEFAULT_EXTENSION as DEFAULT_STYLE_EXTENSION};
