//! Development server with live reload for trellis builds.
//!
//! Serves the build output, watches the source tree and reruns the build when
//! a watched file changes, then tells connected browsers to reload.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{inject_script_tag, DevServer, DevServerConfig, RebuildHook, ServerError};
pub use watcher::{FileWatcher, WatchEvent, WatchPatterns};
pub use websocket::{reload_client_script, ReloadHub, ReloadMessage};
