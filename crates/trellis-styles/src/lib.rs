//! Style fragment discovery and generated import file management.
//!
//! This crate scans a source tree for style fragments, turns each one into an
//! import statement, and keeps the generated style entry file in sync with the
//! fragments on disk while preserving whatever the user wrote below the
//! managed region.

pub mod aggregate;
pub mod error;
pub mod region;
pub mod writer;

pub use aggregate::{FragmentPath, ImportStatement, StyleAggregator, DEFAULT_EXTENSION};
pub use error::StyleError;
pub use region::{ManagedRegion, BEGIN_MARKER, END_MARKER};
pub use writer::{sync, GeneratedStyleFile, SyncOutcome};
