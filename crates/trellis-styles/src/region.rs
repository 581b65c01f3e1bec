//! The managed region of the generated style entry file.
//!
//! The file looks like this after a sync:
//!
//! ```text
//! // <trellis:styles>
//! import "./styles/base.pcss";
//! import "./components/card/card.pcss";
//! // </trellis:styles>
//!
//! // anything the user wrote is kept below
//! ```
//!
//! Rendering is pure: it takes the current file content and the desired
//! imports and returns the new content, so it can be tested without a disk.

use regex::Regex;

use crate::aggregate::ImportStatement;
use crate::error::StyleError;

/// Line opening the managed region.
pub const BEGIN_MARKER: &str = "// <trellis:styles>";

/// Line closing the managed region.
pub const END_MARKER: &str = "// </trellis:styles>";

/// Rewrites the managed region of a generated style file.
#[derive(Debug, Clone)]
pub struct ManagedRegion {
    legacy_import: Regex,
}

#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Before,
    Inside,
    After,
}

impl ManagedRegion {
    /// Create a region manager for fragments with the given extension.
    ///
    /// The extension is only needed to recognize import lines in files that
    /// predate the region markers.
    pub fn new(extension: &str) -> Result<Self, StyleError> {
        let pattern = format!(
            r#"^\s*import\s+"[^"]*\.{}";\s*$"#,
            regex::escape(extension.trim_start_matches('.'))
        );

        Ok(Self {
            legacy_import: Regex::new(&pattern)?,
        })
    }

    /// Compute the new file content for `current` and `imports`.
    pub fn render(&self, current: &str, imports: &[ImportStatement]) -> Result<String, StyleError> {
        let remainder = self.user_content(current)?;
        let remainder = strip_leading_blank_lines(&remainder);

        let mut out = String::with_capacity(remainder.len() + imports.len() * 48 + 64);
        out.push_str(BEGIN_MARKER);
        out.push('\n');
        for import in imports {
            out.push_str(&import.line());
            out.push('\n');
        }
        out.push_str(END_MARKER);
        out.push('\n');
        out.push('\n');
        out.push_str(remainder);

        Ok(out)
    }

    /// Everything in `current` that the tool does not own.
    fn user_content(&self, current: &str) -> Result<String, StyleError> {
        let mut kept = String::with_capacity(current.len());
        let mut state = Scan::Before;

        for line in current.split_inclusive('\n') {
            let marker = line.trim();
            match state {
                Scan::Before if marker == BEGIN_MARKER => state = Scan::Inside,
                Scan::Inside if marker == END_MARKER => state = Scan::After,
                Scan::Inside => {}
                Scan::Before | Scan::After => kept.push_str(line),
            }
        }

        match state {
            Scan::Inside => Err(StyleError::UnterminatedRegion),
            Scan::After => Ok(kept),
            Scan::Before => Ok(self.strip_legacy(current)),
        }
    }

    /// Drop generated import lines and blank lines from an unmarked file.
    fn strip_legacy(&self, current: &str) -> String {
        current
            .split_inclusive('\n')
            .filter(|line| {
                let text = line.trim_end_matches(['\n', '\r']);
                !text.trim().is_empty() && !self.legacy_import.is_match(text)
            })
            .collect()
    }
}

fn strip_leading_blank_lines(content: &str) -> &str {
    let mut rest = content;

    while let Some(end) = rest.find('\n') {
        if !rest[..end].trim().is_empty() {
            return rest;
        }
        rest = &rest[end + 1..];
    }

    if rest.trim().is_empty() {
        ""
    } else {
        rest
    }
}
