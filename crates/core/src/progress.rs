//! Page-progress extraction from conversion engine log lines.
//!
//! The engine reports nothing structured while it works. The only reliable
//! signal is the line it writes when it starts orienting a page, e.g.
//!
//! ```text
//!    3 Rotations for page 3: 0.00
//! ```
//!
//! [`extract_page`] turns such a line into the page number it names.

use std::sync::LazyLock;

use regex::Regex;

/// Case-sensitive marker phrase the engine writes once per page.
pub const PAGE_MARKER: &str = "Rotations for page";

static PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Rotations for page\D*(\d+)").expect("valid regex"));

/// Whether `line` contains the page marker at all, parsable or not.
pub fn has_marker(line: &str) -> bool {
    line.contains(PAGE_MARKER)
}

/// Extract the page number from a progress line.
///
/// Returns the first run of digits following [`PAGE_MARKER`]. Lines without
/// the marker, lines where no digits follow it, and numbers that do not fit
/// in a `u32` all yield `None`.
pub fn extract_page(line: &str) -> Option<u32> {
    PAGE_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
