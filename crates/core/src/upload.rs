//! Validation of uploaded file names.

use crate::error::CoreError;

/// Extensions (lower-case, without the dot) accepted for conversion.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// Whether `filename` ends in an allowed extension (case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Validate the client-supplied filename of an upload.
///
/// The name is later used verbatim as a path component inside a scratch
/// directory and as the job identity, so anything that is not a plain file
/// name is rejected along with non-PDF extensions.
pub fn validate_filename(filename: &str) -> Result<&str, CoreError> {
    if filename.is_empty() {
        return Err(CoreError::Validation("Empty filename".into()));
    }

    let is_plain_name = !filename.contains(['/', '\\', '\0']) && filename != "." && filename != "..";

    if !is_plain_name || !allowed_file(filename) {
        return Err(CoreError::Validation("Invalid filename".into()));
    }

    Ok(filename)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
