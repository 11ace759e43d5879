//! Conversion option parsing.
//!
//! Clients may send a free-text, shell-style `params` string. It is never
//! handed to a shell: it is split into tokens, checked against a deny list,
//! then every token must be a recognized engine option (or that option's
//! value). The result is an argument vector safe to pass to the engine.

use crate::error::CoreError;

/// Options the service refuses outright.
pub const DENIED_OPTIONS: &[&str] = &["--sidecar"];

/// Recognized options that take no value.
const FLAG_OPTIONS: &[&str] = &[
    "-r",
    "--rotate-pages",
    "-d",
    "--deskew",
    "-c",
    "--clean",
    "-i",
    "--clean-final",
    "-f",
    "--force-ocr",
    "-s",
    "--skip-text",
    "--redo-ocr",
    "--remove-background",
    "--remove-vectors",
];

/// Recognized options that consume one value.
const VALUE_OPTIONS: &[&str] = &[
    "-l",
    "--language",
    "--output-type",
    "-O",
    "--optimize",
    "-j",
    "--jobs",
    "--pdf-renderer",
    "--title",
    "--author",
    "--subject",
    "--keywords",
    "--rotate-pages-threshold",
    "--tesseract-timeout",
    "--skip-big",
    "--oversample",
    "--pages",
];

/// OCR modes; at most one may be selected.
const MODE_OPTIONS: &[(&str, &str)] = &[
    ("-f", "--force-ocr"),
    ("-s", "--skip-text"),
    ("--redo-ocr", "--redo-ocr"),
];

/// Mode used when the client selects none.
const DEFAULT_MODE: &str = "--skip-text";

/// Validated engine options, in the order the client gave them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    args: Vec<String>,
}

impl ConversionOptions {
    /// Parse and validate a `params` string.
    ///
    /// Denied options yield [`CoreError::UnsupportedOption`] even when other
    /// tokens are also invalid. Unbalanced quotes, unknown options, stray
    /// positional arguments and missing option values yield
    /// [`CoreError::Validation`].
    pub fn parse(params: &str) -> Result<Self, CoreError> {
        let tokens = split_params(params)?;

        if let Some(denied) = tokens.iter().find_map(|t| denied_option(t)) {
            return Err(CoreError::UnsupportedOption(format!("{denied} not supported")));
        }

        let mut args = Vec::with_capacity(tokens.len() + 1);
        let mut modes = 0;
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            let (name, inline_value) = match token.split_once('=') {
                Some((name, value)) if name.starts_with("--") => (name.to_string(), Some(value.to_string())),
                _ => (token.clone(), None),
            };

            if FLAG_OPTIONS.contains(&name.as_str()) {
                if inline_value.is_some() {
                    return Err(CoreError::Validation(format!("Option {name} takes no value")));
                }
                if MODE_OPTIONS.iter().any(|(short, long)| name == *short || name == *long) {
                    modes += 1;
                }
                args.push(name);
            } else if VALUE_OPTIONS.contains(&name.as_str()) {
                let value = match inline_value {
                    Some(value) => value,
                    None => tokens
                        .next()
                        .ok_or_else(|| CoreError::Validation(format!("Option {name} requires a value")))?,
                };
                args.push(name);
                args.push(value);
            } else if name.starts_with('-') {
                return Err(CoreError::Validation(format!("Unrecognized option: {name}")));
            } else {
                return Err(CoreError::Validation(format!("Unexpected argument: {token}")));
            }
        }

        match modes {
            0 => args.push(DEFAULT_MODE.to_string()),
            1 => {}
            _ => {
                return Err(CoreError::Validation(
                    "Only one of --force-ocr, --skip-text or --redo-ocr may be given".into(),
                ))
            }
        }

        Ok(Self { args })
    }

    /// Engine arguments, ready to be placed before the input/output paths.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// The denied option a token names, if any (`--sidecar` or `--sidecar=x`).
fn denied_option(token: &str) -> Option<&'static str> {
    DENIED_OPTIONS.iter().copied().find(|denied| {
        token == *denied
            || token
                .strip_prefix(denied)
                .is_some_and(|rest| rest.starts_with('='))
    })
}

/// Split a parameter string into words the way a POSIX shell would,
/// without any expansion.
pub fn split_params(params: &str) -> Result<Vec<String>, CoreError> {
    shlex::split(params).ok_or_else(|| {
        CoreError::Validation("Malformed params: unbalanced quotes or trailing backslash".into())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
