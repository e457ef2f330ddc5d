//! Error types for response parsing and shape validation.

use thiserror::Error;

/// Failure reported by a parse callback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(format!("invalid JSON: {error}"))
    }
}

/// Errors that reject a response after the transport succeeded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Parsing was requested but no parse callback is registered.
    #[error("no parse callback registered")]
    MissingParser,

    /// The parse callback rejected the raw body.
    #[error("parse callback failed: {0}")]
    Parse(#[from] ParseError),

    /// A key required by the prototype is absent.
    #[error("required key `{path}` missing from response")]
    MissingKey {
        /// Dotted path of the missing key.
        path: String,
    },

    /// The prototype expects a container where the response holds a scalar.
    #[error("expected an object or array at `{path}`")]
    NotContainer {
        /// Dotted path of the offending value; empty for the root.
        path: String,
    },
}

impl ValidationError {
    pub fn missing_key(path: impl Into<String>) -> Self {
        Self::MissingKey { path: path.into() }
    }

    pub fn not_container(path: impl Into<String>) -> Self {
        Self::NotContainer { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_display_has_path() {
        let msg = ValidationError::missing_key("b.c").to_string();
        assert!(msg.contains("`b.c`"), "Expected path in: {msg}");
    }

    #[test]
    fn test_parse_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let parse: ParseError = err.into();
        assert!(parse.message().starts_with("invalid JSON"));
    }
}
