//! Error types for the request coordinator.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::throttle::ThrottleError;
use crate::validate::ValidationError;

/// Misconfiguration discovered while building or running a coordinator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Neither the hook nor the action table has a verdict for this status.
    #[error("no action configured for HTTP {status} from {url}")]
    NoAction { url: String, status: u16 },

    /// An action override names a status outside 0-600.
    #[error("action override for HTTP {status} is outside 0-600")]
    StatusOutOfRange { status: u16 },

    /// A prototype template holds something other than nodes and required markers.
    #[error("malformed response prototype at `{path}`: {reason}")]
    MalformedPrototype { path: String, reason: String },
}

impl ConfigurationError {
    pub fn no_action(url: impl Into<String>, status: u16) -> Self {
        Self::NoAction {
            url: url.into(),
            status,
        }
    }

    pub fn malformed_prototype(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPrototype {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Fatal outcomes of the attempt loop itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Every attempt asked to be repeated.
    #[error("retries exhausted calling {url}: HTTP {status} after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// The server redirected and the policy treats that as fatal.
    #[error("HTTP {status} redirect from {url}{}", location_suffix(.location))]
    Redirected {
        url: String,
        status: u16,
        /// `Location` header, if the server sent one.
        location: Option<String>,
    },

    /// The terminal response had no body although one was expected.
    #[error("empty response body from {url} (HTTP {status})")]
    EmptyResponse { url: String, status: u16 },

    /// The request URL is not an absolute URL.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

fn location_suffix(location: &Option<String>) -> String {
    location
        .as_deref()
        .map(|l| format!(" to {l}"))
        .unwrap_or_default()
}

impl TransportError {
    pub fn retries_exhausted(url: impl Into<String>, status: u16, attempts: u32) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            status,
            attempts,
        }
    }

    pub fn redirected(url: impl Into<String>, status: u16, location: Option<String>) -> Self {
        Self::Redirected {
            url: url.into(),
            status,
            location,
        }
    }

    pub fn empty_response(url: impl Into<String>, status: u16) -> Self {
        Self::EmptyResponse {
            url: url.into(),
            status,
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// Everything [`Coordinator::execute`](super::Coordinator::execute) can fail with.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response reached a terminal state but failed parsing or validation.
    #[error("response validation failed (HTTP {status}): {source}")]
    Validation {
        status: u16,
        #[source]
        source: ValidationError,
    },

    /// The raw response could not be archived.
    #[error("archiving response failed (HTTP {status}): {source}")]
    Archive {
        status: u16,
        #[source]
        source: ArchiveError,
    },

    #[error("throttle error: {0}")]
    Throttle(#[from] ThrottleError),
}

impl CoordinatorError {
    /// The last HTTP status observed, when the error happened after an attempt.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Configuration(ConfigurationError::NoAction { status, .. })
            | Self::Transport(
                TransportError::RetriesExhausted { status, .. }
                | TransportError::Redirected { status, .. }
                | TransportError::EmptyResponse { status, .. },
            )
            | Self::Validation { status, .. }
            | Self::Archive { status, .. } => Some(*status),
            Self::Configuration(_)
            | Self::Transport(TransportError::InvalidUrl { .. })
            | Self::Throttle(_) => None,
        }
    }

    /// Message reported by the remote side, currently the redirect target.
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Transport(TransportError::Redirected { location, .. }) => location.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_display_with_location() {
        let error = TransportError::redirected(
            "https://api.example.com/v1",
            301,
            Some("https://api.example.com/v2".into()),
        );
        let msg = error.to_string();
        assert!(msg.contains("301"), "Expected status in: {msg}");
        assert!(msg.contains("to https://api.example.com/v2"), "Expected location in: {msg}");
    }

    #[test]
    fn test_redirect_display_without_location() {
        let msg = TransportError::redirected("https://api.example.com/v1", 302, None).to_string();
        assert!(msg.ends_with("https://api.example.com/v1"), "Unexpected: {msg}");
    }

    #[test]
    fn test_status_carried_through_wrappers() {
        let error: CoordinatorError = TransportError::retries_exhausted("https://x.test", 503, 3).into();
        assert_eq!(error.status(), Some(503));

        let error = CoordinatorError::Validation {
            status: 200,
            source: ValidationError::MissingParser,
        };
        assert_eq!(error.status(), Some(200));

        let error: CoordinatorError = TransportError::invalid_url("nope").into();
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_remote_message_is_location() {
        let error: CoordinatorError =
            TransportError::redirected("https://x.test", 302, Some("/login".into())).into();
        assert_eq!(error.remote_message(), Some("/login"));
    }

    #[test]
    fn test_no_action_display() {
        let msg = ConfigurationError::no_action("https://x.test", 102).to_string();
        assert!(msg.contains("102"), "Expected status in: {msg}");
    }
}
