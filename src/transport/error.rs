//! Error types for the transport port.

use std::path::PathBuf;

use thiserror::Error;

/// A transport call that produced no HTTP response.
///
/// The coordinator records these as status 0 and lets the action policy
/// decide whether to try again.
#[derive(Debug, Error)]
pub enum TransportFailure {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout calling {url}")]
    Timeout { url: String },

    /// A CA certificate override could not be read.
    #[error("cannot read CA certificate {path}: {source}")]
    CertificateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CA certificate override is not valid PEM, or the client could not be built with it.
    #[error("cannot load CA certificate {path}: {source}")]
    Certificate {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built with default trust roots.
    #[error("cannot build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },

    /// Failure reported by a non-`reqwest` transport.
    #[error("transport failure calling {url}: {message}")]
    Other { url: String, message: String },
}

impl TransportFailure {
    /// Classifies a reqwest error into a timeout or network failure.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a timeout failure.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a failure with a free-form message.
    pub fn other(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let error = TransportFailure::timeout("https://api.example.com/v1");
        let msg = error.to_string();
        assert!(msg.contains("timeout"), "Expected 'timeout' in: {msg}");
        assert!(msg.contains("https://api.example.com/v1"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_certificate_io_display_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = TransportFailure::CertificateIo {
            path: PathBuf::from("/etc/certs/ca.pem"),
            source: io,
        };
        assert!(error.to_string().contains("/etc/certs/ca.pem"));
    }

    #[test]
    fn test_other_display() {
        let error = TransportFailure::other("https://x.test/", "socket closed");
        assert!(error.to_string().contains("socket closed"));
    }
}
