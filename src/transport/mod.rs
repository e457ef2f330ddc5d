//! The transport port: one HTTP call in, raw bytes + status + header text out.
//!
//! The coordinator never speaks HTTP itself. It hands a [`TransportCall`] to a
//! [`Transport`] implementation and interprets the [`RawResponse`]. The
//! production adapter is [`HttpTransport`], built on `reqwest`; tests plug in
//! scripted stubs.
//!
//! # Example
//!
//! ```no_run
//! use outcall_core::request::Request;
//! use outcall_core::transport::{HttpTransport, Transport, TransportCall};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new();
//! let request = Request::new("https://api.example.com/v1/ping");
//! let response = transport.send(TransportCall::new(&request)).await?;
//! println!("HTTP {} ({} bytes)", response.status, response.body.len());
//! # Ok(())
//! # }
//! ```

mod constants;
mod error;
mod http;
pub mod tls;

use std::path::Path;

use async_trait::async_trait;

use crate::request::Request;

pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::TransportFailure;
pub use http::HttpTransport;
pub use tls::CertTable;

/// Status reported for an attempt whose transport call failed outright.
pub const NETWORK_FAILURE_STATUS: u16 = 0;

/// Everything a transport needs for one call.
#[derive(Debug, Clone, Copy)]
pub struct TransportCall<'a> {
    /// The request descriptor, passed through untouched.
    pub request: &'a Request,
    /// CA certificate override resolved for the target host.
    pub ca_cert: Option<&'a Path>,
}

impl<'a> TransportCall<'a> {
    /// A call with transport-default TLS settings.
    #[must_use]
    pub fn new(request: &'a Request) -> Self {
        Self {
            request,
            ca_cert: None,
        }
    }

    /// Overrides the CA certificate used to verify the peer.
    #[must_use]
    pub fn with_ca_cert(mut self, ca_cert: Option<&'a Path>) -> Self {
        self.ca_cert = ca_cert;
        self
    }
}

/// What came back from one transport call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub body: Vec<u8>,
    pub status: u16,
    /// Raw header text: status line, then `Name: value` lines.
    pub header_text: String,
}

impl RawResponse {
    /// Response with a status and body but no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            status,
            header_text: String::new(),
        }
    }

    /// The stand-in response for a failed transport call.
    #[must_use]
    pub fn network_failure() -> Self {
        Self::new(NETWORK_FAILURE_STATUS, Vec::new())
    }

    /// Attaches raw header text.
    #[must_use]
    pub fn with_header_text(mut self, header_text: impl Into<String>) -> Self {
        self.header_text = header_text.into();
        self
    }
}

/// Performs one HTTP call.
///
/// Implementations must not retry; retry policy belongs to the coordinator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the call and returns the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`TransportFailure`] when no HTTP response was obtained
    /// (DNS, connect, TLS, timeout, unreadable certificate).
    async fn send(&self, call: TransportCall<'_>) -> Result<RawResponse, TransportFailure>;
}
