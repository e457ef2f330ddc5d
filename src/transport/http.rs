//! `reqwest`-backed transport.
//!
//! `reqwest` fixes trust roots and redirect policy when a client is built, so
//! the adapter keeps one client per distinct (CA certificate, redirect limit)
//! profile and reuses it across calls, keeping connection pooling intact.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::redirect::Policy;
use reqwest::{Certificate, Client, ClientBuilder};
use tracing::{debug, instrument, warn};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::{RawResponse, Transport, TransportCall, TransportFailure};
use crate::request::{Method, Request};
use crate::user_agent;

/// Client configuration that cannot vary per request in `reqwest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientProfile {
    ca_cert: Option<PathBuf>,
    /// `None` disables redirect following.
    max_redirects: Option<u32>,
}

/// HTTP transport over `reqwest`.
///
/// Designed to be created once and shared (behind `Arc`) by every coordinator
/// of the process.
#[derive(Debug)]
pub struct HttpTransport {
    connect_timeout: Duration,
    read_timeout: Duration,
    clients: DashMap<ClientProfile, Client>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Creates a transport with default timeouts (30s connect, 5min read).
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a transport with explicit timeout values.
    #[must_use]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            read_timeout: Duration::from_secs(read_timeout_secs),
            clients: DashMap::new(),
        }
    }

    fn client_for(&self, profile: ClientProfile) -> Result<Client, TransportFailure> {
        if let Some(client) = self.clients.get(&profile) {
            return Ok(client.clone());
        }

        let mut builder = base_client_builder(self.connect_timeout, self.read_timeout);
        builder = builder.redirect(match profile.max_redirects {
            Some(max) => Policy::limited(max as usize),
            None => Policy::none(),
        });
        if let Some(path) = profile.ca_cert.as_deref() {
            builder = builder.add_root_certificate(load_certificate(path)?);
        }
        let client = builder
            .build()
            .map_err(|source| build_failure(profile.ca_cert.as_deref(), source))?;

        debug!(?profile, "built HTTP client for new profile");
        self.clients.insert(profile, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, call), fields(method = %call.request.method(), url = %call.request.url()))]
    async fn send(&self, call: TransportCall<'_>) -> Result<RawResponse, TransportFailure> {
        let request = call.request;
        let url = request.url();

        let client = self.client_for(ClientProfile {
            ca_cert: call.ca_cert.map(Path::to_path_buf),
            max_redirects: request
                .redirects_followed()
                .then(|| request.max_redirects()),
        })?;

        let builder = build_request(&client, request);
        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure::from_reqwest(url, e))?;

        let status = response.status();
        let header_text = render_header_text(
            &format!("{:?} {}", response.version(), status),
            response.headers(),
        );
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure::from_reqwest(url, e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "transport call complete");
        Ok(RawResponse {
            body: body.to_vec(),
            status: status.as_u16(),
            header_text,
        })
    }
}

fn base_client_builder(connect_timeout: Duration, read_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(read_timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

/// Blames the CA certificate only when the profile installed one.
fn build_failure(ca_cert: Option<&Path>, source: reqwest::Error) -> TransportFailure {
    match ca_cert {
        Some(path) => TransportFailure::Certificate {
            path: path.to_path_buf(),
            source,
        },
        None => TransportFailure::ClientBuild { source },
    }
}

fn load_certificate(path: &Path) -> Result<Certificate, TransportFailure> {
    let pem = std::fs::read(path).map_err(|source| TransportFailure::CertificateIo {
        path: path.to_path_buf(),
        source,
    })?;
    Certificate::from_pem(&pem).map_err(|source| TransportFailure::Certificate {
        path: path.to_path_buf(),
        source,
    })
}

fn build_request(client: &Client, request: &Request) -> reqwest::RequestBuilder {
    let mut builder = client.request(to_reqwest_method(request.method()), request.url());

    let mut has_content_type = false;
    for line in request.headers() {
        let Some((name, value)) = line.split_once(':') else {
            warn!(header = %line, "skipping malformed header line");
            continue;
        };
        let name = name.trim();
        has_content_type |= name.eq_ignore_ascii_case(CONTENT_TYPE.as_str());
        builder = builder.header(name, value.trim());
    }

    if let Some(payload) = request.payload() {
        if !has_content_type && let Some(content_type) = payload.implied_content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder = builder.body(payload.to_bytes());
    }
    if let Some(auth) = request.auth() {
        builder = builder.basic_auth(&auth.username, auth.password.as_ref());
    }
    if let Some(timeout) = request.timeout() {
        builder = builder.timeout(timeout);
    }
    builder
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

/// Renders a status line plus headers the way they arrived on the wire.
fn render_header_text(status_line: &str, headers: &HeaderMap) -> String {
    let mut text = String::with_capacity(64 + headers.len() * 32);
    let _ = write!(text, "{status_line}\r\n");
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        let _ = write!(text, "{name}: {value}\r\n");
    }
    text
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::request::ResponseHeaders;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_render_header_text_round_trips_through_parser() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let text = render_header_text("HTTP/1.1 200 OK", &headers);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));

        let parsed = ResponseHeaders::parse(&text);
        assert_eq!(parsed.get_all("Set-Cookie"), ["a=1", "b=2"]);
        assert_eq!(parsed.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_client_cache_reuses_profile() {
        let transport = HttpTransport::new();
        let profile = ClientProfile {
            ca_cert: None,
            max_redirects: None,
        };
        transport.client_for(profile.clone()).unwrap();
        transport.client_for(profile).unwrap();
        assert_eq!(transport.clients.len(), 1);

        transport
            .client_for(ClientProfile {
                ca_cert: None,
                max_redirects: Some(3),
            })
            .unwrap();
        assert_eq!(transport.clients.len(), 2);
    }

    #[test]
    fn test_missing_certificate_is_reported() {
        let transport = HttpTransport::new();
        let result = transport.client_for(ClientProfile {
            ca_cert: Some(PathBuf::from("/nonexistent/ca.pem")),
            max_redirects: None,
        });
        assert!(matches!(result, Err(TransportFailure::CertificateIo { .. })));
    }

    #[test]
    fn test_invalid_pem_names_certificate_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ca.pem");
        std::fs::write(&path, "-----BEGIN CERTIFICATE-----\nnot base64!\n-----END CERTIFICATE-----\n")
            .unwrap();

        let err = HttpTransport::new()
            .client_for(ClientProfile {
                ca_cert: Some(path.clone()),
                max_redirects: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    fn reqwest_error() -> reqwest::Error {
        Client::new().get("not a url").build().unwrap_err()
    }

    #[test]
    fn test_build_failure_without_certificate_is_client_build() {
        let failure = build_failure(None, reqwest_error());
        assert!(matches!(failure, TransportFailure::ClientBuild { .. }));
        assert!(failure.to_string().starts_with("cannot build HTTP client"));
    }

    #[test]
    fn test_build_failure_with_certificate_names_path() {
        let failure = build_failure(Some(Path::new("/certs/api.pem")), reqwest_error());
        assert!(matches!(
            failure,
            TransportFailure::Certificate { ref path, .. } if path == Path::new("/certs/api.pem")
        ));
    }
}
