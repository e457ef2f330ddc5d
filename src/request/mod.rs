//! Outbound request descriptors.
//!
//! A [`Request`] names everything the transport needs for one call: method,
//! absolute URL, raw header lines, payload, basic-auth credentials, and the
//! redirect/timeout knobs that are handed to the transport untouched.
//!
//! # Example
//!
//! ```
//! use outcall_core::request::{Method, Request};
//!
//! let request = Request::new("https://api.example.com/v1/items")
//!     .with_header("Accept: application/json")
//!     .with_form([("name", "widget"), ("qty", "3")]);
//!
//! // Setting a payload switches the default GET to POST.
//! assert_eq!(request.method(), Method::Post);
//! ```

mod headers;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

pub use headers::ResponseHeaders;

/// Default redirect hop limit when redirect following is enabled.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Returns the canonical upper-case method token.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Opaque bytes sent as-is.
    Bytes(Vec<u8>),
    /// Key/value pairs sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

impl Payload {
    /// Encodes the payload into the bytes put on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish()
                .into_bytes(),
        }
    }

    /// Returns the content type implied by the payload kind, if any.
    #[must_use]
    pub fn implied_content_type(&self) -> Option<&'static str> {
        match self {
            Self::Bytes(_) => None,
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
        }
    }
}

/// Basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

// Keep passwords out of logs.
impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Descriptor of one logical outbound call.
///
/// Built by the caller and read-only while a coordinator executes it.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    method_explicit: bool,
    url: String,
    headers: Vec<String>,
    payload: Option<Payload>,
    auth: Option<BasicAuth>,
    follow_redirects: bool,
    max_redirects: u32,
    timeout: Option<Duration>,
}

impl Request {
    /// Creates a GET request for an absolute URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            method_explicit: false,
            url: url.into(),
            headers: Vec::new(),
            payload: None,
            auth: None,
            follow_redirects: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: None,
        }
    }

    /// Sets the method explicitly; a later payload no longer changes it.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self.method_explicit = true;
        self
    }

    /// Appends a raw `Name: value` header line.
    #[must_use]
    pub fn with_header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    /// Sets an opaque body.
    #[must_use]
    pub fn with_body(self, body: impl Into<Vec<u8>>) -> Self {
        self.with_payload(Payload::Bytes(body.into()))
    }

    /// Sets a key/value form body.
    #[must_use]
    pub fn with_form<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.with_payload(Payload::Form(pairs))
    }

    fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        if !self.method_explicit {
            self.method = Method::Post;
        }
        self
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }

    /// Lets the transport follow up to `max_redirects` redirects.
    #[must_use]
    pub fn follow_redirects(mut self, max_redirects: u32) -> Self {
        self.follow_redirects = true;
        self.max_redirects = max_redirects;
        self
    }

    /// Sets a per-call transport timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> Option<&BasicAuth> {
        self.auth.as_ref()
    }

    #[must_use]
    pub fn redirects_followed(&self) -> bool {
        self.follow_redirects
    }

    #[must_use]
    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Parses the URL, returning `None` when it is not absolute.
    #[must_use]
    pub fn parsed_url(&self) -> Option<Url> {
        Url::parse(&self.url).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_get() {
        let request = Request::new("https://example.com/");
        assert_eq!(request.method(), Method::Get);
        assert!(request.payload().is_none());
        assert!(!request.redirects_followed());
        assert_eq!(request.max_redirects(), DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn test_payload_switches_to_post() {
        let request = Request::new("https://example.com/").with_body("x=1");
        assert_eq!(request.method(), Method::Post);
    }

    #[test]
    fn test_explicit_method_survives_payload() {
        let request = Request::new("https://example.com/")
            .with_method(Method::Put)
            .with_body("{}");
        assert_eq!(request.method(), Method::Put);
    }

    #[test]
    fn test_form_payload_encoding() {
        let request = Request::new("https://example.com/").with_form([("a", "1 2"), ("b", "&")]);
        let payload = request.payload().unwrap();
        assert_eq!(payload.to_bytes(), b"a=1+2&b=%26".to_vec());
        assert_eq!(
            payload.implied_content_type(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_method_from_str_case_insensitive() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!(" Delete ".parse::<Method>().unwrap(), Method::Delete);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_basic_auth_debug_redacts_password() {
        let request =
            Request::new("https://example.com/").with_basic_auth("alice", Some("s3cret".into()));
        let rendered = format!("{request:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"), "password leaked: {rendered}");
    }

    #[test]
    fn test_parsed_url_rejects_relative() {
        assert!(Request::new("/relative/path").parsed_url().is_none());
        assert!(Request::new("https://example.com/x").parsed_url().is_some());
    }
}
