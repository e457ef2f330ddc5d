//! Outcall Core Library
//!
//! This library coordinates outbound calls to remote HTTP APIs: one logical
//! call is retried or aborted according to a status-driven policy, spaced
//! from earlier calls to the same service across processes, validated,
//! parsed, and archived as raw bytes.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`request`] - Request descriptors and response header views
//! - [`transport`] - The transport port, its `reqwest` adapter, and TLS cert overrides
//! - [`throttle`] - Cross-process minimum spacing between calls
//! - [`validate`] - Parse callbacks and response shape prototypes
//! - [`archive`] - Raw response archiving to plain or compressed sinks
//! - [`coordinator`] - The attempt loop tying everything together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod coordinator;
pub mod request;
pub mod throttle;
pub mod transport;
mod user_agent;
pub mod validate;

// Re-export commonly used types
pub use archive::{ArchiveError, ArchiveSink, Archiver, FileSink, GzipSink};
pub use coordinator::{
    Action, ActionHook, ActionMap, AttemptReport, ConfigurationError, Coordinator,
    CoordinatorConfig, CoordinatorError, DEFAULT_MAX_ATTEMPTS, HookVerdict, Outcome,
    TransportError,
};
pub use request::{BasicAuth, Method, Payload, Request, ResponseHeaders};
pub use throttle::{CrossProcessThrottle, ThrottleError, ThrottleIdentity};
pub use transport::{CertTable, HttpTransport, RawResponse, Transport, TransportCall, TransportFailure};
pub use validate::{ParseError, Prototype, ResponseValidator, ValidationError, parsers};
