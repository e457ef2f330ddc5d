//! The outbound request coordinator.
//!
//! A [`Coordinator`] turns one [`Request`] into one logical call:
//!
//! 1. Wait for this service's turn on the cross-process throttle.
//! 2. Attempt the call through the [`Transport`], consulting the action
//!    hook and [`ActionMap`] after every attempt, pausing between repeats.
//! 3. Parse and validate the terminal response, archive the raw bytes, and
//!    only then surface a parse failure.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use outcall_core::coordinator::{Coordinator, CoordinatorConfig};
//! use outcall_core::request::Request;
//! use outcall_core::transport::HttpTransport;
//! use outcall_core::validate::{ResponseValidator, parsers};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoordinatorConfig::for_service("billing-api")
//!     .with_throttle_interval(Duration::from_millis(500));
//! let coordinator = Coordinator::new(config, Arc::new(HttpTransport::new()))?
//!     .with_validator(ResponseValidator::new().with_parser(parsers::json));
//!
//! let outcome = coordinator
//!     .execute(&Request::new("https://billing.example.com/v1/invoices"))
//!     .await?;
//! println!("ok={} after {} attempt(s)", outcome.ok, outcome.attempts);
//! # Ok(())
//! # }
//! ```

mod action;
mod config;
mod error;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::archive::Archiver;
use crate::request::{Request, ResponseHeaders};
use crate::throttle::{CrossProcessThrottle, ThrottleIdentity};
use crate::transport::{CertTable, RawResponse, Transport, TransportCall};
use crate::validate::ResponseValidator;

pub use action::{Action, ActionHook, ActionMap, AttemptReport, HookVerdict, MAX_STATUS};
pub use config::{CoordinatorConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_REPEAT_PAUSE};
pub use error::{ConfigurationError, CoordinatorError, TransportError};

/// Result of one coordinated call.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Hook-provided result, or `status < 400`.
    pub ok: bool,
    /// Status of the last attempt.
    pub status: u16,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Last non-empty body seen across attempts.
    pub raw: Vec<u8>,
    /// Parsed response, when parsing was requested and succeeded.
    pub parsed: Option<Value>,
    /// Headers of the last attempt.
    pub headers: ResponseHeaders,
}

/// Per-call working record, reset by every execute.
#[derive(Debug, Default)]
struct AttemptState {
    attempt: u32,
    raw: Vec<u8>,
    status: u16,
    header_text: String,
}

/// Issues calls to one remote service under retry, throttle, validation,
/// and archive policy.
pub struct Coordinator {
    config: CoordinatorConfig,
    identity: ThrottleIdentity,
    actions: ActionMap,
    transport: Arc<dyn Transport>,
    throttle: CrossProcessThrottle,
    hook: Option<Arc<dyn ActionHook>>,
    validator: ResponseValidator,
    archiver: Option<Arc<Mutex<Archiver>>>,
    archive_prefix: Option<String>,
    certs: Option<Arc<CertTable>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("identity", &self.identity)
            .field("throttle", &self.throttle)
            .field("has_hook", &self.hook.is_some())
            .field("validator", &self.validator)
            .field("has_archiver", &self.archiver.is_some())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a coordinator over a shared transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::StatusOutOfRange`] when an action
    /// override names a status above 600.
    pub fn new(
        config: CoordinatorConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigurationError> {
        let actions = ActionMap::with_overrides(config.action_overrides().iter().copied())?;
        Ok(Self {
            identity: config.identity(),
            config,
            actions,
            transport,
            throttle: CrossProcessThrottle::default(),
            hook: None,
            validator: ResponseValidator::default(),
            archiver: None,
            archive_prefix: None,
            certs: None,
        })
    }

    /// Uses a throttle rooted somewhere other than the system temp dir.
    #[must_use]
    pub fn with_throttle(mut self, throttle: CrossProcessThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Installs the per-attempt action hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl ActionHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: ResponseValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Archives raw responses through a (possibly shared) archiver.
    #[must_use]
    pub fn with_archiver(mut self, archiver: Arc<Mutex<Archiver>>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Line written before every archived body.
    #[must_use]
    pub fn with_archive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.archive_prefix = Some(prefix.into());
        self
    }

    /// Uses this table instead of the process-wide one.
    #[must_use]
    pub fn with_cert_table(mut self, certs: CertTable) -> Self {
        self.certs = Some(Arc::new(certs));
        self
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    #[must_use]
    pub fn identity(&self) -> &ThrottleIdentity {
        &self.identity
    }

    // The fn item would pin the result to `'static`.
    #[allow(clippy::redundant_closure)]
    fn cert_table(&self) -> &CertTable {
        self.certs.as_deref().unwrap_or_else(|| CertTable::global())
    }

    /// Executes the request and parses the terminal response.
    ///
    /// # Errors
    ///
    /// - [`CoordinatorError::Configuration`] when a status has no action
    /// - [`CoordinatorError::Transport`] on redirects, exhausted retries,
    ///   an unexpected empty body, or an invalid URL
    /// - [`CoordinatorError::Validation`] when parsing or the prototype check
    ///   fails (raised after the raw body was archived)
    /// - [`CoordinatorError::Archive`] / [`CoordinatorError::Throttle`] on
    ///   archive or throttle I/O failures
    pub async fn execute(&self, request: &Request) -> Result<Outcome, CoordinatorError> {
        self.run(request, true).await
    }

    /// Executes the request without parsing.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), minus validation errors.
    pub async fn execute_raw(&self, request: &Request) -> Result<Outcome, CoordinatorError> {
        self.run(request, false).await
    }

    #[instrument(
        skip(self, request),
        fields(method = %request.method(), url = %request.url(), identity = %self.identity)
    )]
    async fn run(&self, request: &Request, parse: bool) -> Result<Outcome, CoordinatorError> {
        let url = request
            .parsed_url()
            .ok_or_else(|| TransportError::invalid_url(request.url()))?;

        if let Some(interval) = self.config.throttle_interval() {
            self.throttle.wait_turn(&self.identity, interval).await?;
        }

        let max_attempts = self.config.max_attempts();
        let mut state = AttemptState::default();
        let mut ok = false;
        let mut last_action = Action::Break;

        while state.attempt < max_attempts {
            state.attempt += 1;

            let ca_cert = self.cert_table().resolve(&url).map(Path::to_path_buf);
            let call = TransportCall::new(request).with_ca_cert(ca_cert.as_deref());
            let response = match self.transport.send(call).await {
                Ok(response) => response,
                Err(error) => {
                    warn!(attempt = state.attempt, error = %error, "transport call failed");
                    RawResponse::network_failure()
                }
            };

            // An empty retry body never replaces an earlier real one.
            if !response.body.is_empty() {
                state.raw.clone_from(&response.body);
            }
            state.status = response.status;
            state.header_text = response.header_text;

            // A bookkeeping failure must not cost the response already in hand.
            if self.config.throttle_interval().is_some()
                && let Err(error) = self.throttle.record_call(&self.identity).await
            {
                warn!(attempt = state.attempt, error = %error, "could not record throttle call");
            }

            let headers = ResponseHeaders::parse(&state.header_text);
            let verdict = self.hook.as_ref().map_or_else(HookVerdict::defer, |hook| {
                hook.inspect(&AttemptReport {
                    attempt: state.attempt,
                    status: state.status,
                    body: &response.body,
                    headers: &headers,
                })
            });
            ok = verdict.ok.unwrap_or(state.status < 400);

            let action = verdict
                .action
                .or_else(|| self.actions.action_for(state.status))
                .ok_or_else(|| ConfigurationError::no_action(request.url(), state.status))?;
            debug!(
                attempt = state.attempt,
                status = state.status,
                ?action,
                bytes = response.body.len(),
                "attempt finished"
            );
            last_action = action;

            match action {
                Action::Redirected => {
                    return Err(TransportError::redirected(
                        request.url(),
                        state.status,
                        headers.get("location").map(str::to_string),
                    )
                    .into());
                }
                Action::Success | Action::Break => break,
                Action::Repeat => {
                    if state.attempt < max_attempts {
                        tokio::time::sleep(self.config.repeat_pause()).await;
                    }
                }
            }
        }

        if last_action == Action::Repeat {
            if !state.raw.is_empty() {
                self.archive(&state.raw, state.status).await?;
            }
            return Err(TransportError::retries_exhausted(
                request.url(),
                state.status,
                state.attempt,
            )
            .into());
        }

        // Parse before archiving, but never let a parse failure keep the
        // raw body out of the archive.
        let mut parsed = None;
        let mut deferred = None;
        if parse {
            match self.validator.validate(&state.raw) {
                Ok(value) => parsed = Some(value),
                Err(error) => deferred = Some(error),
            }
        }

        if !state.raw.is_empty() {
            self.archive(&state.raw, state.status).await?;
            if let Some(source) = deferred {
                return Err(CoordinatorError::Validation {
                    status: state.status,
                    source,
                });
            }
        } else if self.config.expects_response_length() {
            return Err(TransportError::empty_response(request.url(), state.status).into());
        } else if let Some(error) = deferred {
            debug!(error = %error, "ignoring validation failure of empty response");
        }

        info!(
            ok,
            status = state.status,
            attempts = state.attempt,
            bytes = state.raw.len(),
            "call complete"
        );

        Ok(Outcome {
            ok,
            status: state.status,
            attempts: state.attempt,
            headers: ResponseHeaders::parse(&state.header_text),
            raw: state.raw,
            parsed,
        })
    }

    async fn archive(&self, raw: &[u8], status: u16) -> Result<(), CoordinatorError> {
        let Some(archiver) = &self.archiver else {
            return Ok(());
        };
        archiver
            .lock()
            .await
            .append(raw, self.archive_prefix.as_deref())
            .map_err(|source| CoordinatorError::Archive { status, source })
    }
}
