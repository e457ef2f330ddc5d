//! Status-driven action policy.
//!
//! After every attempt the coordinator needs a verdict: stop with success,
//! try again, stop with failure, or give up because the server redirected.
//! [`ActionMap`] answers that from the status code alone; an injected
//! [`ActionHook`] may overrule it after looking at the full attempt.
//!
//! # Default table
//!
//! | Status | Action |
//! |--------|--------|
//! | 0 (transport failure) | Repeat |
//! | 200-299 | Success |
//! | 300-399 | Redirected |
//! | 400-600 | Break |
//! | 500, 502, 503, 504 | Repeat |
//!
//! Anything else (1xx, 1-99, above 600) has no action.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ConfigurationError;
use crate::request::ResponseHeaders;
use crate::transport::NETWORK_FAILURE_STATUS;

/// Highest status code the table covers.
pub const MAX_STATUS: u16 = 600;

/// Verdict for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Terminal; the response is the answer.
    Success,
    /// Try again after the repeat pause.
    Repeat,
    /// Terminal; the response is final but not a success.
    Break,
    /// Terminal and fatal; the server redirected and redirects are not followed here.
    Redirected,
}

static DEFAULT_ACTIONS: LazyLock<ActionMap> = LazyLock::new(ActionMap::build_defaults);

/// Status code → action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMap {
    table: Vec<Option<Action>>,
}

impl ActionMap {
    /// The process-wide default table, built on first use.
    #[must_use]
    pub fn defaults() -> &'static ActionMap {
        &DEFAULT_ACTIONS
    }

    /// Explicit match arms are used for the retryable codes for
    /// documentation purposes, even though they return the same value.
    #[allow(clippy::match_same_arms)]
    fn build_defaults() -> Self {
        let table = (0..=MAX_STATUS)
            .map(|status| match status {
                NETWORK_FAILURE_STATUS => Some(Action::Repeat),
                500 => Some(Action::Repeat), // Internal Server Error
                502 => Some(Action::Repeat), // Bad Gateway
                503 => Some(Action::Repeat), // Service Unavailable
                504 => Some(Action::Repeat), // Gateway Timeout
                200..=299 => Some(Action::Success),
                300..=399 => Some(Action::Redirected),
                400..=MAX_STATUS => Some(Action::Break),
                _ => None,
            })
            .collect();
        Self { table }
    }

    /// Defaults with the named codes replaced; every other code keeps its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::StatusOutOfRange`] for codes above 600.
    pub fn with_overrides(
        overrides: impl IntoIterator<Item = (u16, Action)>,
    ) -> Result<Self, ConfigurationError> {
        let mut map = Self::defaults().clone();
        for (status, action) in overrides {
            let slot = map
                .table
                .get_mut(usize::from(status))
                .ok_or(ConfigurationError::StatusOutOfRange { status })?;
            *slot = Some(action);
        }
        Ok(map)
    }

    /// The action for a status code, if any.
    #[must_use]
    #[instrument(level = "trace", skip(self))]
    pub fn action_for(&self, status: u16) -> Option<Action> {
        self.table.get(usize::from(status)).copied().flatten()
    }
}

/// What the hook sees after one attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptReport<'a> {
    /// 1-based attempt index.
    pub attempt: u32,
    pub status: u16,
    /// Body returned by this attempt (possibly empty).
    pub body: &'a [u8],
    pub headers: &'a ResponseHeaders,
}

/// Explicit decision returned by an [`ActionHook`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookVerdict {
    /// Overrides the table lookup when set.
    pub action: Option<Action>,
    /// Pre-sets the call's boolean result when set.
    pub ok: Option<bool>,
}

impl HookVerdict {
    /// No opinion; the table decides.
    #[must_use]
    pub fn defer() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn action(action: Action) -> Self {
        Self {
            action: Some(action),
            ok: None,
        }
    }

    #[must_use]
    pub fn with_ok(mut self, ok: bool) -> Self {
        self.ok = Some(ok);
        self
    }
}

/// Per-service strategy consulted after every attempt.
///
/// Use it for services that report errors inside 200 responses, or that
/// signal "try again" with a status the table treats as final.
pub trait ActionHook: Send + Sync {
    fn inspect(&self, report: &AttemptReport<'_>) -> HookVerdict;
}

impl<F> ActionHook for F
where
    F: Fn(&AttemptReport<'_>) -> HookVerdict + Send + Sync,
{
    fn inspect(&self, report: &AttemptReport<'_>) -> HookVerdict {
        self(report)
    }
}
