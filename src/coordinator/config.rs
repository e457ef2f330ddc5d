//! Coordinator configuration.

use std::time::Duration;

use super::Action;
use crate::throttle::ThrottleIdentity;

/// Default maximum attempts per call (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between repeated attempts (1 second).
pub const DEFAULT_REPEAT_PAUSE: Duration = Duration::from_secs(1);

/// Settings of one coordinator type.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `repeat_pause`: 1 second
/// - `throttle_interval`: none (no cross-process spacing)
/// - `identity_seed`: none (the identity is derived from the other settings)
/// - `expect_response_length`: true
/// - `action_overrides`: none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    max_attempts: u32,
    repeat_pause: Duration,
    throttle_interval: Option<Duration>,
    identity_seed: Option<String>,
    expect_response_length: bool,
    action_overrides: Vec<(u16, Action)>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            repeat_pause: DEFAULT_REPEAT_PAUSE,
            throttle_interval: None,
            identity_seed: None,
            expect_response_length: true,
            action_overrides: Vec::new(),
        }
    }
}

impl CoordinatorConfig {
    /// Default settings for a service named by `identity_seed`.
    ///
    /// The seed names the remote service or configuration, for example
    /// `"billing-api"`; coordinators sharing a seed share a throttle record.
    pub fn for_service(identity_seed: impl Into<String>) -> Self {
        Self {
            identity_seed: Some(identity_seed.into()),
            ..Self::default()
        }
    }

    /// Sets the maximum attempts (clamped to at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_repeat_pause(mut self, pause: Duration) -> Self {
        self.repeat_pause = pause;
        self
    }

    /// Enables cross-process spacing; a zero interval disables it.
    #[must_use]
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Whether an empty terminal body is an error.
    #[must_use]
    pub fn expect_response_length(mut self, expected: bool) -> Self {
        self.expect_response_length = expected;
        self
    }

    /// Replaces the default action for one status code.
    #[must_use]
    pub fn with_action(mut self, status: u16, action: Action) -> Self {
        self.action_overrides.push((status, action));
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn repeat_pause(&self) -> Duration {
        self.repeat_pause
    }

    #[must_use]
    pub fn throttle_interval(&self) -> Option<Duration> {
        self.throttle_interval
    }

    #[must_use]
    pub fn identity_seed(&self) -> Option<&str> {
        self.identity_seed.as_deref()
    }

    #[must_use]
    pub fn expects_response_length(&self) -> bool {
        self.expect_response_length
    }

    #[must_use]
    pub fn action_overrides(&self) -> &[(u16, Action)] {
        &self.action_overrides
    }

    /// The throttle identity.
    ///
    /// A named service hashes its seed. An unnamed one hashes a rendering of
    /// its settings, so only identically configured coordinators share a
    /// throttle record.
    #[must_use]
    pub fn identity(&self) -> ThrottleIdentity {
        match &self.identity_seed {
            Some(seed) => ThrottleIdentity::from_seed(seed),
            None => ThrottleIdentity::from_seed(&self.settings_seed()),
        }
    }

    fn settings_seed(&self) -> String {
        format!(
            "settings:{}:{:?}:{:?}:{}:{:?}",
            self.max_attempts,
            self.repeat_pause,
            self.throttle_interval,
            self.expect_response_length,
            self.action_overrides,
        )
    }
}
