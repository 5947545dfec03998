//! Tunable thresholds and lifetimes for authentication.

const DEFAULT_MAX_ATTEMPTS: i32 = 5;
const DEFAULT_LOCKOUT_SECONDS: i64 = 15 * 60;
const DEFAULT_ATTEMPT_RESET_SECONDS: i64 = 60 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_REMEMBER_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Lockout and session settings shared by the service and its components.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    max_attempts: i32,
    lockout_seconds: i64,
    attempt_reset_seconds: i64,
    session_ttl_seconds: i64,
    remember_ttl_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
            attempt_reset_seconds: DEFAULT_ATTEMPT_RESET_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            remember_ttl_seconds: DEFAULT_REMEMBER_TTL_SECONDS,
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed passwords tolerated before the account locks.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: i32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: i64) -> Self {
        self.lockout_seconds = seconds;
        self
    }

    /// Time past a lock's expiry before the failure counter is forgiven.
    #[must_use]
    pub fn with_attempt_reset_seconds(mut self, seconds: i64) -> Self {
        self.attempt_reset_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Session lifetime when the caller asked to stay signed in.
    #[must_use]
    pub fn with_remember_ttl_seconds(mut self, seconds: i64) -> Self {
        self.remember_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    #[must_use]
    pub fn lockout_seconds(&self) -> i64 {
        self.lockout_seconds
    }

    #[must_use]
    pub fn attempt_reset_seconds(&self) -> i64 {
        self.attempt_reset_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn remember_ttl_seconds(&self) -> i64 {
        self.remember_ttl_seconds
    }
}
