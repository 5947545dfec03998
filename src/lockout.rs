//! Failed-attempt and timed-lock state machine.
//!
//! Each user carries a failure counter and an optional `locked_until`
//! timestamp. The counter and the lock are decoupled from *when* the
//! counter is forgiven: a lock that has merely expired leaves the stale
//! counter in place until a full reset window has passed beyond the
//! expiry, so an attacker cannot refresh lockout eligibility by waiting
//! out the lock and retrying immediately.
//!
//! Counter mutations happen through [`crate::store::UserDirectory`]
//! atomics, never read-modify-write; this module only classifies state
//! and maps failure records to caller-facing errors.

use chrono::{DateTime, Duration, Utc};

use crate::error::AuthError;
use crate::model::User;
use crate::store::FailureRecord;

/// Where an account stands before password verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutStatus {
    /// Lock still active; the password must not be consulted.
    Locked { remaining_minutes: i64 },
    /// Lock expired long enough ago that the counter is forgiven.
    EligibleForReset,
    Normal,
}

/// Classify a user's lockout state at `now`.
///
/// `reset_after_seconds` is the forgiveness window counted from the
/// lock's expiry, not from the last attempt.
#[must_use]
pub fn status(user: &User, reset_after_seconds: i64, now: DateTime<Utc>) -> LockoutStatus {
    if let Some(locked_until) = user.locked_until {
        if locked_until > now {
            // Round up so "less than a minute" never reads as zero.
            // (locked_until > now here, so num_seconds() is positive and
            // (n + 59) / 60 matches the ceiling of n / 60.)
            let remaining_minutes = (((locked_until - now).num_seconds() + 59) / 60).max(1);
            return LockoutStatus::Locked { remaining_minutes };
        }
        if user.failed_login_attempts > 0
            && now > locked_until + Duration::seconds(reset_after_seconds)
        {
            return LockoutStatus::EligibleForReset;
        }
    }
    LockoutStatus::Normal
}

/// Map the stored outcome of a counted failure to the caller's error.
pub(crate) fn failure_error(
    record: &FailureRecord,
    max_attempts: i32,
    lockout_seconds: i64,
    now: DateTime<Utc>,
) -> AuthError {
    if record.failed_attempts >= max_attempts
        && record.locked_until.is_some_and(|until| until > now)
    {
        return AuthError::LockedOut {
            minutes: lockout_seconds / 60,
        };
    }
    AuthError::AttemptsRemaining {
        remaining: (max_attempts - record.failed_attempts).max(0),
    }
}
