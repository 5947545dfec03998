//! Caller-facing error taxonomy for authentication flows.
//!
//! Store failures are deliberately opaque to the caller ("Authentication
//! failed") while the underlying cause is logged for operability. The
//! unknown-user and wrong-password cases share one base message to avoid
//! username enumeration.

use tracing::error;

use crate::policy::PolicyViolation;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Password rejected by the strength policy; the reason is shown verbatim.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// Unknown username or wrong password, without attempt accounting.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Wrong password on a counted attempt.
    #[error("Invalid username or password. {remaining} attempts remaining")]
    AttemptsRemaining { remaining: i32 },

    /// The account was already locked when the attempt arrived.
    #[error("Account is locked. Try again in {minutes} minutes")]
    Locked { minutes: i64 },

    /// This attempt crossed the failure threshold and triggered the lock.
    #[error("Too many failed attempts. Account locked for {minutes} minutes")]
    LockedOut { minutes: i64 },

    #[error("Username already exists")]
    UsernameTaken,

    /// The password verified but the session row could not be persisted.
    #[error("Failed to create session")]
    SessionUnavailable,

    /// Backing store unreachable or inconsistent; the attempt is denied.
    #[error("Authentication failed")]
    Store(#[source] anyhow::Error),
}

impl AuthError {
    /// Wrap a store failure, logging the cause once at the point of denial.
    pub(crate) fn store(err: anyhow::Error) -> Self {
        error!("Authentication store error: {err:#}");
        Self::Store(err)
    }
}
