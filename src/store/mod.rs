//! Collaborator traits for the backing user and session tables.
//!
//! "Not found" is a normal empty result on every lookup; a transport or
//! store error is a distinct failure. Implementations must make
//! [`UserDirectory::record_failed_attempt`] atomic with respect to
//! concurrent attempts against the same user — a row-level update,
//! conditional statement, or single critical section, never a
//! read-modify-write across two round trips.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{NewUser, Role, SessionRecord, User, UserId};

/// Result of inserting a user with a possibly-taken username.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(User),
    DuplicateUsername,
}

/// Counter state after a recorded failure.
#[derive(Debug, Clone, Copy)]
pub struct FailureRecord {
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Persist a new account; the store assigns the id.
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome>;

    /// Persist mutations to an existing account. The username is
    /// immutable and never written back.
    async fn update(&self, user: &User) -> Result<()>;

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>>;

    async fn count(&self) -> Result<i64>;

    /// Zero the failure counter, leaving any lock timestamp in place.
    async fn reset_failed_attempts(&self, id: UserId) -> Result<()>;

    /// Record one failed password attempt in a single atomic update:
    /// unless a lock is currently active, increment the counter, and set
    /// `locked_until = now + lockout_seconds` when the counter crosses
    /// `threshold` (at most one lock transition per lockout). Returns the
    /// resulting counter state, or `None` if the user row is gone.
    async fn record_failed_attempt(
        &self,
        id: UserId,
        threshold: i32,
        lockout_seconds: i64,
    ) -> Result<Option<FailureRecord>>;

    /// Zero the failure counter and clear the lock after a successful
    /// authentication.
    async fn clear_lockout(&self, id: UserId) -> Result<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, user_id: UserId, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Look up a session row by its raw token. Expired rows are still
    /// returned; expiry is the caller's judgement.
    async fn find_by_token(&self, token: &str) -> Result<Option<SessionRecord>>;

    /// Delete the row, reporting how many rows were removed.
    async fn delete_by_token(&self, token: &str) -> Result<u64>;
}
