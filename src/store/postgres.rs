//! Postgres-backed user and session stores.
//!
//! Lockout counters are mutated in single `UPDATE` statements so the
//! database, not the process, synchronizes concurrent attempts across
//! all server instances. Session tokens are stored as SHA-256 digests;
//! raw tokens never touch the database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{FailureRecord, InsertOutcome, SessionStore, UserDirectory};
use crate::model::{NewUser, Role, SessionRecord, User, UserId};

const USER_COLUMNS: &str =
    "id, username, display_name, password_hash, role, failed_login_attempts, locked_until";

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        role: role
            .parse::<Role>()
            .with_context(|| format!("user row carries unrecognized role: {role}"))?,
        failed_login_attempts: row.get("failed_login_attempts"),
        locked_until: row.get("locked_until"),
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by username")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO users (username, display_name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.username)
            .bind(&user.display_name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Inserted(User {
                id: row.get("id"),
                username: user.username,
                display_name: user.display_name,
                password_hash: user.password_hash,
                role: user.role,
                failed_login_attempts: 0,
                locked_until: None,
            })),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::DuplicateUsername),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update(&self, user: &User) -> Result<()> {
        let query = r"
            UPDATE users
            SET display_name = $2,
                password_hash = $3,
                role = $4,
                failed_login_attempts = $5,
                locked_until = $6,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user.id)
            .bind(&user.display_name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.failed_login_attempts)
            .bind(user.locked_until)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user")?;
        Ok(())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY display_name ASC");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let rows = sqlx::query(&query)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list users by role")?;
        rows.iter().map(user_from_row).collect()
    }

    async fn count(&self) -> Result<i64> {
        let query = "SELECT COUNT(*) AS count FROM users";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to count users")?;
        Ok(row.get("count"))
    }

    async fn reset_failed_attempts(&self, id: UserId) -> Result<()> {
        let query = "UPDATE users SET failed_login_attempts = 0, updated_at = NOW() WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to reset failed attempts")?;
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: UserId,
        threshold: i32,
        lockout_seconds: i64,
    ) -> Result<Option<FailureRecord>> {
        // One statement: attempts already gated by an active lock are
        // no-ops, and the lock transition fires exactly once when the
        // counter crosses the threshold.
        let query = r"
            UPDATE users
            SET failed_login_attempts = CASE
                    WHEN locked_until IS NOT NULL AND locked_until > NOW()
                    THEN failed_login_attempts
                    ELSE failed_login_attempts + 1
                END,
                locked_until = CASE
                    WHEN (locked_until IS NULL OR locked_until <= NOW())
                         AND failed_login_attempts + 1 >= $2
                    THEN NOW() + ($3 * INTERVAL '1 second')
                    ELSE locked_until
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING failed_login_attempts, locked_until
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(threshold)
            .bind(lockout_seconds)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to record failed attempt")?;
        Ok(row.map(|row| FailureRecord {
            failed_attempts: row.get("failed_login_attempts"),
            locked_until: row.get("locked_until"),
        }))
    }

    async fn clear_lockout(&self, id: UserId) -> Result<()> {
        let query = r"
            UPDATE users
            SET failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to clear lockout")?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Hash a session token so raw values never touch the database.
/// The digest is used for lookups when the token is presented.
fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, user_id: UserId, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let query = r"
            INSERT INTO sessions (user_id, session_hash, expires_at)
            VALUES ($1, $2, $3)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .bind(hash_session_token(token))
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT user_id, expires_at, created_at
            FROM sessions
            WHERE session_hash = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(hash_session_token(token))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;
        Ok(row.map(|row| SessionRecord {
            user_id: row.get("user_id"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE session_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(result.rows_affected())
    }
}
