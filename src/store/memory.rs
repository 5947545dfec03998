//! In-memory stores for tests and single-process embedding.
//!
//! Both stores serialize access through one mutex, which makes the
//! failed-attempt update naturally atomic: the whole
//! increment-then-possibly-lock step runs in a single critical section.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::{FailureRecord, InsertOutcome, SessionStore, UserDirectory};
use crate::model::{NewUser, Role, SessionRecord, User, UserId};

#[derive(Default)]
struct UserTable {
    next_id: UserId,
    rows: HashMap<UserId, User>,
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    inner: Mutex<UserTable>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let table = self.inner.lock().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let table = self.inner.lock().await;
        Ok(table
            .rows
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        let mut table = self.inner.lock().await;
        if table.rows.values().any(|row| row.username == user.username) {
            return Ok(InsertOutcome::DuplicateUsername);
        }
        table.next_id += 1;
        let user = User {
            id: table.next_id,
            username: user.username,
            display_name: user.display_name,
            password_hash: user.password_hash,
            role: user.role,
            failed_login_attempts: 0,
            locked_until: None,
        };
        table.rows.insert(user.id, user.clone());
        Ok(InsertOutcome::Inserted(user))
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut table = self.inner.lock().await;
        if let Some(row) = table.rows.get_mut(&user.id) {
            row.display_name = user.display_name.clone();
            row.password_hash = user.password_hash.clone();
            row.role = user.role;
            row.failed_login_attempts = user.failed_login_attempts;
            row.locked_until = user.locked_until;
        }
        Ok(())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let table = self.inner.lock().await;
        let mut users: Vec<User> = table
            .rows
            .values()
            .filter(|user| user.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(users)
    }

    async fn count(&self) -> Result<i64> {
        let table = self.inner.lock().await;
        Ok(table.rows.len() as i64)
    }

    async fn reset_failed_attempts(&self, id: UserId) -> Result<()> {
        let mut table = self.inner.lock().await;
        if let Some(row) = table.rows.get_mut(&id) {
            row.failed_login_attempts = 0;
        }
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: UserId,
        threshold: i32,
        lockout_seconds: i64,
    ) -> Result<Option<FailureRecord>> {
        let mut table = self.inner.lock().await;
        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        let now = Utc::now();
        let lock_active = row.locked_until.is_some_and(|until| until > now);
        if !lock_active {
            row.failed_login_attempts += 1;
            if row.failed_login_attempts >= threshold {
                row.locked_until = Some(now + Duration::seconds(lockout_seconds));
            }
        }
        Ok(Some(FailureRecord {
            failed_attempts: row.failed_login_attempts,
            locked_until: row.locked_until,
        }))
    }

    async fn clear_lockout(&self, id: UserId) -> Result<()> {
        let mut table = self.inner.lock().await;
        if let Some(row) = table.rows.get_mut(&id) {
            row.failed_login_attempts = 0;
            row.locked_until = None;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    rows: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, user_id: UserId, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock().await;
        rows.insert(
            token.to_string(),
            SessionRecord {
                user_id,
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<SessionRecord>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(token).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64> {
        let mut rows = self.rows.lock().await;
        Ok(u64::from(rows.remove(token).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            display_name: username.to_string(),
            password_hash: "digest".to_string(),
            role: Role::Child,
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_rejects_duplicates() {
        let directory = MemoryUserDirectory::new();
        let InsertOutcome::Inserted(first) = directory.insert(new_user("alice")).await.unwrap()
        else {
            panic!("expected insert");
        };
        assert_eq!(first.id, 1);
        assert_eq!(first.failed_login_attempts, 0);

        assert!(matches!(
            directory.insert(new_user("alice")).await.unwrap(),
            InsertOutcome::DuplicateUsername
        ));
        assert_eq!(directory.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_attempts_lock_at_the_threshold_once() {
        let directory = MemoryUserDirectory::new();
        let InsertOutcome::Inserted(user) = directory.insert(new_user("alice")).await.unwrap()
        else {
            panic!("expected insert");
        };

        for expected in 1..=4 {
            let record = directory
                .record_failed_attempt(user.id, 5, 15 * 60)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record.failed_attempts, expected);
            assert_eq!(record.locked_until, None);
        }

        let locking = directory
            .record_failed_attempt(user.id, 5, 15 * 60)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locking.failed_attempts, 5);
        let locked_until = locking.locked_until.expect("lock set at threshold");

        // Attempts under an active lock are no-ops.
        let gated = directory
            .record_failed_attempt(user.id, 5, 15 * 60)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(gated.failed_attempts, 5);
        assert_eq!(gated.locked_until, Some(locked_until));
    }

    #[tokio::test]
    async fn expired_lock_with_stale_counter_relocks_on_failure() {
        let directory = MemoryUserDirectory::new();
        let InsertOutcome::Inserted(mut user) = directory.insert(new_user("alice")).await.unwrap()
        else {
            panic!("expected insert");
        };
        user.failed_login_attempts = 5;
        user.locked_until = Some(Utc::now() - Duration::minutes(1));
        directory.update(&user).await.unwrap();

        let record = directory
            .record_failed_attempt(user.id, 5, 15 * 60)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.failed_attempts, 6);
        assert!(record.locked_until.is_some_and(|until| until > Utc::now()));
    }

    #[tokio::test]
    async fn missing_user_yields_no_failure_record() {
        let directory = MemoryUserDirectory::new();
        assert!(directory
            .record_failed_attempt(42, 5, 15 * 60)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn session_rows_delete_idempotently() {
        let store = MemorySessionStore::new();
        let expires = Utc::now() + Duration::hours(1);
        store.insert(1, "token", expires).await.unwrap();

        let record = store.find_by_token("token").await.unwrap().unwrap();
        assert_eq!(record.user_id, 1);
        assert_eq!(record.expires_at, expires);

        assert_eq!(store.delete_by_token("token").await.unwrap(), 1);
        assert_eq!(store.delete_by_token("token").await.unwrap(), 0);
        assert!(store.find_by_token("token").await.unwrap().is_none());
    }
}
