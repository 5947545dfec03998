//! Authentication façade composing the policy, hasher, lockout, and
//! session components over the store collaborators.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::guard::RequestSession;
use crate::hasher::PasswordHasher;
use crate::lockout::{self, LockoutStatus};
use crate::model::{NewUser, Role, User};
use crate::policy::PasswordPolicy;
use crate::session::SessionManager;
use crate::store::{InsertOutcome, SessionStore, UserDirectory};

/// A successful authentication: the resolved user and the raw session
/// token to hand back to the caller.
#[derive(Debug)]
pub struct LoginSuccess {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    sessions: SessionManager,
    policy: PasswordPolicy,
    hasher: PasswordHasher,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions: SessionManager::new(sessions, config.clone()),
            policy: PasswordPolicy,
            hasher: PasswordHasher::new(),
            config,
        }
    }

    /// Replace the hasher, e.g. with a reduced work factor in tests.
    #[must_use]
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    /// Authenticate a user, enforcing the lockout state machine, and on
    /// success issue a session token and populate the caller's bag.
    ///
    /// # Errors
    /// All failure classes surface as [`AuthError`]; store failures deny
    /// the attempt (fail closed) with the cause logged, never shown.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
        remember: bool,
        request: &mut RequestSession,
    ) -> Result<LoginSuccess, AuthError> {
        info!("Authentication attempt for username: {username}");
        let user = self
            .users
            .find_by_username(username)
            .await
            .map_err(AuthError::store)?;
        let Some(user) = user else {
            warn!("Failed login attempt - user not found: {username}");
            return Err(AuthError::InvalidCredentials);
        };

        let now = Utc::now();
        match lockout::status(&user, self.config.attempt_reset_seconds(), now) {
            LockoutStatus::Locked { remaining_minutes } => {
                warn!(
                    "Login attempt for locked account: {username}, \
                     remaining lockout time: {remaining_minutes} minutes"
                );
                return Err(AuthError::Locked {
                    minutes: remaining_minutes,
                });
            }
            LockoutStatus::EligibleForReset => {
                // Persisted before verification, whatever this attempt's outcome.
                info!("Resetting failed login attempts for user: {username}");
                self.users
                    .reset_failed_attempts(user.id)
                    .await
                    .map_err(AuthError::store)?;
            }
            LockoutStatus::Normal => {}
        }

        if !self
            .hasher
            .verify(password.expose_secret(), &user.password_hash)
        {
            let record = self
                .users
                .record_failed_attempt(
                    user.id,
                    self.config.max_attempts(),
                    self.config.lockout_seconds(),
                )
                .await
                .map_err(AuthError::store)?;
            let Some(record) = record else {
                return Err(AuthError::InvalidCredentials);
            };
            let err = lockout::failure_error(
                &record,
                self.config.max_attempts(),
                self.config.lockout_seconds(),
                now,
            );
            match &err {
                AuthError::LockedOut { minutes } => warn!(
                    "Account locked due to too many failed attempts: {username}, \
                     lockout duration: {minutes} minutes"
                ),
                _ => warn!(
                    "Failed login attempt for user: {username}, attempts remaining: {}",
                    (self.config.max_attempts() - record.failed_attempts).max(0)
                ),
            }
            return Err(err);
        }

        self.users
            .clear_lockout(user.id)
            .await
            .map_err(AuthError::store)?;

        let token = self.sessions.create_session(user.id, remember).await?;
        request.establish(user.id, token.clone(), remember);
        info!("Successful login for user: {username}, remember me: {remember}");
        Ok(LoginSuccess { user, token })
    }

    /// Create an account: policy check, duplicate check, hash, insert.
    ///
    /// # Errors
    /// [`AuthError::Policy`] for weak passwords, [`AuthError::UsernameTaken`]
    /// for duplicates (including insert races), [`AuthError::Store`] otherwise.
    pub async fn create_user(
        &self,
        username: &str,
        password: &SecretString,
        display_name: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        self.policy.validate(password.expose_secret())?;

        info!("Creating user: {username}, {display_name}, {role}");
        let existing = self
            .users
            .find_by_username(username)
            .await
            .map_err(AuthError::store)?;
        if existing.is_some() {
            warn!("User already exists: {username}");
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self
            .hasher
            .hash(password.expose_secret())
            .map_err(AuthError::store)?;
        let outcome = self
            .users
            .insert(NewUser {
                username: username.to_string(),
                display_name: display_name.to_string(),
                password_hash,
                role,
            })
            .await
            .map_err(AuthError::store)?;

        match outcome {
            InsertOutcome::Inserted(user) => {
                info!("Created user: {username} with id {}", user.id);
                Ok(user)
            }
            InsertOutcome::DuplicateUsername => {
                warn!("User already exists: {username}");
                Err(AuthError::UsernameTaken)
            }
        }
    }

    /// Revoke the session row and clear the caller's bag. Reports whether
    /// a row was actually removed; revoking an unknown token is "nothing
    /// to do", and store failures log and report `false`.
    pub async fn logout(&self, token: &str, request: &mut RequestSession) -> bool {
        let removed = match self.sessions.revoke(token).await {
            Ok(removed) => removed,
            Err(err) => {
                error!("Logout error: {err:#}");
                false
            }
        };
        request.clear();
        removed
    }

    pub async fn validate_session(&self, token: &str) -> bool {
        self.sessions.validate_session(token).await
    }

    /// Bootstrap check gating first-run setup. Assumes users exist when
    /// the store cannot be consulted, so setup never reopens on a store
    /// failure.
    pub async fn has_any_user(&self) -> bool {
        match self.users.count().await {
            Ok(count) => count > 0,
            Err(err) => {
                error!("Error checking users: {err:#}");
                true
            }
        }
    }
}
