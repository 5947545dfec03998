//! Session token issuance, validation, and revocation.
//!
//! Tokens are opaque bearer credentials: 32 bytes from the OS RNG,
//! URL-safe base64 encoded. Every validate/revoke call consults the
//! backing store directly so revocation is visible at once across all
//! server instances; there is no in-process cache.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use tracing::error;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::model::UserId;
use crate::store::SessionStore;

/// Create a new session token.
/// The raw value is only handed to the caller; stores are free to keep
/// a digest instead.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: AuthConfig,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Issue a token for `user_id` and persist the session row.
    ///
    /// # Errors
    /// Returns [`AuthError::SessionUnavailable`] if the row cannot be
    /// persisted; callers must treat this as a failed authentication
    /// even though the password already verified.
    pub async fn create_session(&self, user_id: UserId, remember: bool) -> Result<String, AuthError> {
        let token = generate_session_token().map_err(AuthError::store)?;
        let ttl_seconds = if remember {
            self.config.remember_ttl_seconds()
        } else {
            self.config.session_ttl_seconds()
        };
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);
        match self.store.insert(user_id, &token, expires_at).await {
            Ok(()) => Ok(token),
            Err(err) => {
                error!("Session creation error: {err:#}");
                Err(AuthError::SessionUnavailable)
            }
        }
    }

    /// A token is valid iff its row exists and the expiry is strictly in
    /// the future. Missing, malformed, and expired tokens — and store
    /// failures — all read as invalid.
    pub async fn validate_session(&self, token: &str) -> bool {
        match self.store.find_by_token(token).await {
            Ok(Some(record)) => Utc::now() < record.expires_at,
            Ok(None) => false,
            Err(err) => {
                error!("Session validation error: {err:#}");
                false
            }
        }
    }

    /// Delete the session row. Revoking an absent token is a normal
    /// outcome reported as `false`, not an error.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let removed = self.store.delete_by_token(token).await?;
        Ok(removed > 0)
    }
}
