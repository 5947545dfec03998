//! Per-request authorization checks.
//!
//! The HTTP layer invokes these before a handler runs, passing the
//! request-scoped [`RequestSession`] explicitly; nothing here reads
//! ambient state. Denials distinguish browser callers (sent back to the
//! login page) from programmatic ones (handed a structured payload).

use tracing::error;

use crate::model::{Role, User, UserId};
use crate::store::UserDirectory;

/// Request-scoped key/value bag owned by the caller. The core reads the
/// user id and writes the session triple after a successful login; the
/// wire representation (cookie, server-side session, …) is the caller's.
#[derive(Debug, Clone, Default)]
pub struct RequestSession {
    user_id: Option<UserId>,
    session_token: Option<String>,
    remember: bool,
}

impl RequestSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Whether the session should persist across browser restarts.
    #[must_use]
    pub fn remember(&self) -> bool {
        self.remember
    }

    /// Used by tests and by callers restoring a bag from their own storage.
    pub fn set_user_id(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    pub(crate) fn establish(&mut self, user_id: UserId, token: String, remember: bool) {
        self.user_id = Some(user_id);
        self.session_token = Some(token);
        self.remember = remember;
    }

    pub fn clear(&mut self) {
        self.user_id = None;
        self.session_token = None;
        self.remember = false;
    }
}

/// How the caller reached us, for classifying unauthenticated requests.
#[derive(Debug, Clone, Copy)]
pub struct RequestProfile<'a> {
    path: &'a str,
    json_body: bool,
    requested_with: Option<&'a str>,
}

impl<'a> RequestProfile<'a> {
    #[must_use]
    pub fn new(path: &'a str, json_body: bool, requested_with: Option<&'a str>) -> Self {
        Self {
            path,
            json_body,
            requested_with,
        }
    }

    /// Programmatic callers declare themselves with an AJAX marker, a
    /// structured-data body, or an API-style path.
    #[must_use]
    pub fn is_programmatic(&self) -> bool {
        self.requested_with == Some("XMLHttpRequest")
            || self.json_body
            || self.path.starts_with("/conversations")
            || self.path.starts_with("/chat")
    }
}

/// Outcome of an authorization check.
#[derive(Debug)]
pub enum AccessDecision {
    Granted(User),
    /// Browser-style denial: send the caller to the login entry point.
    LoginRequired,
    /// Programmatic denial: reply with a structured 401-style payload.
    NotAuthenticated,
    /// Authenticated but lacking a required role (403-style).
    Forbidden { required: Vec<Role> },
}

impl AccessDecision {
    /// User-displayable error for the denial variants.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Granted(_) | Self::LoginRequired => None,
            Self::NotAuthenticated => Some("Not authenticated".to_string()),
            Self::Forbidden { required } => {
                let roles = required
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("Insufficient permissions. Required role(s): {roles}"))
            }
        }
    }

    /// JSON body for programmatic callers, when the denial carries one.
    #[must_use]
    pub fn error_body(&self) -> Option<serde_json::Value> {
        self.error_message()
            .map(|error| serde_json::json!({ "error": error }))
    }
}

/// Permit only callers whose session resolves to a user holding one of
/// the `allowed` roles.
pub async fn authorize(
    directory: &dyn UserDirectory,
    session: &mut RequestSession,
    allowed: &[Role],
) -> AccessDecision {
    let Some(user_id) = session.user_id() else {
        return AccessDecision::LoginRequired;
    };
    let user = match directory.find_by_id(user_id).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to resolve user {user_id} for authorization: {err:#}");
            return AccessDecision::LoginRequired;
        }
    };
    let Some(user) = user else {
        // The account is gone; the stale session must not linger.
        session.clear();
        return AccessDecision::LoginRequired;
    };
    if !allowed.contains(&user.role) {
        return AccessDecision::Forbidden {
            required: allowed.to_vec(),
        };
    }
    AccessDecision::Granted(user)
}

/// Permit any caller whose session resolves to an existing user.
pub async fn authorize_any(
    directory: &dyn UserDirectory,
    session: &mut RequestSession,
    profile: &RequestProfile<'_>,
) -> AccessDecision {
    let Some(user_id) = session.user_id() else {
        session.clear();
        return denied(profile);
    };
    match directory.find_by_id(user_id).await {
        Ok(Some(user)) => AccessDecision::Granted(user),
        Ok(None) => {
            session.clear();
            denied(profile)
        }
        Err(err) => {
            error!("Failed to resolve user {user_id} for authorization: {err:#}");
            denied(profile)
        }
    }
}

fn denied(profile: &RequestProfile<'_>) -> AccessDecision {
    if profile.is_programmatic() {
        AccessDecision::NotAuthenticated
    } else {
        AccessDecision::LoginRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_classifies_programmatic_callers() {
        assert!(RequestProfile::new("/chat", false, None).is_programmatic());
        assert!(RequestProfile::new("/conversations/7", false, None).is_programmatic());
        assert!(RequestProfile::new("/settings", true, None).is_programmatic());
        assert!(RequestProfile::new("/settings", false, Some("XMLHttpRequest")).is_programmatic());
        assert!(!RequestProfile::new("/settings", false, None).is_programmatic());
        assert!(!RequestProfile::new("/settings", false, Some("SomethingElse")).is_programmatic());
    }

    #[test]
    fn request_session_establish_and_clear() {
        let mut session = RequestSession::new();
        assert_eq!(session.user_id(), None);

        session.establish(7, "token".to_string(), true);
        assert_eq!(session.user_id(), Some(7));
        assert_eq!(session.session_token(), Some("token"));
        assert!(session.remember());

        session.clear();
        assert_eq!(session.user_id(), None);
        assert_eq!(session.session_token(), None);
        assert!(!session.remember());
    }

    #[test]
    fn forbidden_lists_required_roles() {
        let decision = AccessDecision::Forbidden {
            required: vec![Role::AdminParent, Role::UserParent],
        };
        assert_eq!(
            decision.error_message().as_deref(),
            Some("Insufficient permissions. Required role(s): admin-parent, user-parent")
        );
        let body = decision.error_body().unwrap();
        assert_eq!(
            body["error"],
            "Insufficient permissions. Required role(s): admin-parent, user-parent"
        );
    }

    #[test]
    fn granted_and_login_required_carry_no_error() {
        assert_eq!(AccessDecision::LoginRequired.error_message(), None);
        assert!(AccessDecision::NotAuthenticated.error_body().is_some());
    }
}
