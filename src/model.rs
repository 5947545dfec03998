//! Identity records shared across the crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// Account role; every user has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    AdminParent,
    UserParent,
    Child,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminParent => "admin-parent",
            Self::UserParent => "user-parent",
            Self::Child => "child",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin-parent" => Ok(Self::AdminParent),
            "user-parent" => Ok(Self::UserParent),
            "child" => Ok(Self::Child),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A stored account. `failed_login_attempts` and `locked_until` are
/// mutated only through the lockout path; `username` is immutable after
/// creation.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Insert-shaped account record; the directory assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
}

/// A stored session row. The raw token is returned to the caller once at
/// creation and is not part of the record.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_wire_names() {
        for (role, name) in [
            (Role::AdminParent, "admin-parent"),
            (Role::UserParent, "user-parent"),
            (Role::Child, "child"),
        ] {
            assert_eq!(role.as_str(), name);
            assert_eq!(name.parse::<Role>(), Ok(role));
            assert_eq!(serde_json::to_value(role).ok(), Some(name.into()));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "grandparent".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized role: grandparent");
        assert!(serde_json::from_str::<Role>("\"grandparent\"").is_err());
    }
}
