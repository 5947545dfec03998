//! # hearthchat-auth
//!
//! Identity layer for the hearthchat server: password policy enforcement,
//! bcrypt credential hashing, a per-account failed-attempt lockout, and
//! opaque session tokens with expiry and revocation.
//!
//! This crate is a library consumed by the HTTP layer; it owns no routes,
//! templates, or transport concerns. Durable state lives behind the
//! [`store::UserDirectory`] and [`store::SessionStore`] traits, with
//! Postgres implementations in [`store::postgres`] and in-memory ones in
//! [`store::memory`].
//!
//! ## Login flow
//!
//! A login request enters [`AuthService::authenticate`], which looks the
//! user up by username, consults the lockout state machine, verifies the
//! password, and on success issues a session token and writes the
//! caller's [`RequestSession`]. Subsequent requests pass through
//! [`authorize`] or [`authorize_any`], which resolve the session's user
//! and enforce role membership before the handler runs.
//!
//! ## Lockout
//!
//! - **Attempt limit:** 5 failed passwords lock the account for 15 minutes.
//! - **Forgiveness:** the failure counter is forgiven only once an hour
//!   has passed beyond the lock's expiry; merely waiting out the lock
//!   keeps the stale counter, so an immediate retry cannot refresh
//!   lockout eligibility.
//! - **Atomicity:** increment-then-possibly-lock is a single store-level
//!   update, so concurrent wrong passwords never skip the lock.
//!
//! ## Fail closed
//!
//! Any store failure during an authentication step denies the attempt.
//! A corrupted password digest verifies as `false`, never as "no
//! password". Sessions are validated against the backing store on every
//! call so revocation is visible across all server instances.

pub mod config;
pub mod error;
pub mod guard;
pub mod hasher;
pub mod lockout;
pub mod model;
pub mod policy;
pub mod service;
pub mod session;
pub mod store;

pub use config::AuthConfig;
pub use error::AuthError;
pub use guard::{authorize, authorize_any, AccessDecision, RequestProfile, RequestSession};
pub use hasher::PasswordHasher;
pub use model::{NewUser, Role, SessionRecord, User, UserId};
pub use policy::{PasswordPolicy, PolicyViolation};
pub use service::{AuthService, LoginSuccess};
pub use session::SessionManager;
