//! Domain service for accounts and sessions.
//!
//! Handles registration, login, session issue/lookup/revocation and role
//! promotion.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{InvalidInput, Role};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<InvalidInput> for AuthError {
    fn from(err: InvalidInput) -> Self {
        Self::Validation(err.0)
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// A freshly issued session. The token is only ever handed out here.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account with role `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the email is already registered.
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError>;

    /// Verifies credentials and issues a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a
    /// wrong password alike.
    async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<&str>,
    ) -> Result<IssuedSession, AuthError>;

    /// Replaces any existing session for `identity` with a new one.
    async fn issue_session(
        &self,
        identity: &str,
        client_ip: Option<&str>,
    ) -> Result<IssuedSession, AuthError>;

    /// Resolves a session token to its user. Unknown and expired tokens
    /// yield `None`.
    async fn authenticate(&self, token: &str) -> Result<Option<User>, AuthError>;

    /// Deletes the session. Unknown tokens are ignored.
    async fn revoke(&self, token: &str) -> Result<(), AuthError>;

    /// Changes the role of `email`. Managers only.
    async fn promote(&self, actor: &User, email: &str, role: &str) -> Result<User, AuthError>;

    async fn list_users_by_role(&self, roles: &[Role]) -> Result<Vec<User>, AuthError>;

    async fn list_users(&self) -> Result<Vec<User>, AuthError>;

    /// Administrative account creation with an explicit role.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError>;
}
