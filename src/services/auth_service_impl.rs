//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{
    SessionRecord, Store, User, generate_session_token, hash_password_blocking,
    repositories::occupancy::is_unique_violation,
};
use crate::domain::validation::{normalize_email, require_text};
use crate::domain::Role;
use crate::services::auth_service::{AuthError, AuthService, IssuedSession};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.security.session_ttl_days))
    }

    fn check_password(&self, password: &str) -> Result<(), AuthError> {
        let min = self.security.min_password_length;
        if password.chars().count() < min {
            return Err(AuthError::Validation(format!(
                "Password must be at least {min} characters"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        self.create_user(name, email, password, Role::User).await
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<&str>,
    ) -> Result<IssuedSession, AuthError> {
        // Normalized the same way as at registration; input that could never
        // have been registered is just a failed login.
        let Ok(email) = normalize_email(email) else {
            warn!("Failed login attempt with malformed email");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(user) = self.store.verify_user_password(&email, password).await? else {
            warn!(email = %email, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        };

        self.issue_session(&user.email, client_ip).await
    }

    async fn issue_session(
        &self,
        identity: &str,
        client_ip: Option<&str>,
    ) -> Result<IssuedSession, AuthError> {
        let user = self
            .store
            .get_user_by_email(identity)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("User {identity} not found")))?;

        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.session_ttl()).ok_or_else(|| {
            AuthError::Internal(format!(
                "session_ttl_days = {} is out of range",
                self.security.session_ttl_days
            ))
        })?;
        let record = SessionRecord {
            identity: user.email.clone(),
            token: generate_session_token(),
            client_ip: client_ip.map(str::to_string),
            created_at: now,
            expires_at,
        };
        self.store.upsert_session(&record).await?;

        info!(identity = %user.email, "Session issued");
        Ok(IssuedSession {
            user,
            token: record.token,
            expires_at: record.expires_at,
        })
    }

    async fn authenticate(&self, token: &str) -> Result<Option<User>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }

        let Some(session) = self.store.find_session_by_token(token).await? else {
            return Ok(None);
        };
        if session.expires_at < Utc::now() {
            return Ok(None);
        }

        Ok(self.store.get_user_by_email(&session.identity).await?)
    }

    async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        if self.store.delete_session(token).await? {
            info!("Session revoked");
        }
        Ok(())
    }

    async fn promote(&self, actor: &User, email: &str, role: &str) -> Result<User, AuthError> {
        if !actor.role.can_promote() {
            return Err(AuthError::Forbidden(format!(
                "{} may not change roles",
                actor.role
            )));
        }

        let role: Role = role
            .parse()
            .map_err(|e: crate::domain::UnknownRole| AuthError::Validation(e.to_string()))?;
        if !role.is_promotion_target() {
            return Err(AuthError::Validation(format!(
                "Cannot promote to {role}"
            )));
        }
        let email = normalize_email(email)?;

        if !self.store.set_user_role(&email, role).await? {
            return Err(AuthError::NotFound(format!("User {email} not found")));
        }

        info!(identity = %email, role = %role, promoted_by = %actor.email, "Role changed");
        self.store
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("User {email} not found")))
    }

    async fn list_users_by_role(&self, roles: &[Role]) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_users_by_roles(roles).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_users().await?)
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let name = require_text("name", name)?;
        let email = normalize_email(email)?;
        self.check_password(password)?;

        let hash = hash_password_blocking(password, &self.security).await?;

        match self.store.create_user(&name, &email, hash, role).await {
            Ok(user) => {
                info!(identity = %user.email, role = %user.role, "Account created");
                Ok(user)
            }
            Err(err) if is_unique_violation(&err) => Err(AuthError::Conflict(format!(
                "{email} is already registered"
            ))),
            Err(err) => Err(err.into()),
        }
    }
}
