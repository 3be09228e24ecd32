//! # AuthService
//!
//! Admin credential checks and the session lifecycle: a session is opened
//! at login, closed at logout, and silently ignored once expired.

use std::sync::Arc;

use chrono::Duration;
use domains::auth::{CurrentUser, SessionId};
use domains::error::{DomainError, Result};
use domains::models::AdminUser;
use domains::ports::{Clock, PasswordHasher, SessionStore};

use crate::records::RecordService;

const INVALID_CREDENTIALS: &str = "invalid username or password";

#[derive(Clone)]
pub struct AuthService {
    users: RecordService<AdminUser>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: RecordService<AdminUser>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            hasher,
            sessions,
            clock,
            session_ttl,
        }
    }

    /// Creates an administrator. Usernames are unique; the password is
    /// stored only as a salted hash.
    pub async fn provision(&self, username: &str, password: &str) -> Result<AdminUser> {
        if password.is_empty() {
            return Err(DomainError::invalid("password", "This field is required."));
        }
        let mut user = AdminUser::new(username.trim());
        user.set_password(self.hasher.as_ref(), password)?;
        let user = self.users.insert(user).await?;
        tracing::info!(username = %user.username, "admin user provisioned");
        Ok(user)
    }

    /// Creates the first administrator on a fresh install. Does nothing, and
    /// returns `None`, once any administrator exists.
    pub async fn bootstrap(&self, username: &str, password: &str) -> Result<Option<AdminUser>> {
        if !self.users.is_empty().await? {
            return Ok(None);
        }
        let user = self.provision(username, password).await?;
        tracing::warn!(username = %user.username, "bootstrapped the first administrator");
        Ok(Some(user))
    }

    /// Checks a username/password pair. Unknown users and wrong passwords
    /// fail identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AdminUser> {
        let user = self.users.find_by("username", username.trim()).await?;
        match user {
            Some(user) if user.check_password(self.hasher.as_ref(), password) => Ok(user),
            _ => {
                tracing::warn!(username = %username, "admin login rejected");
                Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()))
            }
        }
    }

    /// Opens a session for an authenticated user.
    pub async fn login(&self, user: &AdminUser) -> Result<SessionId> {
        let now = self.clock.now();
        let expires_at = now + self.session_ttl;
        let session = self.sessions.create(user.id, now, expires_at).await?;
        tracing::info!(username = %user.username, %expires_at, "admin session opened");
        Ok(session)
    }

    pub async fn logout(&self, session: &SessionId) -> Result<()> {
        self.sessions.destroy(session).await
    }

    /// Resolves a session to its user. Missing, expired or dangling sessions
    /// and store failures all resolve to `Anonymous`.
    pub async fn current_user(&self, session: Option<&SessionId>) -> CurrentUser {
        let Some(session) = session else {
            return CurrentUser::Anonymous;
        };

        let user_id = match self.sessions.resolve(session, self.clock.now()).await {
            Ok(Some(id)) => id,
            Ok(None) => return CurrentUser::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                return CurrentUser::Anonymous;
            }
        };

        match self.users.get(user_id).await {
            Ok(user) => CurrentUser::Admin(user),
            Err(DomainError::NotFound(..)) => {
                tracing::debug!(%user_id, "session refers to a deleted admin");
                CurrentUser::Anonymous
            }
            Err(e) => {
                tracing::warn!(error = %e, "admin lookup failed");
                CurrentUser::Anonymous
            }
        }
    }
}
