//! Session identity types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::AdminUser;

/// Opaque identifier of a server-side session.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh, unguessable id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Session ids are bearer credentials; keep them out of logs.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(..)")
    }
}

/// Who is making the current request.
#[derive(Debug, Clone, Default)]
pub enum CurrentUser {
    #[default]
    Anonymous,
    Admin(AdminUser),
}

impl CurrentUser {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CurrentUser::Admin(_))
    }

    pub fn user(&self) -> Option<&AdminUser> {
        match self {
            CurrentUser::Admin(user) => Some(user),
            CurrentUser::Anonymous => None,
        }
    }

    pub fn username(&self) -> &str {
        self.user().map(|u| u.username.as_str()).unwrap_or("anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct_and_hidden_from_debug() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(!format!("{a:?}").contains(a.as_str()));
    }

    #[test]
    fn anonymous_is_not_authenticated() {
        assert!(!CurrentUser::default().is_authenticated());
        assert!(CurrentUser::Admin(AdminUser::new("root")).is_authenticated());
    }
}
