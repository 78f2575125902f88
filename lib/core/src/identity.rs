//! Request identity supplied by the external identity collaborator.
//!
//! Cookery does not issue or store credentials. The server binary
//! validates a bearer token and injects an `Identity` into every
//! request; modules only ever see this type.

use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Who is making the request.
///
/// Anonymous callers are allowed through the middleware — each operation
/// decides whether it accepts them (view recording and published-recipe
/// reads do; everything else requires a user).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User { id: String, role: Role },
}

impl Identity {
    /// Construct an authenticated identity with the default role.
    pub fn user(id: impl Into<String>) -> Self {
        Identity::User {
            id: id.into(),
            role: Role::User,
        }
    }

    /// Construct an admin identity.
    pub fn admin(id: impl Into<String>) -> Self {
        Identity::User {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// The user id, if authenticated.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::User { id, .. } => Some(id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::User { role: Role::Admin, .. })
    }

    /// Require an authenticated user id, failing with `Unauthenticated`.
    pub fn require_user(&self) -> Result<&str, ServiceError> {
        self.user_id()
            .ok_or_else(|| ServiceError::Unauthenticated("authentication required".into()))
    }

    /// The capability predicate shared by comment edit/delete and the
    /// owner-facing workflow paths: the entity's owner, or any admin.
    pub fn can_moderate(&self, owner_id: &str) -> bool {
        match self {
            Identity::Anonymous => false,
            Identity::User { id, role } => *role == Role::Admin || id == owner_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_user() {
        assert_eq!(Identity::Anonymous.user_id(), None);
        assert!(Identity::Anonymous.require_user().is_err());
        assert!(!Identity::Anonymous.is_admin());
    }

    #[test]
    fn can_moderate_owner_or_admin() {
        let owner = Identity::user("u1");
        let other = Identity::user("u2");
        let admin = Identity::admin("a1");

        assert!(owner.can_moderate("u1"));
        assert!(!other.can_moderate("u1"));
        assert!(admin.can_moderate("u1"));
        assert!(!Identity::Anonymous.can_moderate("u1"));
    }

    #[test]
    fn require_user_returns_id() {
        assert_eq!(Identity::user("u1").require_user().unwrap(), "u1");
    }
}
