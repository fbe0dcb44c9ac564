//! Ownership checks for per-user resources.
//!
//! A failed check is reported as "not found" so callers cannot probe for
//! other users' records. Capability checks on whole endpoints use
//! `Forbidden` instead (see [`AuthGateway::authenticate_privileged`]).
//!
//! [`AuthGateway::authenticate_privileged`]: crate::auth::gateway::AuthGateway::authenticate_privileged

use crate::{auth::gateway::Identity, error::AppError, models::account::Account, models::user::Capability};

/// A record that belongs to exactly one user
pub trait OwnedResource {
    /// Name used in the not-found message
    const KIND: &'static str;

    fn owner_id(&self) -> i64;
}

impl OwnedResource for Account {
    const KIND: &'static str = "Account";

    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// True iff the identity owns the resource or may access any resource
pub fn allow(identity: &Identity, resource_owner_id: i64) -> bool {
    identity.id() == resource_owner_id || identity.can(Capability::AccessAnyResource)
}

/// Pass the resource through when allowed, otherwise `NotFound`
pub fn ensure_access<R: OwnedResource>(identity: &Identity, resource: R) -> Result<R, AppError> {
    if allow(identity, resource.owner_id()) {
        Ok(resource)
    } else {
        tracing::debug!(
            user_id = identity.id(),
            owner_id = resource.owner_id(),
            "Ownership check failed for {}",
            R::KIND
        );
        Err(AppError::not_found(R::KIND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use chrono::Utc;

    fn identity(id: i64, is_superuser: bool) -> Identity {
        Identity::new(User {
            id,
            email: format!("user{}@x.com", id),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            is_active: true,
            is_superuser,
            password_reset_token: None,
            password_reset_expires: None,
            timezone: "UTC".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        })
    }

    fn account_owned_by(owner: i64) -> Account {
        Account {
            id: 42,
            user_id: owner,
            name: "Everyday".to_string(),
            account_type: "checking".to_string(),
            bank_name: None,
            account_number: None,
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_allow_matrix() {
        assert!(allow(&identity(7, false), 7));
        assert!(!allow(&identity(9, false), 7));
        assert!(allow(&identity(9, true), 7));
    }

    #[test]
    fn test_non_owner_gets_not_found() {
        let err = ensure_access(&identity(9, false), account_owned_by(7)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref what) if what == "Account"));
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_owner_and_superuser_pass() {
        assert_eq!(ensure_access(&identity(7, false), account_owned_by(7)).unwrap().id, 42);
        assert_eq!(ensure_access(&identity(1, true), account_owned_by(7)).unwrap().id, 42);
    }
}
