//! Role-based authorization.
//!
//! Authorization is purely role-based. Ownership is enforced by passing the
//! authenticated identity into every customer-scoped operation instead.

use marquee_core::{Role, RoleSet};

use super::AuthError;

/// Whether `roles` satisfies `required`.
#[must_use]
pub fn authorize(roles: &RoleSet, required: Role) -> bool {
    roles.contains(required)
}

/// Like [`authorize`], as a `Result`.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` if the role is missing.
pub fn require(roles: &RoleSet, required: Role) -> Result<(), AuthError> {
    if authorize(roles, required) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_requires_admin_tag() {
        assert!(authorize(&RoleSet::admin(), Role::Admin));
        assert!(!authorize(&RoleSet::user(), Role::Admin));
    }

    #[test]
    fn test_mixed_case_role_does_not_satisfy_admin() {
        let roles = RoleSet::parse_lenient("USER,Admin");
        assert!(!authorize(&roles, Role::Admin));
        assert!(matches!(require(&roles, Role::Admin), Err(AuthError::Forbidden)));
    }

    #[test]
    fn test_empty_set_grants_nothing() {
        let roles: RoleSet = std::iter::empty().collect();
        assert!(!authorize(&roles, Role::User));
        assert!(!authorize(&roles, Role::Admin));
    }
}
