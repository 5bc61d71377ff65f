//! Ownership and role authorization decision
//!
//! Every handler that guards a user-owned resource asks the same question:
//! is the caller the owner, or does the caller hold one of the privileged
//! roles? Roles are compared by exact membership; there is no hierarchy.

use super::models::Principal;
use storefront_core::Role;

/// Outcome of an authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Decide whether `principal` may act on a resource
///
/// Allowed iff the principal's role is one of `privileged_roles`, or the
/// resource is owned by the principal. `None` means the resource has no
/// owner, so only the role check applies.
pub fn decide(
    principal: &Principal,
    resource_owner_id: Option<uuid::Uuid>,
    privileged_roles: &[Role],
) -> Decision {
    if privileged_roles.contains(&principal.role) {
        return Decision::Allow;
    }

    if resource_owner_id == Some(principal.user_id) {
        return Decision::Allow;
    }

    Decision::Deny
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_owner_is_allowed() {
        let p = principal(Role::Customer);
        assert_eq!(decide(&p, Some(p.user_id), &[Role::Admin]), Decision::Allow);
    }

    #[test]
    fn test_non_owner_customer_is_denied() {
        let p = principal(Role::Customer);
        assert_eq!(decide(&p, Some(Uuid::new_v4()), &[Role::Admin]), Decision::Deny);
    }

    #[test]
    fn test_privileged_role_is_allowed() {
        let admin = principal(Role::Admin);
        assert!(decide(&admin, Some(Uuid::new_v4()), &[Role::Admin]).is_allowed());
    }

    #[test]
    fn test_no_implicit_hierarchy() {
        // Admin is not granted a shop-only resource unless listed
        let admin = principal(Role::Admin);
        assert_eq!(decide(&admin, None, &[Role::Shop]), Decision::Deny);
        assert_eq!(
            decide(&admin, None, &[Role::Shop, Role::Admin]),
            Decision::Allow
        );
    }

    #[test]
    fn test_unowned_resource_requires_role() {
        let shop = principal(Role::Shop);
        assert_eq!(decide(&shop, None, &[]), Decision::Deny);
        assert_eq!(decide(&shop, None, &[Role::Shop]), Decision::Allow);
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::Shop), Just(Role::Customer)]
    }

    proptest! {
        #[test]
        fn prop_decision_matches_rule(
            role in any_role(),
            privileged in proptest::collection::vec(any_role(), 0..3),
            owns in any::<bool>(),
            owned in any::<bool>(),
        ) {
            let p = principal(role);
            let owner = if !owned {
                None
            } else if owns {
                Some(p.user_id)
            } else {
                Some(Uuid::new_v4())
            };

            let expected = privileged.contains(&role) || (owned && owns);
            prop_assert_eq!(decide(&p, owner, &privileged).is_allowed(), expected);
        }
    }
}
