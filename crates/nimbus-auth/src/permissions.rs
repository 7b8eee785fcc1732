//! Role-to-permission resolution

use nimbus_db::Role;
use serde::{Deserialize, Serialize};

/// A capability an account can hold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadContent,
    WriteContent,
    ManageOwnProfile,
    ModerateContent,
    ManageUsers,
    ManageTenants,
    ManageSystem,
}

// Each table extends the one below it, so the privilege ordering is a
// superset relation by construction.
const GUEST: &[Permission] = &[Permission::ReadContent];

const USER: &[Permission] = &[
    Permission::ReadContent,
    Permission::WriteContent,
    Permission::ManageOwnProfile,
];

const MODERATOR: &[Permission] = &[
    Permission::ReadContent,
    Permission::WriteContent,
    Permission::ManageOwnProfile,
    Permission::ModerateContent,
];

const ADMIN: &[Permission] = &[
    Permission::ReadContent,
    Permission::WriteContent,
    Permission::ManageOwnProfile,
    Permission::ModerateContent,
    Permission::ManageUsers,
    Permission::ManageTenants,
];

const SUPER_ADMIN: &[Permission] = &[
    Permission::ReadContent,
    Permission::WriteContent,
    Permission::ManageOwnProfile,
    Permission::ModerateContent,
    Permission::ManageUsers,
    Permission::ManageTenants,
    Permission::ManageSystem,
];

/// Capabilities granted by a role
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Guest => GUEST,
        Role::User => USER,
        Role::Moderator => MODERATOR,
        Role::Admin => ADMIN,
        Role::SuperAdmin => SUPER_ADMIN,
    }
}

/// Whether a role grants a permission. Super admin passes every check.
pub fn role_has_permission(role: Role, permission: Permission) -> bool {
    matches!(role, Role::SuperAdmin) || permissions_for(role).contains(&permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LADDER: &[Role] = &[
        Role::Guest,
        Role::User,
        Role::Moderator,
        Role::Admin,
        Role::SuperAdmin,
    ];

    #[test]
    fn test_permission_sets_are_monotonic() {
        for pair in LADDER.windows(2) {
            let lower = permissions_for(pair[0]);
            let higher = permissions_for(pair[1]);
            for p in lower {
                assert!(
                    higher.contains(p),
                    "{:?} should keep every permission of {:?}",
                    pair[1],
                    pair[0]
                );
            }
            assert!(higher.len() > lower.len());
        }
    }

    #[test]
    fn test_super_admin_satisfies_everything() {
        for p in SUPER_ADMIN {
            assert!(role_has_permission(Role::SuperAdmin, *p));
        }
    }

    #[test]
    fn test_role_boundaries() {
        assert!(role_has_permission(Role::Guest, Permission::ReadContent));
        assert!(!role_has_permission(Role::Guest, Permission::WriteContent));
        assert!(!role_has_permission(Role::User, Permission::ModerateContent));
        assert!(!role_has_permission(
            Role::Moderator,
            Permission::ManageUsers
        ));
        assert!(role_has_permission(Role::Admin, Permission::ManageUsers));
        assert!(!role_has_permission(Role::Admin, Permission::ManageSystem));
    }
}
