//! The authenticated caller as the policy engine sees it.

use serde::{Deserialize, Serialize};

use super::{Role, UnitId, UserId, UserType};

/// An authenticated account.
///
/// Built from the `user_account` row of the caller; never from request input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub is_superuser: bool,
    pub role: Role,
    pub user_type: UserType,
    /// Collaboration group; accounts without a unit only share with themselves.
    pub unit_id: Option<UnitId>,
}

impl Identity {
    /// A plain customer with no unit.
    #[must_use]
    pub const fn customer(id: UserId) -> Self {
        Self {
            id,
            is_superuser: false,
            role: Role::Staff,
            user_type: UserType::Customer,
            unit_id: None,
        }
    }

    /// Superusers, the `admin` role and `admin` accounts see and manage everything.
    #[must_use]
    pub const fn is_global_admin(&self) -> bool {
        self.is_superuser
            || matches!(self.role, Role::Admin)
            || matches!(self.user_type, UserType::Admin)
    }

    #[must_use]
    pub const fn is_vendor(&self) -> bool {
        matches!(self.user_type, UserType::Vendor)
    }

    /// Builder-style unit assignment.
    #[must_use]
    pub const fn in_unit(mut self, unit_id: UnitId) -> Self {
        self.unit_id = Some(unit_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_role_is_global_admin() {
        let mut identity = Identity::customer(UserId::new(1));
        assert!(!identity.is_global_admin());

        identity.role = Role::Admin;
        assert!(identity.is_global_admin());

        identity.role = Role::Commander;
        identity.is_superuser = true;
        assert!(identity.is_global_admin());
    }

    #[test]
    fn test_admin_user_type_is_global_admin() {
        let mut identity = Identity::customer(UserId::new(1));
        identity.user_type = UserType::Vendor;
        assert!(!identity.is_global_admin());

        identity.user_type = UserType::Admin;
        assert!(identity.is_global_admin());
    }
}
