//! Accounts behind the identity header.

use serde::Serialize;

use bika_core::{Identity, Role, UnitId, UserType};

/// An active account resolved from the trusted identity header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    #[serde(flatten)]
    pub identity: Identity,
    pub username: String,
    pub email: Option<String>,
    /// Name of the account's unit, if any.
    pub unit: Option<String>,
}

/// Account to provision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewAccount {
    pub username: String,
    pub email: Option<String>,
    pub is_superuser: bool,
    pub role: Role,
    pub user_type: UserType,
    pub unit_id: Option<UnitId>,
    pub is_active: bool,
}

impl NewAccount {
    /// An active account with default role and type.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_active: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn user_type(mut self, user_type: UserType) -> Self {
        self.user_type = user_type;
        self
    }

    #[must_use]
    pub const fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub const fn unit(mut self, unit_id: UnitId) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    #[must_use]
    pub const fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
