//! Role tiers and the policy that assigns them.
//!
//! The remote role service knows many roles by numeric id. Only one of them
//! is special to the access layer: the reserved superuser role, whose
//! permission set is always the wildcard. Every other role is a standard
//! role whose permissions come from the role service.

use frontdesk_core::RoleId;
use serde::{Deserialize, Serialize};

/// Capability tier of a role, resolved once when a user is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTier {
    /// Standard role; permissions come from the role service.
    Standard,
    /// Reserved superuser role; every permission check passes.
    Superuser,
}

impl RoleTier {
    /// Returns true if this tier bypasses permission checks.
    #[must_use]
    pub fn is_superuser(&self) -> bool {
        matches!(self, Self::Superuser)
    }
}

/// Maps role identifiers onto tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    superuser_role: RoleId,
}

impl RolePolicy {
    /// Creates a policy reserving `superuser_role` as the superuser.
    #[must_use]
    pub fn new(superuser_role: RoleId) -> Self {
        Self { superuser_role }
    }

    /// Returns the reserved superuser role.
    #[must_use]
    pub fn superuser_role(&self) -> RoleId {
        self.superuser_role
    }

    /// Resolves the tier for `role`.
    #[must_use]
    pub fn tier(&self, role: RoleId) -> RoleTier {
        if role == self.superuser_role {
            RoleTier::Superuser
        } else {
            RoleTier::Standard
        }
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new(RoleId::new(1))
    }
}
