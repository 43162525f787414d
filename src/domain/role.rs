use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static role attached to every account.
///
/// Roles are ordered by privilege: `User` books and shares machines for
/// itself, `Assigner` additionally hands machines to other people and manages
/// the machine inventory, `Manager` additionally promotes accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assigner,
    Manager,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assigner => "assigner",
            Self::Manager => "manager",
        }
    }

    /// Book or add contributors on behalf of another account.
    #[must_use]
    pub const fn can_assign(&self) -> bool {
        matches!(self, Self::Assigner | Self::Manager)
    }

    /// Add or remove machines from the inventory.
    #[must_use]
    pub const fn can_manage_machines(&self) -> bool {
        self.can_assign()
    }

    #[must_use]
    pub const fn can_promote(&self) -> bool {
        matches!(self, Self::Manager)
    }

    /// Only plain users join other people's machines themselves; privileged
    /// roles go through the assignment form instead.
    #[must_use]
    pub const fn can_self_contribute(&self) -> bool {
        matches!(self, Self::User)
    }

    /// Roles a manager may grant through promotion.
    #[must_use]
    pub const fn is_promotion_target(&self) -> bool {
        matches!(self, Self::Assigner | Self::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assigner" => Ok(Self::Assigner),
            "manager" => Ok(Self::Manager),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}
