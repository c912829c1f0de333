//! Roles and the acting principal.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Error returned when a role string is not one of the known values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Access level of a caller.
///
/// Accounts are only ever `Admin` or `Staff`. `Public` is the role of an
/// anonymous caller and is never stored or carried in a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Unrestricted access.
    Admin,
    /// Access scoped to the staff member's own records.
    Staff,
    /// Anonymous access through public endpoints.
    Public,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Staff => "Staff",
            Self::Public => "Public",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Self::Admin),
            "Staff" => Ok(Self::Staff),
            "Public" => Ok(Self::Public),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// The identity a request acts as.
///
/// Authenticated principals always carry their user id; the public
/// principal has none, so "no owner" cannot be confused with a real user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    Admin(UserId),
    Staff(UserId),
    Public,
}

impl Principal {
    /// Build an authenticated principal from a role and user id.
    ///
    /// Returns `None` for [`Role::Public`], which cannot be authenticated.
    #[must_use]
    pub const fn authenticated(role: Role, user_id: UserId) -> Option<Self> {
        match role {
            Role::Admin => Some(Self::Admin(user_id)),
            Role::Staff => Some(Self::Staff(user_id)),
            Role::Public => None,
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Admin(_) => Role::Admin,
            Self::Staff(_) => Role::Staff,
            Self::Public => Role::Public,
        }
    }

    /// The user this principal acts as, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<UserId> {
        match self {
            Self::Admin(id) | Self::Staff(id) => Some(*id),
            Self::Public => None,
        }
    }
}
