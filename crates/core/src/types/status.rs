//! Role and account status enums.

use serde::{Deserialize, Serialize};

/// Access level issued by the identity service.
///
/// The role decides which dashboards a user can reach. Records written by a
/// newer backend may carry a role this client does not know; those decode as
/// [`Role::Unrecognized`] instead of failing, and the authorization policy
/// sends them to the root route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Back-office administrator.
    Admin,
    /// Rental desk staff.
    Staff,
    /// Customer renting equipment.
    Customer,
    /// Any role string this client does not understand.
    #[serde(other)]
    Unrecognized,
}

impl Role {
    /// Every role a user can register with.
    pub const ASSIGNABLE: [Self; 3] = [Self::Admin, Self::Staff, Self::Customer];

    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Customer => "customer",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Account status as reported by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ASSIGNABLE {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unrecognized_role_is_not_parseable() {
        assert!("unrecognized".parse::<Role>().is_err());
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_unknown_wire_role_decodes_as_unrecognized() {
        let role: Role = serde_json::from_str("\"auditor\"").unwrap();
        assert_eq!(role, Role::Unrecognized);
    }

    #[test]
    fn test_status_defaults_to_active() {
        assert_eq!(UserStatus::default(), UserStatus::Active);
        assert_eq!(
            serde_json::to_string(&UserStatus::Suspended).unwrap(),
            "\"suspended\""
        );
    }
}
