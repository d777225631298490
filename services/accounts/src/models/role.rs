//! Profile role and related functionality

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Role a user holds in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Vendor,
    Admin,
}

/// Raised when a string does not name a known role
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Vendor, Role::Admin];

    /// Stored and serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Vendor => "Vendor",
            Role::Admin => "Admin",
        }
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
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_its_stored_form() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn test_role_parsing_is_case_sensitive() {
        assert_eq!(
            "Student".parse::<Role>(),
            Err(UnknownRole("Student".to_string()))
        );
    }

    #[test]
    fn test_role_display_name() {
        assert_eq!(Role::Vendor.display_name(), "Vendor");
        assert_eq!(Role::default(), Role::Student);
    }
}
