//! Roles recognised by the access-control registry.

use serde::{Deserialize, Serialize};

/// The role an identity plays in the system.
///
/// Exactly one Regulator exists for the lifetime of a market. Validators
/// are bare addresses with authority but no balance. Generators and
/// Consumers are [`Account`](crate::Account)s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Role {
    Regulator,
    Validator,
    Generator,
    Consumer,
}

impl Role {
    /// Whether this role holds a credit balance.
    #[must_use]
    pub fn holds_credits(self) -> bool {
        matches!(self, Self::Generator | Self::Consumer)
    }

    /// Whether this role may register accounts and allocate credits.
    #[must_use]
    pub fn is_authority(self) -> bool {
        matches!(self, Self::Regulator | Self::Validator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regulator => write!(f, "REGULATOR"),
            Self::Validator => write!(f, "VALIDATOR"),
            Self::Generator => write!(f, "GENERATOR"),
            Self::Consumer => write!(f, "CONSUMER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display() {
        assert_eq!(format!("{}", Role::Regulator), "REGULATOR");
        assert_eq!(format!("{}", Role::Consumer), "CONSUMER");
    }

    #[test]
    fn role_capabilities() {
        assert!(Role::Regulator.is_authority());
        assert!(Role::Validator.is_authority());
        assert!(!Role::Generator.is_authority());
        assert!(Role::Generator.holds_credits());
        assert!(Role::Consumer.holds_credits());
        assert!(!Role::Validator.holds_credits());
    }
}
