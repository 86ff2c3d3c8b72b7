//! Error types for the CarbonMatch ledger and marketplace.
//!
//! All errors use the `CM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Access control errors
//! - 2xx: Account / registry errors
//! - 3xx: Credit errors
//! - 4xx: Listing / matching errors
//! - 5xx: Emissions errors
//! - 6xx: Argument errors
//! - 8xx: Invariant errors
//! - 9xx: General / internal errors
//!
//! Every rejected operation leaves the state machine untouched; none of
//! these errors is fatal to the process.

use thiserror::Error;

use crate::{AccountId, Address, ListingId};

/// Coarse classification of a [`CarbonError`].
///
/// The first five kinds are the ones callers of the operation surface
/// see; the rest come from the hosting plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    DuplicateEntity,
    InvalidArgument,
    InsufficientCredits,
    Invariant,
    Internal,
}

/// Central error enum for all CarbonMatch operations.
#[derive(Debug, Error)]
pub enum CarbonError {
    // =================================================================
    // Access Control Errors (1xx)
    // =================================================================
    /// The caller lacks the role or ownership the operation requires.
    #[error("CM_ERR_100: Permission denied for {caller}: {action}")]
    PermissionDenied { caller: Address, action: String },

    /// A spender tried to move more than its allowance.
    #[error("CM_ERR_101: Allowance exceeded: need {needed}, approved {approved}")]
    AllowanceExceeded { needed: u64, approved: u64 },

    // =================================================================
    // Account / Registry Errors (2xx)
    // =================================================================
    /// The referenced account does not exist (or has the wrong role).
    #[error("CM_ERR_200: Account not found: {0}")]
    AccountNotFound(AccountId),

    /// An account with this id is already registered.
    #[error("CM_ERR_201: Account already exists: {0}")]
    DuplicateAccount(AccountId),

    /// The address is already bound to an account or validator.
    #[error("CM_ERR_202: Address already registered: {0}")]
    DuplicateAddress(Address),

    // =================================================================
    // Credit Errors (3xx)
    // =================================================================
    /// Not enough spendable (unlocked) credits for the operation.
    #[error("CM_ERR_300: Insufficient credits: need {needed}, have {available}")]
    InsufficientCredits { needed: u64, available: u64 },

    /// A credit amount would overflow the `u64` range.
    #[error("CM_ERR_301: Credit arithmetic overflow")]
    CreditOverflow,

    // =================================================================
    // Listing / Matching Errors (4xx)
    // =================================================================
    /// The referenced listing is not on the book.
    #[error("CM_ERR_400: Listing not found: {0}")]
    ListingNotFound(ListingId),

    /// A listing with this id is already on the book.
    #[error("CM_ERR_401: Listing already exists: {0}")]
    DuplicateListing(ListingId),

    // =================================================================
    // Emissions Errors (5xx)
    // =================================================================
    /// Cumulative emissions would overflow the `u64` range.
    #[error("CM_ERR_500: Emissions overflow for consumer {0}")]
    EmissionsOverflow(AccountId),

    // =================================================================
    // Argument Errors (6xx)
    // =================================================================
    /// A non-positive amount, empty name, malformed address, etc.
    #[error("CM_ERR_600: Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Supply conservation invariant violated.
    #[error("CM_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("CM_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("CM_ERR_903: I/O error: {0}")]
    Io(String),

    /// The single-writer service has shut down.
    #[error("CM_ERR_904: Market service unavailable")]
    ServiceUnavailable,
}

impl CarbonError {
    /// Shorthand for [`CarbonError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CarbonError::PermissionDenied`].
    pub fn denied(caller: Address, action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            caller,
            action: action.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied { .. } | Self::AllowanceExceeded { .. } => {
                ErrorKind::PermissionDenied
            }
            Self::AccountNotFound(_) | Self::ListingNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateAccount(_) | Self::DuplicateAddress(_) | Self::DuplicateListing(_) => {
                ErrorKind::DuplicateEntity
            }
            Self::InvalidArgument { .. } | Self::CreditOverflow | Self::EmissionsOverflow(_) => {
                ErrorKind::InvalidArgument
            }
            Self::InsufficientCredits { .. } => ErrorKind::InsufficientCredits,
            Self::SupplyInvariantViolation { .. } => ErrorKind::Invariant,
            Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Io(_)
            | Self::ServiceUnavailable => ErrorKind::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CarbonError>;

impl From<std::io::Error> for CarbonError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CarbonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = CarbonError::AccountNotFound(AccountId(1001));
        let msg = format!("{err}");
        assert!(msg.starts_with("CM_ERR_200"), "Got: {msg}");
        assert!(msg.contains("1001"));
    }

    #[test]
    fn insufficient_credits_display() {
        let err = CarbonError::InsufficientCredits {
            needed: 100,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("CM_ERR_300"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn kinds_cover_surface_errors() {
        let caller = Address::from_bytes([7u8; 20]);
        assert_eq!(
            CarbonError::denied(caller, "allocate").kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            CarbonError::ListingNotFound(ListingId(3)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CarbonError::DuplicateAddress(caller).kind(),
            ErrorKind::DuplicateEntity
        );
        assert_eq!(CarbonError::invalid("zero").kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            CarbonError::InsufficientCredits {
                needed: 1,
                available: 0
            }
            .kind(),
            ErrorKind::InsufficientCredits
        );
    }

    #[test]
    fn all_errors_have_cm_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(CarbonError::denied(Address::from_bytes([1u8; 20]), "x")),
            Box::new(CarbonError::CreditOverflow),
            Box::new(CarbonError::ServiceUnavailable),
            Box::new(CarbonError::Internal("test".into())),
            Box::new(CarbonError::SupplyInvariantViolation {
                reason: "drift".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("CM_ERR_"),
                "Error missing CM_ERR_ prefix: {msg}"
            );
        }
    }
}
