//! Journal events for the CarbonMatch audit trail.
//!
//! Every accepted mutation appends one [`LedgerEvent`] to the market's
//! journal. Rejected operations append nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Address, ListingId, Role};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    ValidatorCreated {
        validator: Address,
    },
    AccountCreated {
        account: AccountId,
        role: Role,
        address: Address,
        opening_credits: u64,
    },
    CreditsAllocated {
        generator: AccountId,
        amount: u64,
        by: Address,
    },
    AllowanceApproved {
        owner: AccountId,
        spender: Address,
        amount: u64,
    },
    CreditsTransferred {
        from: AccountId,
        to: AccountId,
        amount: u64,
        by: Address,
    },
    EmissionsReported {
        consumer: AccountId,
        emissions: u64,
        cumulative: u64,
        retired: u64,
    },
    ListingCreated {
        listing: ListingId,
        seller: AccountId,
        price: u64,
        quantity: u64,
    },
    ListingWithdrawn {
        listing: ListingId,
        seller: AccountId,
        released: u64,
    },
    BuyExecuted {
        buyer: AccountId,
        requested: u64,
        units_filled: u64,
        average_price: Decimal,
        fills: usize,
    },
}

impl LedgerEvent {
    /// Stable upper-case label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ValidatorCreated { .. } => "VALIDATOR_CREATED",
            Self::AccountCreated { .. } => "ACCOUNT_CREATED",
            Self::CreditsAllocated { .. } => "CREDITS_ALLOCATED",
            Self::AllowanceApproved { .. } => "ALLOWANCE_APPROVED",
            Self::CreditsTransferred { .. } => "CREDITS_TRANSFERRED",
            Self::EmissionsReported { .. } => "EMISSIONS_REPORTED",
            Self::ListingCreated { .. } => "LISTING_CREATED",
            Self::ListingWithdrawn { .. } => "LISTING_WITHDRAWN",
            Self::BuyExecuted { .. } => "BUY_EXECUTED",
        }
    }
}

impl std::fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A journal entry: the event plus its position and wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic, starting at 1. Survives journal eviction.
    pub sequence: u64,
    pub event: LedgerEvent,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_label() {
        let ev = LedgerEvent::CreditsAllocated {
            generator: AccountId(1001),
            amount: 250,
            by: Address::from_index(1),
        };
        assert_eq!(ev.label(), "CREDITS_ALLOCATED");
        assert_eq!(format!("{ev}"), "CREDITS_ALLOCATED");
    }

    #[test]
    fn event_serde_is_tagged() {
        let ev = LedgerEvent::ListingCreated {
            listing: ListingId(1),
            seller: AccountId(1001),
            price: 50,
            quantity: 100,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"listing_created\""), "{json}");
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}
