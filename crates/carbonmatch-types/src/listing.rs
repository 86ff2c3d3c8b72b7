//! Sell listings held on the marketplace book.
//!
//! A listing's remaining quantity is backed one-to-one by credits locked
//! in the seller's account. A listing with nothing remaining is removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, ListingId};

/// An active sell order on the book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub id: ListingId,
    pub seller: AccountId,
    /// Credits paid per unit. Always positive.
    pub price: u64,
    /// Quantity at creation.
    pub quantity: u64,
    /// Quantity still for sale. Always positive while on the book.
    pub remaining: u64,
    /// FIFO tie-break among equal prices. Assigned once, never reused.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    #[must_use]
    pub fn new(id: ListingId, seller: AccountId, price: u64, quantity: u64) -> Self {
        Self {
            id,
            seller,
            price,
            quantity,
            remaining: quantity,
            sequence: id.0,
            created_at: Utc::now(),
        }
    }

    /// Matching priority: cheapest first, oldest first among ties.
    #[must_use]
    pub fn priority(&self) -> (u64, u64) {
        (self.price, self.sequence)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    #[must_use]
    pub fn filled(&self) -> u64 {
        self.quantity - self.remaining
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Listing {
    pub fn dummy(sequence: u64, seller: u64, price: u64, quantity: u64) -> Self {
        Self::new(ListingId(sequence), AccountId(seller), price, quantity)
    }
}
