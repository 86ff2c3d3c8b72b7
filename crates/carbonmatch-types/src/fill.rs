//! Fill and match-result types produced by a buy request.
//!
//! A [`Fill`] is the immutable record of units taken from one listing.
//! A [`MatchResult`] aggregates every fill of one buy request and is kept
//! by the engine as its "last trade" snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, FillId, ListingId};

/// Units taken from a single listing during a buy request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fill {
    /// Deterministic from the buy sequence and fill index.
    pub id: FillId,
    pub listing_id: ListingId,
    pub seller: AccountId,
    pub buyer: AccountId,
    /// Listing price per unit.
    pub price: u64,
    /// Units taken.
    pub quantity: u64,
    /// Credits paid by the buyer to the seller = price × quantity.
    pub cost: u64,
}

impl std::fmt::Display for Fill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Fill[{}] {} -> {} {} @ {} = {}",
            self.id, self.seller, self.buyer, self.quantity, self.price, self.cost,
        )
    }
}

/// Outcome of a buy request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    /// Sequence number of the buy request (0 for the empty snapshot).
    pub buy_sequence: u64,
    pub buyer: Option<AccountId>,
    /// Units requested.
    pub requested: u64,
    /// Units actually filled. May be less than requested (partial fill).
    pub units_filled: u64,
    /// Σ fill cost / units filled. Zero when nothing filled.
    pub weighted_average_price: Decimal,
    /// Σ fill cost.
    pub total_cost: u64,
    pub fills: Vec<Fill>,
    /// Digest over `fills` in order.
    pub fill_root: [u8; 32],
}

impl MatchResult {
    /// The snapshot reported before any buy request has run.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            buy_sequence: 0,
            buyer: None,
            requested: 0,
            units_filled: 0,
            weighted_average_price: Decimal::ZERO,
            total_cost: 0,
            fills: Vec::new(),
            fill_root: [0u8; 32],
        }
    }

    /// Weighted average of `total_cost` over `units_filled`, zero if empty.
    #[must_use]
    pub fn average_price(total_cost: u64, units_filled: u64) -> Decimal {
        if units_filled == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(total_cost) / Decimal::from(units_filled)
        }
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.units_filled < self.requested
    }
}

impl Default for MatchResult {
    fn default() -> Self {
        Self::empty()
    }
}
