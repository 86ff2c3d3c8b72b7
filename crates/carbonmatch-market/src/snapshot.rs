//! Full-state snapshots.
//!
//! A [`MarketSnapshot`] is everything needed to rebuild a market: config,
//! registry, balances, allowances, emissions, the book, counters, the last
//! match, supply totals and the retained journal. It carries a SHA-256
//! digest over its JSON encoding; [`CarbonMarket::restore`] refuses a
//! snapshot whose digest or conservation check fails.

use std::path::Path;

use carbonmatch_ledger::{AccessControl, AllowanceBook, CreditLedger, EmissionsMonitor};
use carbonmatch_matchcore::{OrderBook, verify_fill_root};
use carbonmatch_types::{
    Account, AccountId, Address, CarbonError, EmissionsRecord, EventRecord, Listing, ListingId,
    MarketConfig, MatchResult, Result, Role,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{CarbonMarket, EventJournal, SupplyConservation};

/// The digested part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub config: MarketConfig,
    pub validators: Vec<Address>,
    /// Ascending by id.
    pub accounts: Vec<Account>,
    /// `(owner, spender, amount)`.
    pub allowances: Vec<(AccountId, Address, u64)>,
    pub emissions: Vec<EmissionsRecord>,
    /// In matching priority.
    pub listings: Vec<Listing>,
    pub next_listing: ListingId,
    pub buy_sequence: u64,
    pub last_match: MatchResult,
    pub total_issued: u128,
    pub total_retired: u128,
    pub journal: Vec<EventRecord>,
    pub journal_sequence: u64,
}

impl MarketState {
    /// Hex SHA-256 over the JSON encoding.
    pub fn digest(&self) -> Result<String> {
        let encoded = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(b"carbonmatch:snapshot:v1:");
        hasher.update(&encoded);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// A market state plus its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub state: MarketState,
    pub state_digest: String,
}

impl MarketSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl CarbonMarket {
    /// Capture the full state.
    pub fn snapshot(&self) -> Result<MarketSnapshot> {
        let state = MarketState {
            config: self.config.clone(),
            validators: self.access.validators(),
            accounts: self.ledger.accounts().cloned().collect(),
            allowances: self.allowances.entries().collect(),
            emissions: self.emissions.records().cloned().collect(),
            listings: self.book.listings().cloned().collect(),
            next_listing: self.next_listing,
            buy_sequence: self.buy_sequence,
            last_match: self.last_match.clone(),
            total_issued: self.supply.total_issued(),
            total_retired: self.supply.total_retired(),
            journal: self.journal.records().cloned().collect(),
            journal_sequence: self.journal.last_sequence(),
        };
        let state_digest = state.digest()?;
        Ok(MarketSnapshot {
            state,
            state_digest,
        })
    }

    /// Rebuild a market from a snapshot.
    ///
    /// # Errors
    /// - `SupplyInvariantViolation` if the digest does not match, a
    ///   listing id is not below `next_listing`, the last match's fill root
    ///   does not cover its fills, or conservation fails
    /// - `Configuration` / registry errors for inconsistent contents
    pub fn restore(snapshot: MarketSnapshot) -> Result<Self> {
        let MarketSnapshot {
            state,
            state_digest,
        } = snapshot;
        let actual = state.digest()?;
        if actual != state_digest {
            tracing::error!(expected = %state_digest, actual = %actual, "Snapshot digest mismatch");
            return Err(CarbonError::SupplyInvariantViolation {
                reason: format!("snapshot digest {actual} != recorded {state_digest}"),
            });
        }

        state.config.validate()?;
        let access = AccessControl::restore(
            state.config.regulator,
            state.validators.iter().copied(),
            state.accounts.iter(),
        )?;
        let ledger = CreditLedger::from_accounts(state.accounts)?;

        let mut allowances = AllowanceBook::new();
        for (owner, spender, amount) in state.allowances {
            ledger.account(owner)?;
            allowances.approve(owner, spender, amount);
        }

        for record in &state.emissions {
            ledger.account_with_role(record.consumer, Role::Consumer)?;
        }
        let emissions = EmissionsMonitor::from_records(state.emissions);

        let mut book = OrderBook::new();
        for listing in state.listings {
            if listing.id >= state.next_listing {
                return Err(CarbonError::SupplyInvariantViolation {
                    reason: format!(
                        "{} is not below next listing id {}",
                        listing.id, state.next_listing
                    ),
                });
            }
            book.insert(listing)?;
        }

        let last = &state.last_match;
        if last.buy_sequence > 0 && !verify_fill_root(&last.fills, &last.fill_root) {
            return Err(CarbonError::SupplyInvariantViolation {
                reason: format!("fill root of buy #{} does not match its fills", last.buy_sequence),
            });
        }

        let journal = EventJournal::restore(
            state.config.journal_capacity,
            state.journal,
            state.journal_sequence,
        )?;

        let market = Self {
            config: state.config,
            access,
            ledger,
            allowances,
            emissions,
            book,
            supply: SupplyConservation::from_totals(state.total_issued, state.total_retired),
            journal,
            next_listing: state.next_listing,
            buy_sequence: state.buy_sequence,
            last_match: state.last_match,
        };
        market.verify_supply()?;

        tracing::info!(
            accounts = market.ledger.len(),
            listings = market.book.len(),
            "Market restored from snapshot"
        );
        Ok(market)
    }
}
