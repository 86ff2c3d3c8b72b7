//! # carbonmatch-types
//!
//! Shared types, errors, and configuration for the **CarbonMatch** credit
//! ledger and marketplace.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`Address`], [`ListingId`], [`FillId`]
//! - **Roles**: [`Role`]
//! - **Account model**: [`Account`], [`CreditBalance`]
//! - **Listing model**: [`Listing`]
//! - **Fill model**: [`Fill`], [`MatchResult`]
//! - **Emissions model**: [`EmissionsRecord`], [`ComplianceViolation`]
//! - **Journal model**: [`LedgerEvent`], [`EventRecord`]
//! - **RPC surface**: [`Request`], [`Response`]
//! - **Configuration**: [`MarketConfig`], [`EmissionsPolicy`]
//! - **Errors**: [`CarbonError`] with `CM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod account;
pub mod command;
pub mod config;
pub mod constants;
pub mod emissions;
pub mod error;
pub mod event;
pub mod fill;
pub mod ids;
pub mod listing;
pub mod role;

// Re-export all primary types at crate root for ergonomic imports:
//   use carbonmatch_types::{Account, Listing, Fill, CarbonError, ...};

pub use account::*;
pub use command::*;
pub use config::*;
pub use emissions::*;
pub use error::*;
pub use event::*;
pub use fill::*;
pub use ids::*;
pub use listing::*;
pub use role::*;

// Constants are accessed via `carbonmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
