//! # carbonmatch-market
//!
//! The serially executed CarbonMatch state machine: a role-gated carbon
//! credit ledger with emissions compliance, plus a price-priority
//! marketplace for trading credits.
//!
//! ## Components
//!
//! 1. **CarbonMarket**: composes access control, the credit ledger,
//!    allowances, the emissions monitor and the sell book. Every
//!    operation fully applies or fully fails.
//! 2. **SupplyConservation**: issued − retired must equal the credits held
//!    across all accounts after every mutation.
//! 3. **EventJournal**: bounded audit trail of accepted mutations.
//! 4. **MarketSnapshot**: digested full-state capture and restore.
//! 5. **MarketService**: single-writer tokio actor in front of a market.
//!
//! ## Flow
//!
//! ```text
//! MarketHandle.call(caller, Request)
//!        │  mpsc (arrival order)
//!        ▼
//! CarbonMarket.execute() ── gate ── validate ── apply ── journal
//! ```

pub mod journal;
pub mod market;
pub mod service;
pub mod snapshot;
pub mod supply_conservation;
pub mod telemetry;

pub use journal::EventJournal;
pub use market::CarbonMarket;
pub use service::{MarketHandle, MarketService};
pub use snapshot::{MarketSnapshot, MarketState};
pub use supply_conservation::SupplyConservation;
pub use telemetry::{LogFormat, init_tracing};
