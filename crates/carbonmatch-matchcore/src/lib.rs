//! # carbonmatch-matchcore
//!
//! **Pure deterministic matching for the CarbonMatch marketplace.**
//!
//! MatchCore owns the book of active sell listings and the price-priority
//! fill algorithm. It has:
//!
//! - **No balance logic**: it never reads or writes the ledger
//! - **Plan, then apply**: a buy is first planned against an immutable
//!   book, so a rejected buy leaves nothing half-applied
//! - **Deterministic output**: same book + same request → same fills,
//!   same fill ids, same fill root
//! - **Self-trade prevention**: a buyer's own listings are skipped

pub mod determinism;
pub mod matcher;
pub mod orderbook;
pub mod price_level;

pub use determinism::{compute_book_digest, compute_fill_root, verify_fill_root};
pub use matcher::{FillPlan, apply_plan, plan_buy};
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
