//! # carbonmatch-ledger
//!
//! **Ledger plane**: who may do what, and who holds which credits.
//!
//! ## Components
//!
//! 1. **AccessControl**: the Regulator, the Validator set, and the
//!    address ↔ account bindings. Every mutating call is gated here.
//! 2. **CreditLedger**: per-account available/locked balances; the only
//!    place balances change.
//! 3. **AllowanceBook**: owner → spender approvals for delegated transfers.
//! 4. **EmissionsMonitor**: cumulative emissions per consumer and the
//!    compliance check against ledger balances.
//!
//! ## Flow
//!
//! ```text
//! caller → AccessControl.require_*() → CreditLedger / EmissionsMonitor
//! ```

pub mod access_control;
pub mod allowance;
pub mod credit_ledger;
pub mod emissions;

pub use access_control::AccessControl;
pub use allowance::AllowanceBook;
pub use credit_ledger::CreditLedger;
pub use emissions::EmissionsMonitor;
