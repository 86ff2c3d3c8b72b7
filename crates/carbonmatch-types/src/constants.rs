//! System-wide constants for the CarbonMatch ledger and marketplace.

/// Length of an external address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Maximum length of an account display name, in characters.
pub const MAX_NAME_LEN: usize = 128;

/// Default cap on open listings a single account may hold.
pub const DEFAULT_MAX_OPEN_LISTINGS_PER_ACCOUNT: usize = 256;

/// Default number of journal events retained before the oldest is evicted.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 10_000;

/// Default depth of the single-writer service request queue.
pub const DEFAULT_SERVICE_QUEUE_DEPTH: usize = 1024;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "CarbonMatch";
