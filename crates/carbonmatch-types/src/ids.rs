//! Identifiers used throughout CarbonMatch.
//!
//! Accounts and listings use plain integers so that iteration order is
//! the natural ascending order. Fill ids are UUIDs derived from the buy
//! sequence, so replaying the same request log yields the same ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CarbonError, constants};

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Opaque identifier of a Generator or Consumer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// External (authenticated) address of a caller.
///
/// Serialized as a `0x`-prefixed, lowercase, 40-digit hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; constants::ADDRESS_LEN]);

impl Address {
    /// The all-zero address. Never a valid binding target.
    pub const ZERO: Self = Self([0u8; constants::ADDRESS_LEN]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; constants::ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; constants::ADDRESS_LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Parse a `0x`-prefixed (or bare) 40-digit hex address.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the string is not a well-formed address.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != constants::ADDRESS_LEN * 2 {
            return Err(CarbonError::invalid(format!(
                "malformed address {s:?}: expected {} hex digits",
                constants::ADDRESS_LEN * 2
            )));
        }
        let mut bytes = [0u8; constants::ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| CarbonError::invalid(format!("malformed address {s:?}: {e}")))?;
        Ok(Self(bytes))
    }

    /// Short form for log fields (`0x` + first 4 bytes).
    #[must_use]
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = CarbonError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CarbonError;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// Deterministic non-zero address for fixture number `n`.
    #[must_use]
    pub fn from_index(n: u32) -> Self {
        let mut bytes = [0u8; constants::ADDRESS_LEN];
        bytes[0] = 0xCC;
        bytes[constants::ADDRESS_LEN - 4..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// ListingId
// ---------------------------------------------------------------------------

/// Identifier of a sell listing. Equal to the listing's sequence number,
/// which is assigned once and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ListingId(pub u64);

impl ListingId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listing:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FillId
// ---------------------------------------------------------------------------

/// Identifier of a single fill produced by a buy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FillId(pub Uuid);

impl FillId {
    /// Deterministic `FillId` from the buy request sequence and the fill's
    /// position within that request.
    #[must_use]
    pub fn deterministic(buy_sequence: u64, fill_index: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"carbonmatch:fill_id:v1:");
        hasher.update(buy_sequence.to_le_bytes());
        hasher.update(fill_index.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for FillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
