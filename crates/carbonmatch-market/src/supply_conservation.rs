//! Supply conservation invariant checker.
//!
//! Invariant enforced after every mutation:
//! ```text
//! Σ(available + locked) == Σ(issued) - Σ(retired)
//! ```
//!
//! Issuance is `allocate_credit` plus consumer opening credits. Retirement
//! only happens under the `retire` emissions policy. Listings, fills and
//! transfers move credits around but never change the total.

use carbonmatch_types::{CarbonError, Result};

/// Running issuance / retirement totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupplyConservation {
    issued: u128,
    retired: u128,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored totals.
    #[must_use]
    pub fn from_totals(issued: u128, retired: u128) -> Self {
        Self { issued, retired }
    }

    pub fn record_issuance(&mut self, amount: u64) {
        self.issued += u128::from(amount);
    }

    pub fn record_retirement(&mut self, amount: u64) {
        self.retired += u128::from(amount);
    }

    /// Expected total supply: issued - retired.
    #[must_use]
    pub fn expected_supply(&self) -> u128 {
        self.issued.saturating_sub(self.retired)
    }

    #[must_use]
    pub fn total_issued(&self) -> u128 {
        self.issued
    }

    #[must_use]
    pub fn total_retired(&self) -> u128 {
        self.retired
    }

    /// Compare the actual supply held across all accounts with the
    /// expected supply.
    ///
    /// # Errors
    /// [`CarbonError::SupplyInvariantViolation`] if actual ≠ expected, or if
    /// more was retired than ever issued.
    pub fn verify(&self, actual_supply: u128) -> Result<()> {
        if self.retired > self.issued {
            return Err(CarbonError::SupplyInvariantViolation {
                reason: format!(
                    "retired {} exceeds issued {}",
                    self.retired, self.issued
                ),
            });
        }
        let expected = self.expected_supply();
        if actual_supply != expected {
            return Err(CarbonError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} \
                     (issued={}, retired={})",
                    self.issued, self.retired,
                ),
            });
        }
        Ok(())
    }
}
