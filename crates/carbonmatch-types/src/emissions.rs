//! Emissions records and compliance findings.

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Cumulative reported emissions of one consumer.
///
/// `emissions` only ever grows: reports accumulate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmissionsRecord {
    pub consumer: AccountId,
    pub emissions: u64,
    /// Number of reports received.
    pub reports: u64,
}

impl EmissionsRecord {
    #[must_use]
    pub fn new(consumer: AccountId) -> Self {
        Self {
            consumer,
            emissions: 0,
            reports: 0,
        }
    }

    /// Compliant iff emissions are covered by the consumer's credits.
    #[must_use]
    pub fn is_compliant(&self, credit_balance: u64) -> bool {
        self.emissions <= credit_balance
    }
}

/// A consumer whose emissions exceed its credit balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceViolation {
    pub consumer: AccountId,
    pub balance: u64,
    pub emissions: u64,
    pub exceeded_by: u64,
}
