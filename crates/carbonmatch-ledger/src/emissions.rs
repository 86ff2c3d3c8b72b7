//! Emissions monitor: cumulative reports and compliance checking.
//!
//! Reports only ever accumulate. Compliance is evaluated on demand
//! against the ledger: a consumer is compliant iff its cumulative
//! emissions do not exceed its reported credit balance.

use std::collections::BTreeMap;

use carbonmatch_types::{
    AccountId, CarbonError, ComplianceViolation, EmissionsRecord, Result, Role,
};

use crate::CreditLedger;

/// Per-consumer emissions records.
#[derive(Debug, Default)]
pub struct EmissionsMonitor {
    records: BTreeMap<AccountId, EmissionsRecord>,
}

impl EmissionsMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Rebuild from stored records.
    pub fn from_records(records: impl IntoIterator<Item = EmissionsRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.consumer, r)).collect(),
        }
    }

    /// Cumulative emissions `consumer` would have after reporting `emissions`.
    ///
    /// # Errors
    /// `EmissionsOverflow` if the total would leave the `u64` range.
    pub fn projected(&self, consumer: AccountId, emissions: u64) -> Result<u64> {
        self.emissions(consumer)
            .checked_add(emissions)
            .ok_or(CarbonError::EmissionsOverflow(consumer))
    }

    /// Append a report. The caller has already checked that `consumer`
    /// is a registered consumer. Returns the new cumulative total.
    ///
    /// # Errors
    /// `EmissionsOverflow` if the total would leave the `u64` range.
    pub fn record(&mut self, consumer: AccountId, emissions: u64) -> Result<u64> {
        let cumulative = self.projected(consumer, emissions)?;
        let record = self
            .records
            .entry(consumer)
            .or_insert_with(|| EmissionsRecord::new(consumer));
        record.emissions = cumulative;
        record.reports += 1;
        Ok(cumulative)
    }

    /// Cumulative emissions, zero if the consumer never reported.
    #[must_use]
    pub fn emissions(&self, consumer: AccountId) -> u64 {
        self.records.get(&consumer).map_or(0, |r| r.emissions)
    }

    /// All records, ascending by consumer id.
    pub fn records(&self) -> impl Iterator<Item = &EmissionsRecord> {
        self.records.values()
    }

    /// Non-compliant consumers with their shortfall, ascending by id.
    #[must_use]
    pub fn compliance_report(&self, ledger: &CreditLedger) -> Vec<ComplianceViolation> {
        self.records
            .values()
            .filter_map(|record| {
                let account = ledger
                    .account_with_role(record.consumer, Role::Consumer)
                    .ok()?;
                let balance = account.credits();
                (!record.is_compliant(balance)).then(|| ComplianceViolation {
                    consumer: record.consumer,
                    balance,
                    emissions: record.emissions,
                    exceeded_by: record.emissions - balance,
                })
            })
            .collect()
    }

    /// Ids of non-compliant consumers, ascending.
    #[must_use]
    pub fn non_compliant(&self, ledger: &CreditLedger) -> Vec<AccountId> {
        self.compliance_report(ledger)
            .into_iter()
            .map(|v| v.consumer)
            .collect()
    }
}
