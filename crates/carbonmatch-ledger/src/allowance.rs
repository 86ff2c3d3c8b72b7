//! Owner → spender approvals for delegated credit transfers.
//!
//! An approval replaces any previous one for the same pair. A transfer by
//! the spender consumes the allowance; a zero allowance is dropped.

use std::collections::BTreeMap;

use carbonmatch_types::{AccountId, Address, CarbonError, Result};

/// Allowances keyed by `(owner account, spender address)`.
#[derive(Debug, Default)]
pub struct AllowanceBook {
    approvals: BTreeMap<(AccountId, Address), u64>,
}

impl AllowanceBook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            approvals: BTreeMap::new(),
        }
    }

    /// Set the allowance of `spender` over `owner`'s credits.
    pub fn approve(&mut self, owner: AccountId, spender: Address, amount: u64) {
        if amount == 0 {
            self.approvals.remove(&(owner, spender));
        } else {
            self.approvals.insert((owner, spender), amount);
        }
    }

    /// Current allowance, zero if none.
    #[must_use]
    pub fn allowance(&self, owner: AccountId, spender: &Address) -> u64 {
        self.approvals
            .get(&(owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Check that `spender` may move `amount` from `owner` without
    /// consuming anything.
    ///
    /// # Errors
    /// `AllowanceExceeded` if the approval is missing or too small.
    pub fn check(&self, owner: AccountId, spender: &Address, amount: u64) -> Result<()> {
        let approved = self.allowance(owner, spender);
        if approved < amount {
            return Err(CarbonError::AllowanceExceeded {
                needed: amount,
                approved,
            });
        }
        Ok(())
    }

    /// Consume `amount` of the allowance.
    ///
    /// # Errors
    /// `AllowanceExceeded` if the approval is missing or too small.
    pub fn consume(&mut self, owner: AccountId, spender: &Address, amount: u64) -> Result<()> {
        self.check(owner, spender, amount)?;
        let left = self.allowance(owner, spender) - amount;
        self.approve(owner, *spender, left);
        Ok(())
    }

    /// Every non-zero approval, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (AccountId, Address, u64)> + '_ {
        self.approvals
            .iter()
            .map(|((owner, spender), amount)| (*owner, *spender, *amount))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.approvals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.approvals.is_empty()
    }
}
