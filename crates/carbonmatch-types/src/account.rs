//! Account and credit-balance types.
//!
//! Every account has an `available` balance (spendable, listable) and a
//! `locked` balance (committed to its own active listings). The balance
//! reported to callers is the total of the two.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Address, Role};

/// Credit balance of a single account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CreditBalance {
    /// Free for transfers, new listings, and paying for purchases.
    pub available: u64,
    /// Committed to the account's own active listings.
    pub locked: u64,
}

impl CreditBalance {
    /// Total balance (available + locked). This is what `getCredits` reports.
    ///
    /// The ledger never lets the sum exceed `u64::MAX`.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.available.saturating_add(self.locked)
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available == 0 && self.locked == 0
    }
}

/// A Generator or Consumer account, bound to exactly one external address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub role: Role,
    pub address: Address,
    pub balance: CreditBalance,
}

impl Account {
    #[must_use]
    pub fn new(id: AccountId, name: impl Into<String>, role: Role, address: Address) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            address,
            balance: CreditBalance::default(),
        }
    }

    /// Reported credit balance (includes locked credits).
    #[must_use]
    pub fn credits(&self) -> u64 {
        self.balance.total()
    }

    #[must_use]
    pub fn is_generator(&self) -> bool {
        self.role == Role::Generator
    }

    #[must_use]
    pub fn is_consumer(&self) -> bool {
        self.role == Role::Consumer
    }

    /// Whether `caller` controls this account.
    #[must_use]
    pub fn is_controlled_by(&self, caller: &Address) -> bool {
        self.address == *caller
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_default_is_zero() {
        let entry = CreditBalance::default();
        assert_eq!(entry.available, 0);
        assert_eq!(entry.locked, 0);
        assert!(entry.is_zero());
    }

    #[test]
    fn balance_total_includes_locked() {
        let entry = CreditBalance {
            available: 60,
            locked: 40,
        };
        assert_eq!(entry.total(), 100);
        assert!(!entry.is_zero());
    }

    #[test]
    fn account_control_and_role() {
        let owner = Address::from_index(1);
        let account = Account::new(AccountId(1001), "GreenTech Solar Farm", Role::Generator, owner);
        assert!(account.is_controlled_by(&owner));
        assert!(!account.is_controlled_by(&Address::from_index(2)));
        assert!(account.is_generator());
        assert!(!account.is_consumer());
        assert_eq!(account.credits(), 0);
    }

    #[test]
    fn account_serde_roundtrip() {
        let mut account = Account::new(
            AccountId(2001),
            "EcoManufacturing Corp",
            Role::Consumer,
            Address::from_index(3),
        );
        account.balance.available = 100;
        let json = serde_json::to_string(&account).unwrap();
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(account, back);
    }
}
