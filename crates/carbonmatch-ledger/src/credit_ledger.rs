//! Credit balances with available/locked accounting.
//!
//! The ledger is the source of truth for every account and its balance.
//! All mutations are atomic: either the full operation succeeds or the
//! balances are unchanged. Amounts are checked for overflow before any
//! entry is touched.

use std::collections::BTreeMap;

use carbonmatch_types::{Account, AccountId, CarbonError, CreditBalance, Result, Role};

/// Per-account credit balances.
///
/// Accounts are stored in a `BTreeMap` so every listing of them comes
/// out in ascending id order.
#[derive(Debug, Default)]
pub struct CreditLedger {
    accounts: BTreeMap<AccountId, Account>,
}

impl CreditLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: BTreeMap::new(),
        }
    }

    /// Rebuild a ledger from stored accounts.
    ///
    /// # Errors
    /// Returns `DuplicateAccount` if two accounts share an id, or
    /// `CreditOverflow` if a stored balance total overflows.
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self> {
        let mut ledger = Self::new();
        for account in accounts {
            account
                .balance
                .available
                .checked_add(account.balance.locked)
                .ok_or(CarbonError::CreditOverflow)?;
            ledger.insert(account)?;
        }
        Ok(ledger)
    }

    // =================================================================
    // Accounts
    // =================================================================

    /// Insert a new account. Credit-holding roles only.
    ///
    /// # Errors
    /// Returns `DuplicateAccount` if the id is taken, `InvalidArgument`
    /// if the role does not hold credits.
    pub fn insert(&mut self, account: Account) -> Result<()> {
        if !account.role.holds_credits() {
            return Err(CarbonError::invalid(format!(
                "role {} cannot hold an account",
                account.role
            )));
        }
        if self.accounts.contains_key(&account.id) {
            return Err(CarbonError::DuplicateAccount(account.id));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// Look up an account.
    pub fn account(&self, id: AccountId) -> Result<&Account> {
        self.accounts
            .get(&id)
            .ok_or(CarbonError::AccountNotFound(id))
    }

    /// Look up an account that must have the given role.
    ///
    /// # Errors
    /// `AccountNotFound` if missing or of a different role.
    pub fn account_with_role(&self, id: AccountId, role: Role) -> Result<&Account> {
        match self.accounts.get(&id) {
            Some(account) if account.role == role => Ok(account),
            _ => Err(CarbonError::AccountNotFound(id)),
        }
    }

    fn entry_mut(&mut self, id: AccountId) -> Result<&mut CreditBalance> {
        self.accounts
            .get_mut(&id)
            .map(|a| &mut a.balance)
            .ok_or(CarbonError::AccountNotFound(id))
    }

    /// Reported balance (available + locked).
    pub fn credits(&self, id: AccountId) -> Result<u64> {
        Ok(self.account(id)?.credits())
    }

    /// Full balance entry.
    pub fn balance(&self, id: AccountId) -> Result<CreditBalance> {
        Ok(self.account(id)?.balance)
    }

    /// Ids of all accounts with `role`, ascending.
    #[must_use]
    pub fn ids_with_role(&self, role: Role) -> Vec<AccountId> {
        self.accounts
            .values()
            .filter(|a| a.role == role)
            .map(|a| a.id)
            .collect()
    }

    /// All accounts, ascending by id.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    // =================================================================
    // Balance mutations
    // =================================================================

    /// Credit available balance. Used for issuance and for the receiving
    /// side of transfers and fills.
    ///
    /// # Errors
    /// `AccountNotFound`, or `CreditOverflow` if the total would overflow.
    pub fn credit(&mut self, id: AccountId, amount: u64) -> Result<()> {
        let entry = self.entry_mut(id)?;
        let total = entry.total();
        total
            .checked_add(amount)
            .ok_or(CarbonError::CreditOverflow)?;
        entry.available += amount;
        Ok(())
    }

    /// Debit available balance. Locked credits are never touched.
    ///
    /// # Errors
    /// `InsufficientCredits` if available < amount.
    pub fn debit(&mut self, id: AccountId, amount: u64) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.available < amount {
            return Err(CarbonError::InsufficientCredits {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        Ok(())
    }

    /// Move credits between two accounts' available balances.
    ///
    /// # Errors
    /// `AccountNotFound` for either id, `InsufficientCredits` if the
    /// source cannot cover `amount`, `CreditOverflow` on the receiving side.
    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: u64) -> Result<()> {
        let source = self.balance(from)?;
        let target = self.balance(to)?;
        if source.available < amount {
            return Err(CarbonError::InsufficientCredits {
                needed: amount,
                available: source.available,
            });
        }
        if from == to {
            return Ok(());
        }
        target
            .total()
            .checked_add(amount)
            .ok_or(CarbonError::CreditOverflow)?;

        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Lock credits (available → locked). Used when listing.
    ///
    /// # Errors
    /// `InsufficientCredits` if available < amount.
    pub fn lock(&mut self, id: AccountId, amount: u64) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.available < amount {
            return Err(CarbonError::InsufficientCredits {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        entry.locked += amount;
        Ok(())
    }

    /// Unlock credits (locked → available). Used when a listing is withdrawn.
    ///
    /// # Errors
    /// `Internal` if locked < amount; the book and ledger disagree.
    pub fn unlock(&mut self, id: AccountId, amount: u64) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.locked < amount {
            return Err(CarbonError::Internal(format!(
                "unlock {amount} exceeds locked {} for account {id}",
                entry.locked
            )));
        }
        entry.locked -= amount;
        entry.available += amount;
        Ok(())
    }

    /// Consume locked credits (for a fill). Locked balance decreases,
    /// nothing is added back to available.
    ///
    /// # Errors
    /// `Internal` if locked < amount.
    pub fn consume_locked(&mut self, id: AccountId, amount: u64) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.locked < amount {
            return Err(CarbonError::Internal(format!(
                "consume {amount} exceeds locked {} for account {id}",
                entry.locked
            )));
        }
        entry.locked -= amount;
        Ok(())
    }

    // =================================================================
    // Aggregates
    // =================================================================

    /// Σ (available + locked) over all accounts.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        self.accounts
            .values()
            .map(|a| u128::from(a.balance.available) + u128::from(a.balance.locked))
            .sum()
    }

    /// Σ available over all accounts.
    #[must_use]
    pub fn total_available(&self) -> u128 {
        self.accounts
            .values()
            .map(|a| u128::from(a.balance.available))
            .sum()
    }

    /// Σ locked over all accounts.
    #[must_use]
    pub fn total_locked(&self) -> u128 {
        self.accounts
            .values()
            .map(|a| u128::from(a.balance.locked))
            .sum()
    }
}
