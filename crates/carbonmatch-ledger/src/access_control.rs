//! Access control: the hard gate for every mutating call.
//!
//! Tracks the Regulator (fixed at construction), the Validator set, and
//! the address ↔ account bindings. Callers are identified by an
//! authenticated [`Address`] supplied with each call; nothing is read
//! from ambient context.
//!
//! ## Rules
//!
//! - **Regulator only**: create validators
//! - **Regulator or Validator**: register accounts, allocate credits
//! - **Account owner**: list, buy, approve, transfer from own account
//! - **Authority or the consumer itself**: report emissions

use std::collections::{BTreeSet, HashMap};

use carbonmatch_types::{
    Account, AccountId, Address, CarbonError, Result, Role, constants,
};

use crate::CreditLedger;

/// Registry of identities and their authority.
#[derive(Debug)]
pub struct AccessControl {
    /// The sole root authority.
    regulator: Address,
    /// Delegated authorities.
    validators: BTreeSet<Address>,
    /// Address → the account it controls.
    bindings: HashMap<Address, AccountId>,
}

impl AccessControl {
    /// Create a registry rooted at `regulator`.
    ///
    /// # Errors
    /// `InvalidArgument` if `regulator` is the zero address.
    pub fn new(regulator: Address) -> Result<Self> {
        if regulator.is_zero() {
            return Err(CarbonError::invalid("regulator must not be the zero address"));
        }
        Ok(Self {
            regulator,
            validators: BTreeSet::new(),
            bindings: HashMap::new(),
        })
    }

    /// Rebuild a registry from stored validators and accounts.
    pub fn restore<'a>(
        regulator: Address,
        validators: impl IntoIterator<Item = Address>,
        accounts: impl IntoIterator<Item = &'a Account>,
    ) -> Result<Self> {
        let mut registry = Self::new(regulator)?;
        for validator in validators {
            registry.check_address_free(validator)?;
            registry.validators.insert(validator);
        }
        for account in accounts {
            registry.check_address_free(account.address)?;
            registry.bindings.insert(account.address, account.id);
        }
        Ok(registry)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn regulator(&self) -> Address {
        self.regulator
    }

    #[must_use]
    pub fn is_regulator(&self, addr: &Address) -> bool {
        *addr == self.regulator
    }

    #[must_use]
    pub fn is_validator(&self, addr: &Address) -> bool {
        self.validators.contains(addr)
    }

    /// Validators in ascending address order.
    #[must_use]
    pub fn validators(&self) -> Vec<Address> {
        self.validators.iter().copied().collect()
    }

    /// The account bound to `addr`, if any.
    #[must_use]
    pub fn account_of(&self, addr: &Address) -> Option<AccountId> {
        self.bindings.get(addr).copied()
    }

    /// The authority role of `addr` (Regulator / Validator), if any.
    #[must_use]
    pub fn authority_role(&self, addr: &Address) -> Option<Role> {
        if self.is_regulator(addr) {
            Some(Role::Regulator)
        } else if self.is_validator(addr) {
            Some(Role::Validator)
        } else {
            None
        }
    }

    // =================================================================
    // Gates
    // =================================================================

    /// Caller must be the Regulator.
    pub fn require_regulator(&self, caller: &Address, action: &str) -> Result<()> {
        if self.is_regulator(caller) {
            Ok(())
        } else {
            Err(self.deny(caller, action))
        }
    }

    /// Caller must be the Regulator or a Validator.
    pub fn require_authority(&self, caller: &Address, action: &str) -> Result<()> {
        if self.authority_role(caller).is_some() {
            Ok(())
        } else {
            Err(self.deny(caller, action))
        }
    }

    /// Caller must control `account`.
    pub fn require_owner(&self, caller: &Address, account: &Account, action: &str) -> Result<()> {
        if account.is_controlled_by(caller) {
            Ok(())
        } else {
            Err(self.deny(caller, action))
        }
    }

    /// Caller must be an authority or control `account`.
    pub fn require_authority_or_owner(
        &self,
        caller: &Address,
        account: &Account,
        action: &str,
    ) -> Result<()> {
        if self.authority_role(caller).is_some() || account.is_controlled_by(caller) {
            Ok(())
        } else {
            Err(self.deny(caller, action))
        }
    }

    fn deny(&self, caller: &Address, action: &str) -> CarbonError {
        tracing::warn!(caller = %caller, action, "Permission denied");
        CarbonError::denied(*caller, action)
    }

    // =================================================================
    // Registration
    // =================================================================

    /// Register a validator. Regulator only.
    ///
    /// # Errors
    /// - `PermissionDenied` if the caller is not the Regulator
    /// - `InvalidArgument` for the zero address or the Regulator itself
    /// - `DuplicateAddress` if already a validator or bound to an account
    pub fn create_validator(&mut self, caller: &Address, validator: Address) -> Result<()> {
        self.require_regulator(caller, "create_validator")?;
        if validator.is_zero() {
            return Err(CarbonError::invalid("validator address must not be zero"));
        }
        if self.is_regulator(&validator) {
            return Err(CarbonError::invalid("the regulator cannot also be a validator"));
        }
        self.check_address_free(validator)?;
        self.validators.insert(validator);
        tracing::info!(validator = %validator, "Validator created");
        Ok(())
    }

    /// Register a Generator or Consumer account and seed its balance.
    /// Regulator or Validator only.
    ///
    /// # Errors
    /// - `PermissionDenied` if the caller is not an authority
    /// - `InvalidArgument` for an empty/oversized name, the zero address,
    ///   or a non-account role
    /// - `DuplicateAccount` / `DuplicateAddress` if already bound
    #[allow(clippy::too_many_arguments)]
    pub fn create_account(
        &mut self,
        ledger: &mut CreditLedger,
        caller: &Address,
        id: AccountId,
        name: &str,
        role: Role,
        address: Address,
        opening_credits: u64,
    ) -> Result<()> {
        let action = match role {
            Role::Generator => "create_generator",
            Role::Consumer => "create_consumer",
            Role::Regulator | Role::Validator => {
                return Err(CarbonError::invalid(format!(
                    "role {role} cannot hold an account"
                )));
            }
        };
        self.require_authority(caller, action)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(CarbonError::invalid("account name must not be empty"));
        }
        if name.chars().count() > constants::MAX_NAME_LEN {
            return Err(CarbonError::invalid(format!(
                "account name longer than {} characters",
                constants::MAX_NAME_LEN
            )));
        }
        if address.is_zero() {
            return Err(CarbonError::invalid("account address must not be zero"));
        }
        if ledger.contains(id) {
            return Err(CarbonError::DuplicateAccount(id));
        }
        if self.is_regulator(&address) {
            return Err(CarbonError::DuplicateAddress(address));
        }
        self.check_address_free(address)?;

        let mut account = Account::new(id, name, role, address);
        account.balance.available = opening_credits;
        ledger.insert(account)?;
        self.bindings.insert(address, id);

        tracing::info!(
            account = %id,
            role = %role,
            address = %address.short(),
            opening_credits,
            "Account created"
        );
        Ok(())
    }

    fn check_address_free(&self, addr: Address) -> Result<()> {
        if self.validators.contains(&addr) || self.bindings.contains_key(&addr) {
            return Err(CarbonError::DuplicateAddress(addr));
        }
        Ok(())
    }
}
