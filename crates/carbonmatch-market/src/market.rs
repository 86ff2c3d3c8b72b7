//! The CarbonMatch state machine.
//!
//! [`CarbonMarket`] composes the registry, the credit ledger, allowances,
//! the emissions monitor and the sell book behind one `&mut self`
//! boundary. Every mutating operation takes the authenticated caller
//! explicitly, validates everything first, and only then applies, so a
//! rejected call leaves the state exactly as it was.
//!
//! ## Buy settlement
//!
//! ```text
//! plan_buy(book)                 → fills (pure)
//! check buyer can pay Σ cost     → else InsufficientCredits, nothing applied
//! per fill: seller.locked  -= take,  seller.available += take × price
//!           buyer.available += take, buyer.available  -= take × price
//! apply_plan(book)               → listings shrink / disappear
//! ```

use std::collections::{BTreeMap, HashMap};

use carbonmatch_ledger::{AccessControl, AllowanceBook, CreditLedger, EmissionsMonitor};
use carbonmatch_matchcore::{FillPlan, OrderBook, apply_plan, compute_book_digest, plan_buy};
use carbonmatch_types::{
    Account, AccountId, Address, CarbonError, ComplianceViolation, EmissionsPolicy, EventRecord,
    LedgerEvent, Listing, ListingId, MarketConfig, MatchResult, Request, Response, Result, Role,
    constants,
};
use rust_decimal::Decimal;

use crate::{EventJournal, SupplyConservation};

/// Serial ledger + marketplace state.
#[derive(Debug)]
pub struct CarbonMarket {
    pub(crate) config: MarketConfig,
    pub(crate) access: AccessControl,
    pub(crate) ledger: CreditLedger,
    pub(crate) allowances: AllowanceBook,
    pub(crate) emissions: EmissionsMonitor,
    pub(crate) book: OrderBook,
    pub(crate) supply: SupplyConservation,
    pub(crate) journal: EventJournal,
    /// Id (and sequence) the next listing receives.
    pub(crate) next_listing: ListingId,
    /// Number of buy requests accepted so far.
    pub(crate) buy_sequence: u64,
    pub(crate) last_match: MatchResult,
}

impl CarbonMarket {
    /// Create an empty market.
    ///
    /// # Errors
    /// `Configuration` if the config is invalid.
    pub fn new(config: MarketConfig) -> Result<Self> {
        config.validate()?;
        let access = AccessControl::new(config.regulator)?;
        let journal = EventJournal::new(config.journal_capacity)?;
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            regulator = %config.regulator,
            policy = ?config.emissions_policy,
            "Market initialized"
        );
        Ok(Self {
            config,
            access,
            ledger: CreditLedger::new(),
            allowances: AllowanceBook::new(),
            emissions: EmissionsMonitor::new(),
            book: OrderBook::new(),
            supply: SupplyConservation::new(),
            journal,
            next_listing: ListingId(1),
            buy_sequence: 0,
            last_match: MatchResult::empty(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    // =================================================================
    // Registry
    // =================================================================

    /// Register a validator. Regulator only.
    pub fn create_validator(&mut self, caller: &Address, validator: Address) -> Result<()> {
        self.access.create_validator(caller, validator)?;
        self.commit(LedgerEvent::ValidatorCreated { validator });
        Ok(())
    }

    /// Register a Generator account. Regulator or Validator only.
    pub fn create_generator(
        &mut self,
        caller: &Address,
        id: AccountId,
        name: &str,
        address: Address,
    ) -> Result<()> {
        self.create_account(caller, id, name, Role::Generator, address, 0)
    }

    /// Register a Consumer account, seeded with the configured opening
    /// credits. Regulator or Validator only.
    pub fn create_consumer(
        &mut self,
        caller: &Address,
        id: AccountId,
        name: &str,
        address: Address,
    ) -> Result<()> {
        let opening = self.config.consumer_opening_credits;
        self.create_account(caller, id, name, Role::Consumer, address, opening)
    }

    fn create_account(
        &mut self,
        caller: &Address,
        id: AccountId,
        name: &str,
        role: Role,
        address: Address,
        opening_credits: u64,
    ) -> Result<()> {
        self.access.create_account(
            &mut self.ledger,
            caller,
            id,
            name,
            role,
            address,
            opening_credits,
        )?;
        self.supply.record_issuance(opening_credits);
        self.commit(LedgerEvent::AccountCreated {
            account: id,
            role,
            address,
            opening_credits,
        });
        Ok(())
    }

    #[must_use]
    pub fn regulator(&self) -> Address {
        self.access.regulator()
    }

    #[must_use]
    pub fn validators(&self) -> Vec<Address> {
        self.access.validators()
    }

    #[must_use]
    pub fn is_validator(&self, addr: &Address) -> bool {
        self.access.is_validator(addr)
    }

    #[must_use]
    pub fn is_generator(&self, id: AccountId) -> bool {
        self.ledger.account(id).is_ok_and(Account::is_generator)
    }

    #[must_use]
    pub fn is_consumer(&self, id: AccountId) -> bool {
        self.ledger.account(id).is_ok_and(Account::is_consumer)
    }

    pub fn account(&self, id: AccountId) -> Result<&Account> {
        self.ledger.account(id)
    }

    pub fn account_name(&self, id: AccountId) -> Result<&str> {
        Ok(self.ledger.account(id)?.name.as_str())
    }

    /// Account bound to `addr`, if any.
    #[must_use]
    pub fn account_of(&self, addr: &Address) -> Option<AccountId> {
        self.access.account_of(addr)
    }

    /// Generator ids, ascending.
    #[must_use]
    pub fn generator_list(&self) -> Vec<AccountId> {
        self.ledger.ids_with_role(Role::Generator)
    }

    /// Consumer ids, ascending.
    #[must_use]
    pub fn consumer_list(&self) -> Vec<AccountId> {
        self.ledger.ids_with_role(Role::Consumer)
    }

    // =================================================================
    // Credit ledger
    // =================================================================

    /// Issue `amount` new credits to a Generator. Regulator or Validator
    /// only. The sole issuance path besides consumer opening credits.
    ///
    /// # Errors
    /// - `PermissionDenied` for a non-authority caller
    /// - `InvalidArgument` if `amount` is zero
    /// - `AccountNotFound` if `generator` is not a registered Generator
    pub fn allocate_credit(
        &mut self,
        caller: &Address,
        generator: AccountId,
        amount: u64,
    ) -> Result<()> {
        self.access.require_authority(caller, "allocate_credit")?;
        if amount == 0 {
            return Err(CarbonError::invalid("allocation amount must be positive"));
        }
        self.ledger.account_with_role(generator, Role::Generator)?;
        self.ledger.credit(generator, amount)?;
        self.supply.record_issuance(amount);

        tracing::info!(generator = %generator, amount, by = %caller.short(), "Credits allocated");
        self.commit(LedgerEvent::CreditsAllocated {
            generator,
            amount,
            by: *caller,
        });
        Ok(())
    }

    /// Set how many of `owner`'s credits `spender` may transfer.
    /// Caller must control `owner`. A zero amount revokes.
    pub fn approve(
        &mut self,
        caller: &Address,
        owner: AccountId,
        spender: Address,
        amount: u64,
    ) -> Result<()> {
        let account = self.ledger.account(owner)?;
        self.access.require_owner(caller, account, "approve")?;
        if spender.is_zero() {
            return Err(CarbonError::invalid("spender must not be the zero address"));
        }
        if spender == *caller {
            return Err(CarbonError::invalid("an owner cannot approve itself"));
        }
        self.allowances.approve(owner, spender, amount);
        self.commit(LedgerEvent::AllowanceApproved {
            owner,
            spender,
            amount,
        });
        Ok(())
    }

    #[must_use]
    pub fn allowance(&self, owner: AccountId, spender: &Address) -> u64 {
        self.allowances.allowance(owner, spender)
    }

    /// Move spendable credits from `from` to `to`.
    ///
    /// The caller must control `from`, or hold an allowance over it that
    /// covers `amount` (consumed on success).
    ///
    /// # Errors
    /// - `AccountNotFound` for either id
    /// - `InvalidArgument` for a zero amount or `from == to`
    /// - `AllowanceExceeded` for a non-owner without enough allowance
    /// - `InsufficientCredits` if `from`'s unlocked balance is short
    pub fn transfer_credit(
        &mut self,
        caller: &Address,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<()> {
        let source = self.ledger.account(from)?;
        self.ledger.account(to)?;
        let via_allowance = !source.is_controlled_by(caller);
        if via_allowance {
            self.allowances.check(from, caller, amount).inspect_err(|_| {
                tracing::warn!(
                    caller = %caller,
                    owner = %from,
                    amount,
                    "Transfer denied: allowance too small"
                );
            })?;
        }
        if amount == 0 {
            return Err(CarbonError::invalid("transfer amount must be positive"));
        }
        if from == to {
            return Err(CarbonError::invalid("cannot transfer to the same account"));
        }

        self.ledger.transfer(from, to, amount)?;
        if via_allowance {
            self.allowances.consume(from, caller, amount)?;
        }

        tracing::info!(from = %from, to = %to, amount, delegated = via_allowance, "Credits transferred");
        self.commit(LedgerEvent::CreditsTransferred {
            from,
            to,
            amount,
            by: *caller,
        });
        Ok(())
    }

    /// Reported balance: available plus credits locked in own listings.
    pub fn get_credits(&self, id: AccountId) -> Result<u64> {
        self.ledger.credits(id)
    }

    // =================================================================
    // Emissions
    // =================================================================

    /// Append an emissions report for a Consumer. Caller must be an
    /// authority or the consumer itself.
    ///
    /// Under [`EmissionsPolicy::Retire`] the report also retires
    /// `min(emissions, available)` credits. Returns the cumulative total.
    pub fn report_emissions(
        &mut self,
        caller: &Address,
        consumer: AccountId,
        emissions: u64,
    ) -> Result<u64> {
        let account = self.ledger.account_with_role(consumer, Role::Consumer)?;
        self.access
            .require_authority_or_owner(caller, account, "report_emissions")?;
        self.emissions.projected(consumer, emissions)?;

        let retired = match self.config.emissions_policy {
            EmissionsPolicy::Advisory => 0,
            EmissionsPolicy::Retire => emissions.min(account.balance.available),
        };
        if retired > 0 {
            self.ledger.debit(consumer, retired)?;
            self.supply.record_retirement(retired);
        }
        let cumulative = self.emissions.record(consumer, emissions)?;

        tracing::info!(consumer = %consumer, emissions, cumulative, retired, "Emissions reported");
        self.commit(LedgerEvent::EmissionsReported {
            consumer,
            emissions,
            cumulative,
            retired,
        });
        Ok(cumulative)
    }

    /// Cumulative emissions of a Consumer.
    pub fn consumer_emissions(&self, consumer: AccountId) -> Result<u64> {
        self.ledger.account_with_role(consumer, Role::Consumer)?;
        Ok(self.emissions.emissions(consumer))
    }

    /// Non-compliant consumer ids, ascending.
    #[must_use]
    pub fn check_emissions(&self) -> Vec<AccountId> {
        self.emissions.non_compliant(&self.ledger)
    }

    #[must_use]
    pub fn compliance_report(&self) -> Vec<ComplianceViolation> {
        self.emissions.compliance_report(&self.ledger)
    }

    // =================================================================
    // Marketplace
    // =================================================================

    /// Offer `quantity` credits at `price` each. Locks the quantity in the
    /// seller's account. Caller must control `seller`.
    ///
    /// # Errors
    /// - `AccountNotFound`, `PermissionDenied`
    /// - `InvalidArgument` for a zero price or quantity, or when the
    ///   seller is at the open-listing cap
    /// - `InsufficientCredits` if the unlocked balance is short
    pub fn list_credit(
        &mut self,
        caller: &Address,
        seller: AccountId,
        price: u64,
        quantity: u64,
    ) -> Result<ListingId> {
        let account = self.ledger.account(seller)?;
        self.access.require_owner(caller, account, "list_credit")?;
        if price == 0 || quantity == 0 {
            return Err(CarbonError::invalid(
                "listing price and quantity must be positive",
            ));
        }
        let open = self.book.open_listings(seller);
        if open >= self.config.max_open_listings_per_account {
            return Err(CarbonError::invalid(format!(
                "account {seller} already has {open} open listings"
            )));
        }
        if account.balance.available < quantity {
            return Err(CarbonError::InsufficientCredits {
                needed: quantity,
                available: account.balance.available,
            });
        }

        let id = self.next_listing;
        self.book.insert(Listing::new(id, seller, price, quantity))?;
        self.ledger.lock(seller, quantity)?;
        self.next_listing = id.next();

        tracing::info!(listing = %id, seller = %seller, price, quantity, "Listing created");
        self.commit(LedgerEvent::ListingCreated {
            listing: id,
            seller,
            price,
            quantity,
        });
        Ok(id)
    }

    /// Remove a listing and unlock what remains of it. Caller must control
    /// the seller. Returns the released quantity.
    pub fn withdraw_listing(&mut self, caller: &Address, listing: ListingId) -> Result<u64> {
        let seller = self
            .book
            .get(&listing)
            .ok_or(CarbonError::ListingNotFound(listing))?
            .seller;
        let account = self.ledger.account(seller)?;
        self.access
            .require_owner(caller, account, "withdraw_listing")?;

        let removed = self.book.remove(&listing)?;
        self.ledger.unlock(seller, removed.remaining)?;

        tracing::info!(listing = %listing, seller = %seller, released = removed.remaining, "Listing withdrawn");
        self.commit(LedgerEvent::ListingWithdrawn {
            listing,
            seller,
            released: removed.remaining,
        });
        Ok(removed.remaining)
    }

    /// Buy up to `quantity` credits for `buyer`, cheapest listings first.
    ///
    /// Filling less than requested is a success. The buyer's unlocked
    /// balance must cover the full cost of the planned fills, otherwise
    /// nothing is applied.
    ///
    /// # Errors
    /// - `AccountNotFound`, `PermissionDenied`
    /// - `InvalidArgument` for a zero quantity
    /// - `InsufficientCredits` if the buyer cannot pay
    /// - `CreditOverflow` if a balance would leave the `u64` range
    pub fn buy_credit(
        &mut self,
        caller: &Address,
        buyer: AccountId,
        quantity: u64,
    ) -> Result<MatchResult> {
        let account = self.ledger.account(buyer)?;
        self.access.require_owner(caller, account, "buy_credit")?;

        let buy_sequence = self.buy_sequence + 1;
        let plan = plan_buy(&self.book, buyer, quantity, buy_sequence)?;
        self.check_settlement(&plan)?;

        self.settle(&plan)?;
        apply_plan(&mut self.book, &plan)?;
        self.buy_sequence = buy_sequence;

        let result = plan.into_match_result();
        tracing::info!(
            buyer = %buyer,
            requested = quantity,
            filled = result.units_filled,
            avg_price = %result.weighted_average_price,
            fills = result.fills.len(),
            "Buy executed"
        );
        self.commit(LedgerEvent::BuyExecuted {
            buyer,
            requested: quantity,
            units_filled: result.units_filled,
            average_price: result.weighted_average_price,
            fills: result.fills.len(),
        });
        self.last_match = result.clone();
        Ok(result)
    }

    /// Validate every balance effect of `plan` without applying any.
    fn check_settlement(&self, plan: &FillPlan) -> Result<()> {
        let buyer = self.ledger.balance(plan.buyer)?;
        if buyer.available < plan.total_cost {
            return Err(CarbonError::InsufficientCredits {
                needed: plan.total_cost,
                available: buyer.available,
            });
        }
        (buyer.total() - plan.total_cost)
            .checked_add(plan.units_filled)
            .ok_or(CarbonError::CreditOverflow)?;

        // Per seller: Σ take leaves locked, Σ cost arrives in available.
        let mut per_seller: BTreeMap<AccountId, (u64, u64)> = BTreeMap::new();
        for fill in &plan.fills {
            let entry = per_seller.entry(fill.seller).or_default();
            entry.0 += fill.quantity;
            entry.1 = entry
                .1
                .checked_add(fill.cost)
                .ok_or(CarbonError::CreditOverflow)?;
        }
        for (seller, (taken, paid)) in per_seller {
            let balance = self.ledger.balance(seller)?;
            if balance.locked < taken {
                return Err(CarbonError::Internal(format!(
                    "account {seller} has {} locked but {taken} planned to fill",
                    balance.locked
                )));
            }
            (balance.total() - taken)
                .checked_add(paid)
                .ok_or(CarbonError::CreditOverflow)?;
        }
        Ok(())
    }

    fn settle(&mut self, plan: &FillPlan) -> Result<()> {
        self.ledger.debit(plan.buyer, plan.total_cost)?;
        for fill in &plan.fills {
            self.ledger.consume_locked(fill.seller, fill.quantity)?;
            self.ledger.credit(fill.seller, fill.cost)?;
            self.ledger.credit(fill.buyer, fill.quantity)?;
        }
        Ok(())
    }

    /// Listing prices in matching order.
    #[must_use]
    pub fn prices(&self) -> Vec<u64> {
        self.book.prices()
    }

    /// Listing remaining quantities, index-aligned with [`prices`](Self::prices).
    #[must_use]
    pub fn quantities(&self) -> Vec<u64> {
        self.book.quantities()
    }

    #[must_use]
    pub fn listings(&self) -> Vec<Listing> {
        self.book.listings().cloned().collect()
    }

    #[must_use]
    pub fn listing(&self, id: ListingId) -> Option<&Listing> {
        self.book.get(&id)
    }

    #[must_use]
    pub fn num_listings(&self) -> usize {
        self.book.len()
    }

    /// Units filled by the most recent buy, zero before any.
    #[must_use]
    pub fn last_num_filled(&self) -> u64 {
        self.last_match.units_filled
    }

    /// Weighted average price of the most recent buy, zero before any.
    #[must_use]
    pub fn last_avg_price_filled(&self) -> Decimal {
        self.last_match.weighted_average_price
    }

    #[must_use]
    pub fn last_match(&self) -> &MatchResult {
        &self.last_match
    }

    /// SHA-256 over the open book, for comparing replicas.
    #[must_use]
    pub fn book_digest(&self) -> [u8; 32] {
        compute_book_digest(&self.book)
    }

    // =================================================================
    // Journal
    // =================================================================

    /// Retained journal records, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.journal.records().cloned().collect()
    }

    #[must_use]
    pub fn events_since(&self, after: u64) -> Vec<EventRecord> {
        self.journal.since(after)
    }

    fn commit(&mut self, event: LedgerEvent) {
        let sequence = self.journal.append(event);
        tracing::debug!(sequence, "Journal event appended");
        debug_assert!(
            self.verify_supply().is_ok(),
            "supply conservation violated after event {sequence}"
        );
    }

    // =================================================================
    // Invariants
    // =================================================================

    /// Check supply conservation and that every account's locked balance
    /// is exactly what its listings hold.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` describing the first mismatch found.
    pub fn verify_supply(&self) -> Result<()> {
        self.supply.verify(self.ledger.total_supply())?;

        let mut listed: HashMap<AccountId, u64> = HashMap::new();
        for listing in self.book.listings() {
            if !self.ledger.contains(listing.seller) {
                return Err(CarbonError::SupplyInvariantViolation {
                    reason: format!("{} belongs to unknown account {}", listing.id, listing.seller),
                });
            }
            let sum = listed.entry(listing.seller).or_insert(0);
            *sum = sum.checked_add(listing.remaining).ok_or_else(|| {
                CarbonError::SupplyInvariantViolation {
                    reason: format!("listings of account {} overflow", listing.seller),
                }
            })?;
        }
        for account in self.ledger.accounts() {
            let on_book = listed.get(&account.id).copied().unwrap_or(0);
            if account.balance.locked != on_book {
                return Err(CarbonError::SupplyInvariantViolation {
                    reason: format!(
                        "account {} locks {} but lists {on_book}",
                        account.id, account.balance.locked
                    ),
                });
            }
        }
        Ok(())
    }

    // =================================================================
    // Request dispatch
    // =================================================================

    /// Run one [`Request`] on behalf of `caller`.
    pub fn execute(&mut self, caller: &Address, request: Request) -> Result<Response> {
        let response = match request {
            Request::CreateValidator { address } => {
                self.create_validator(caller, address)?;
                Response::Ok
            }
            Request::CreateGenerator { id, name, address } => {
                self.create_generator(caller, id, &name, address)?;
                Response::Ok
            }
            Request::CreateConsumer { id, name, address } => {
                self.create_consumer(caller, id, &name, address)?;
                Response::Ok
            }
            Request::AllocateCredit { generator, amount } => {
                self.allocate_credit(caller, generator, amount)?;
                Response::Ok
            }
            Request::Approve {
                owner,
                spender,
                amount,
            } => {
                self.approve(caller, owner, spender, amount)?;
                Response::Ok
            }
            Request::TransferCredit { from, to, amount } => {
                self.transfer_credit(caller, from, to, amount)?;
                Response::Ok
            }
            Request::ReportEmissions {
                consumer,
                emissions,
            } => Response::Amount(self.report_emissions(caller, consumer, emissions)?),
            Request::ListCredit {
                seller,
                price,
                quantity,
            } => Response::Listed(self.list_credit(caller, seller, price, quantity)?),
            Request::WithdrawListing { listing } => {
                Response::Amount(self.withdraw_listing(caller, listing)?)
            }
            Request::BuyCredit { buyer, quantity } => {
                Response::Matched(self.buy_credit(caller, buyer, quantity)?)
            }
            Request::GetCredits { account } => Response::Amount(self.get_credits(account)?),
            Request::GetAccount { account } => Response::Account(self.account(account)?.clone()),
            Request::GetAllowance { owner, spender } => {
                self.ledger.account(owner)?;
                Response::Amount(self.allowance(owner, &spender))
            }
            Request::GetEmissions { consumer } => {
                Response::Amount(self.consumer_emissions(consumer)?)
            }
            Request::CheckEmissions => Response::Accounts(self.check_emissions()),
            Request::ComplianceReport => Response::Violations(self.compliance_report()),
            Request::GeneratorList => Response::Accounts(self.generator_list()),
            Request::ConsumerList => Response::Accounts(self.consumer_list()),
            Request::GetPrices => Response::Values(self.prices()),
            Request::GetQuantities => Response::Values(self.quantities()),
            Request::GetListings => Response::Listings(self.listings()),
            Request::GetNumListings => Response::Count(self.num_listings()),
            Request::GetLastNumFilled => Response::Amount(self.last_num_filled()),
            Request::GetLastAvgPriceFilled => Response::Price(self.last_avg_price_filled()),
            Request::GetLastMatch => Response::Matched(self.last_match.clone()),
            Request::EventsSince { after } => Response::Events(self.events_since(after)),
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEN: AccountId = AccountId(1001);
    const GEN2: AccountId = AccountId(1002);
    const CON: AccountId = AccountId(2001);

    fn regulator() -> Address {
        Address::from_index(1)
    }

    fn validator() -> Address {
        Address::from_index(2)
    }

    fn gen_addr() -> Address {
        Address::from_index(10)
    }

    fn gen2_addr() -> Address {
        Address::from_index(11)
    }

    fn con_addr() -> Address {
        Address::from_index(20)
    }

    fn market_with(config: MarketConfig) -> CarbonMarket {
        let mut m = CarbonMarket::new(config).unwrap();
        m.create_validator(&regulator(), validator()).unwrap();
        m.create_generator(&validator(), GEN, "Solar Farm", gen_addr())
            .unwrap();
        m.create_generator(&validator(), GEN2, "Wind Park", gen2_addr())
            .unwrap();
        m.create_consumer(&validator(), CON, "Steel Mill", con_addr())
            .unwrap();
        m
    }

    fn market() -> CarbonMarket {
        market_with(MarketConfig::new(regulator()))
    }

    #[test]
    fn allocation_increases_balance_and_supply() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        assert_eq!(m.get_credits(GEN).unwrap(), 100);
        assert_eq!(m.supply.total_issued(), 100);
        m.verify_supply().unwrap();
    }

    #[test]
    fn allocation_requires_authority() {
        let mut m = market();
        let err = m.allocate_credit(&gen_addr(), GEN, 100).unwrap_err();
        assert!(matches!(err, CarbonError::PermissionDenied { .. }));
        assert_eq!(m.get_credits(GEN).unwrap(), 0);
    }

    #[test]
    fn allocation_to_consumer_is_not_found() {
        let mut m = market();
        assert!(matches!(
            m.allocate_credit(&regulator(), CON, 10),
            Err(CarbonError::AccountNotFound(CON))
        ));
        assert!(m.allocate_credit(&regulator(), GEN, 0).is_err());
    }

    #[test]
    fn listing_locks_but_keeps_reported_balance() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        let id = m.list_credit(&gen_addr(), GEN, 10, 40).unwrap();
        assert_eq!(id, ListingId(1));
        assert_eq!(m.get_credits(GEN).unwrap(), 100);
        assert_eq!(m.account(GEN).unwrap().balance.locked, 40);
        assert_eq!(m.prices(), vec![10]);
        assert_eq!(m.quantities(), vec![40]);
    }

    #[test]
    fn locked_credits_cannot_be_relisted_or_transferred() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        m.list_credit(&gen_addr(), GEN, 10, 80).unwrap();
        assert!(matches!(
            m.list_credit(&gen_addr(), GEN, 10, 30),
            Err(CarbonError::InsufficientCredits {
                needed: 30,
                available: 20
            })
        ));
        assert!(matches!(
            m.transfer_credit(&gen_addr(), GEN, GEN2, 30),
            Err(CarbonError::InsufficientCredits { .. })
        ));
    }

    #[test]
    fn buy_settles_in_credits() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        m.allocate_credit(&regulator(), GEN2, 500).unwrap();
        m.list_credit(&gen_addr(), GEN, 3, 50).unwrap();

        let result = m.buy_credit(&gen2_addr(), GEN2, 20).unwrap();
        assert_eq!(result.units_filled, 20);
        assert_eq!(result.total_cost, 60);
        // seller: 100 - 20 sold + 60 received
        assert_eq!(m.get_credits(GEN).unwrap(), 140);
        // buyer: 500 - 60 paid + 20 received
        assert_eq!(m.get_credits(GEN2).unwrap(), 460);
        assert_eq!(m.quantities(), vec![30]);
        m.verify_supply().unwrap();
    }

    #[test]
    fn unaffordable_buy_changes_nothing() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        m.allocate_credit(&regulator(), GEN2, 10).unwrap();
        m.list_credit(&gen_addr(), GEN, 5, 50).unwrap();
        let digest = m.book_digest();

        let err = m.buy_credit(&gen2_addr(), GEN2, 20).unwrap_err();
        assert!(matches!(
            err,
            CarbonError::InsufficientCredits {
                needed: 100,
                available: 10
            }
        ));
        assert_eq!(m.book_digest(), digest);
        assert_eq!(m.get_credits(GEN2).unwrap(), 10);
        assert_eq!(m.get_credits(GEN).unwrap(), 100);
        assert_eq!(m.last_num_filled(), 0);
    }

    #[test]
    fn buy_requires_buyer_ownership() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        m.list_credit(&gen_addr(), GEN, 1, 10).unwrap();
        assert!(matches!(
            m.buy_credit(&regulator(), GEN2, 5),
            Err(CarbonError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn empty_book_buy_reports_zero() {
        let mut m = market();
        let result = m.buy_credit(&con_addr(), CON, 5).unwrap();
        assert_eq!(result.units_filled, 0);
        assert_eq!(m.last_avg_price_filled(), Decimal::ZERO);
        assert_eq!(m.last_match().buy_sequence, 1);
    }

    #[test]
    fn withdraw_releases_remaining() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        m.allocate_credit(&regulator(), GEN2, 100).unwrap();
        let id = m.list_credit(&gen_addr(), GEN, 2, 40).unwrap();
        m.buy_credit(&gen2_addr(), GEN2, 15).unwrap();

        assert!(matches!(
            m.withdraw_listing(&gen2_addr(), id),
            Err(CarbonError::PermissionDenied { .. })
        ));
        assert_eq!(m.withdraw_listing(&gen_addr(), id).unwrap(), 25);
        assert_eq!(m.num_listings(), 0);
        assert_eq!(m.account(GEN).unwrap().balance.locked, 0);
        assert!(matches!(
            m.withdraw_listing(&gen_addr(), id),
            Err(CarbonError::ListingNotFound(_))
        ));
    }

    #[test]
    fn open_listing_cap_enforced() {
        let mut config = MarketConfig::new(regulator());
        config.max_open_listings_per_account = 2;
        let mut m = market_with(config);
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        m.list_credit(&gen_addr(), GEN, 1, 1).unwrap();
        m.list_credit(&gen_addr(), GEN, 1, 1).unwrap();
        assert!(matches!(
            m.list_credit(&gen_addr(), GEN, 1, 1),
            Err(CarbonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn delegated_transfer_consumes_allowance() {
        let mut m = market();
        m.allocate_credit(&regulator(), GEN, 100).unwrap();
        let spender = validator();
        m.approve(&gen_addr(), GEN, spender, 30).unwrap();
        assert_eq!(m.allowance(GEN, &spender), 30);

        m.transfer_credit(&spender, GEN, CON, 20).unwrap();
        assert_eq!(m.allowance(GEN, &spender), 10);
        assert_eq!(m.get_credits(CON).unwrap(), 20);

        let err = m.transfer_credit(&spender, GEN, CON, 20).unwrap_err();
        assert_eq!(err.kind(), carbonmatch_types::ErrorKind::PermissionDenied);
        assert_eq!(m.get_credits(GEN).unwrap(), 80);
    }

    #[test]
    fn approve_requires_owner() {
        let mut m = market();
        assert!(matches!(
            m.approve(&regulator(), GEN, validator(), 10),
            Err(CarbonError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn advisory_emissions_do_not_debit() {
        let mut m = market_with(MarketConfig::new(regulator()).with_consumer_opening_credits(100));
        assert_eq!(m.report_emissions(&con_addr(), CON, 500).unwrap(), 500);
        assert_eq!(m.get_credits(CON).unwrap(), 100);
        assert_eq!(m.check_emissions(), vec![CON]);
        let report = m.compliance_report();
        assert_eq!(report[0].exceeded_by, 400);
        m.verify_supply().unwrap();
    }

    #[test]
    fn retire_policy_burns_available_credits() {
        let config = MarketConfig::new(regulator())
            .with_consumer_opening_credits(100)
            .with_emissions_policy(EmissionsPolicy::Retire);
        let mut m = market_with(config);
        m.report_emissions(&validator(), CON, 30).unwrap();
        assert_eq!(m.get_credits(CON).unwrap(), 70);
        m.report_emissions(&validator(), CON, 200).unwrap();
        assert_eq!(m.get_credits(CON).unwrap(), 0);
        assert_eq!(m.consumer_emissions(CON).unwrap(), 230);
        assert_eq!(m.supply.total_retired(), 100);
        m.verify_supply().unwrap();
    }

    #[test]
    fn emissions_reporting_gates() {
        let mut m = market();
        assert!(matches!(
            m.report_emissions(&gen_addr(), CON, 5),
            Err(CarbonError::PermissionDenied { .. })
        ));
        assert!(matches!(
            m.report_emissions(&regulator(), GEN, 5),
            Err(CarbonError::AccountNotFound(GEN))
        ));
    }

    #[test]
    fn registry_queries() {
        let m = market();
        assert!(m.is_generator(GEN));
        assert!(!m.is_generator(CON));
        assert!(m.is_consumer(CON));
        assert!(m.is_validator(&validator()));
        assert_eq!(m.generator_list(), vec![GEN, GEN2]);
        assert_eq!(m.consumer_list(), vec![CON]);
        assert_eq!(m.account_name(GEN).unwrap(), "Solar Farm");
        assert_eq!(m.account_of(&con_addr()), Some(CON));
        assert_eq!(m.regulator(), regulator());
    }

    #[test]
    fn rejected_calls_leave_no_journal_entry() {
        let mut m = market();
        let before = m.events().len();
        let _ = m.allocate_credit(&gen_addr(), GEN, 100);
        let _ = m.list_credit(&gen_addr(), GEN, 0, 1);
        assert_eq!(m.events().len(), before);
    }

    #[test]
    fn execute_dispatches_queries() {
        let mut m = market();
        m.execute(
            &regulator(),
            Request::AllocateCredit {
                generator: GEN,
                amount: 7,
            },
        )
        .unwrap();
        assert_eq!(
            m.execute(&con_addr(), Request::GetCredits { account: GEN })
                .unwrap(),
            Response::Amount(7)
        );
        assert_eq!(
            m.execute(&con_addr(), Request::GetNumListings).unwrap(),
            Response::Count(0)
        );
    }
}
