//! Request / response model of the operation surface.
//!
//! Hosts serialize these (JSON) to drive a market remotely or to replay a
//! request log. Every request is paired with the authenticated caller in
//! an [`Envelope`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Account, AccountId, Address, CarbonError, ComplianceViolation, EventRecord, Listing, ListingId,
    MatchResult,
};

/// One call against the market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    // --- registry ---
    CreateValidator { address: Address },
    CreateGenerator { id: AccountId, name: String, address: Address },
    CreateConsumer { id: AccountId, name: String, address: Address },
    // --- ledger ---
    AllocateCredit { generator: AccountId, amount: u64 },
    Approve { owner: AccountId, spender: Address, amount: u64 },
    TransferCredit { from: AccountId, to: AccountId, amount: u64 },
    // --- emissions ---
    ReportEmissions { consumer: AccountId, emissions: u64 },
    // --- marketplace ---
    ListCredit { seller: AccountId, price: u64, quantity: u64 },
    WithdrawListing { listing: ListingId },
    BuyCredit { buyer: AccountId, quantity: u64 },
    // --- queries ---
    GetCredits { account: AccountId },
    GetAccount { account: AccountId },
    GetAllowance { owner: AccountId, spender: Address },
    GetEmissions { consumer: AccountId },
    CheckEmissions,
    ComplianceReport,
    GeneratorList,
    ConsumerList,
    GetPrices,
    GetQuantities,
    GetListings,
    GetNumListings,
    GetLastNumFilled,
    GetLastAvgPriceFilled,
    GetLastMatch,
    EventsSince { after: u64 },
}

impl Request {
    /// Whether this request leaves the state untouched.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        !matches!(
            self,
            Self::CreateValidator { .. }
                | Self::CreateGenerator { .. }
                | Self::CreateConsumer { .. }
                | Self::AllocateCredit { .. }
                | Self::Approve { .. }
                | Self::TransferCredit { .. }
                | Self::ReportEmissions { .. }
                | Self::ListCredit { .. }
                | Self::WithdrawListing { .. }
                | Self::BuyCredit { .. }
        )
    }
}

/// Result payload of a successful [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Listed(ListingId),
    Matched(MatchResult),
    Amount(u64),
    Count(usize),
    Price(Decimal),
    Account(Account),
    Accounts(Vec<AccountId>),
    Violations(Vec<ComplianceViolation>),
    Values(Vec<u64>),
    Listings(Vec<Listing>),
    Events(Vec<EventRecord>),
}

/// A request tagged with the authenticated identity issuing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub caller: Address,
    pub request: Request,
}

impl Envelope {
    /// Decode one line of a JSON-lines request log.
    ///
    /// # Errors
    /// - `InvalidArgument` if the line is JSON but a field holds a bad value
    ///   (malformed address, unknown op, negative amount)
    /// - `Serialization` if the line is not JSON at all
    pub fn from_json_line(line: &str) -> crate::Result<Self> {
        serde_json::from_str(line).map_err(|err| {
            if err.is_data() {
                CarbonError::invalid(format!("undecodable request: {err}"))
            } else {
                CarbonError::from(err)
            }
        })
    }
}
