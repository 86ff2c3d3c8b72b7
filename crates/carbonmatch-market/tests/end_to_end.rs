//! End-to-end scenarios across registry, ledger, emissions and the
//! marketplace, driven through the public `CarbonMarket` surface.

use carbonmatch_market::CarbonMarket;
use carbonmatch_types::*;
use rust_decimal::Decimal;

/// Helper: a market with one regulator, one validator, three generators
/// and one consumer.
struct Scenario {
    market: CarbonMarket,
}

const G1: AccountId = AccountId(1001);
const G2: AccountId = AccountId(1002);
const G3: AccountId = AccountId(1003);
const C1: AccountId = AccountId(2001);

fn regulator() -> Address {
    Address::from_index(1)
}

fn validator() -> Address {
    Address::from_index(2)
}

fn addr(id: AccountId) -> Address {
    Address::from_index(u32::try_from(id.0).unwrap())
}

impl Scenario {
    fn new() -> Self {
        Self::with_config(MarketConfig::new(regulator()))
    }

    fn with_config(config: MarketConfig) -> Self {
        let mut market = CarbonMarket::new(config).unwrap();
        market.create_validator(&regulator(), validator()).unwrap();
        for (id, name) in [(G1, "Solar One"), (G2, "Wind Two"), (G3, "Hydro Three")] {
            market
                .create_generator(&validator(), id, name, addr(id))
                .unwrap();
        }
        market
            .create_consumer(&regulator(), C1, "Steelworks", addr(C1))
            .unwrap();
        Self { market }
    }

    fn allocate(&mut self, id: AccountId, amount: u64) {
        self.market
            .allocate_credit(&regulator(), id, amount)
            .unwrap();
    }

    fn list(&mut self, seller: AccountId, price: u64, quantity: u64) -> ListingId {
        self.market
            .list_credit(&addr(seller), seller, price, quantity)
            .unwrap()
    }

    fn buy(&mut self, buyer: AccountId, quantity: u64) -> MatchResult {
        self.market.buy_credit(&addr(buyer), buyer, quantity).unwrap()
    }
}

#[test]
fn allocate_then_list_round_trip() {
    let mut s = Scenario::new();
    s.allocate(G1, 100);
    assert_eq!(s.market.get_credits(G1).unwrap(), 100);

    s.list(G1, 10, 40);
    assert_eq!(s.market.get_credits(G1).unwrap(), 100);
    assert_eq!(s.market.prices(), vec![10]);
    assert_eq!(s.market.quantities(), vec![40]);
}

#[test]
fn matching_order_over_three_listings() {
    let mut s = Scenario::new();
    s.allocate(G1, 100);
    s.allocate(G2, 100);
    s.allocate(G3, 500);

    // sequence 1 @10, sequence 2 @10, sequence 3 @5
    let l1 = s.list(G1, 10, 8);
    let l2 = s.list(G2, 10, 8);
    let l3 = s.list(G1, 5, 5);
    assert_eq!(s.market.prices(), vec![5, 10, 10]);
    assert_eq!(s.market.quantities(), vec![5, 8, 8]);

    let result = s.buy(G3, 12);
    let order: Vec<ListingId> = result.fills.iter().map(|f| f.listing_id).collect();
    assert_eq!(order, vec![l3, l1]);
    assert_eq!(result.fills[0].quantity, 5);
    assert_eq!(result.fills[1].quantity, 7);
    assert_eq!(result.units_filled, 12);

    let q3 = Decimal::from(5);
    let expected = (Decimal::from(5) * q3 + Decimal::from(10) * (Decimal::from(12) - q3))
        / Decimal::from(12);
    assert_eq!(s.market.last_avg_price_filled(), expected);
    assert_eq!(s.market.last_num_filled(), 12);

    // listing 3 consumed, listing 1 partially, listing 2 untouched
    assert_eq!(s.market.num_listings(), 2);
    assert_eq!(s.market.prices(), vec![10, 10]);
    assert_eq!(s.market.quantities(), vec![1, 8]);
    assert!(s.market.listing(l2).is_some());
    s.market.verify_supply().unwrap();
}

#[test]
fn partial_fill_empties_the_book() {
    let mut s = Scenario::new();
    s.allocate(G1, 100);
    s.allocate(G2, 1_000);
    s.list(G1, 2, 10);
    s.list(G1, 3, 15);

    let result = s.buy(G2, 100);
    assert_eq!(result.requested, 100);
    assert_eq!(result.units_filled, 25);
    assert!(result.is_partial());
    assert_eq!(s.market.num_listings(), 0);
    assert!(s.market.prices().is_empty());
}

#[test]
fn listing_count_tracks_list_and_full_consumption() {
    let mut s = Scenario::new();
    s.allocate(G1, 100);
    s.allocate(G2, 100);

    let before = s.market.num_listings();
    s.list(G1, 1, 10);
    assert_eq!(s.market.num_listings(), before + 1);
    s.list(G1, 2, 10);
    assert_eq!(s.market.num_listings(), before + 2);

    s.buy(G2, 10);
    assert_eq!(s.market.num_listings(), before + 1);
}

#[test]
fn unauthorized_allocation_leaves_balances_unchanged() {
    let mut s = Scenario::new();
    s.allocate(G1, 50);
    let before: Vec<u64> = [G1, G2, G3, C1]
        .iter()
        .map(|id| s.market.get_credits(*id).unwrap())
        .collect();

    let err = s.market.allocate_credit(&addr(G2), G1, 500).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let after: Vec<u64> = [G1, G2, G3, C1]
        .iter()
        .map(|id| s.market.get_credits(*id).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn check_emissions_flags_over_emitting_consumer() {
    let mut s = Scenario::with_config(
        MarketConfig::new(regulator()).with_consumer_opening_credits(100),
    );
    assert_eq!(s.market.get_credits(C1).unwrap(), 100);
    s.market.report_emissions(&validator(), C1, 500).unwrap();
    assert_eq!(s.market.check_emissions(), vec![C1]);

    // Buying credits brings the consumer back into compliance.
    s.allocate(G1, 1_000);
    s.list(G1, 1, 500);
    s.buy(C1, 100);
    assert_eq!(s.market.get_credits(C1).unwrap(), 100);
    s.market
        .transfer_credit(&addr(G1), G1, C1, 450)
        .unwrap();
    assert!(s.market.check_emissions().is_empty());
}

#[test]
fn emissions_accumulate() {
    let mut s = Scenario::new();
    s.market.report_emissions(&addr(C1), C1, 10).unwrap();
    s.market.report_emissions(&regulator(), C1, 0).unwrap();
    s.market.report_emissions(&validator(), C1, 5).unwrap();
    assert_eq!(s.market.consumer_emissions(C1).unwrap(), 15);
}

#[test]
fn error_kinds_match_the_operation_surface() {
    let mut s = Scenario::new();

    let dup = s
        .market
        .create_generator(&regulator(), G1, "Again", Address::from_index(999))
        .unwrap_err();
    assert_eq!(dup.kind(), ErrorKind::DuplicateEntity);

    let dup_validator = s
        .market
        .create_validator(&regulator(), validator())
        .unwrap_err();
    assert_eq!(dup_validator.kind(), ErrorKind::DuplicateEntity);

    let empty_name = s
        .market
        .create_consumer(&regulator(), AccountId(2002), "  ", Address::from_index(998))
        .unwrap_err();
    assert_eq!(empty_name.kind(), ErrorKind::InvalidArgument);

    let missing = s.market.get_credits(AccountId(42)).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let zero_price = s.market.list_credit(&addr(G1), G1, 0, 1).unwrap_err();
    assert_eq!(zero_price.kind(), ErrorKind::InvalidArgument);

    let short = s.market.list_credit(&addr(G1), G1, 1, 1).unwrap_err();
    assert_eq!(short.kind(), ErrorKind::InsufficientCredits);

    let zero_buy = s.market.buy_credit(&addr(G1), G1, 0).unwrap_err();
    assert_eq!(zero_buy.kind(), ErrorKind::InvalidArgument);

    let validator_creates = s
        .market
        .create_validator(&validator(), Address::from_index(997))
        .unwrap_err();
    assert_eq!(validator_creates.kind(), ErrorKind::PermissionDenied);
}

#[test]
fn self_listings_are_skipped_when_buying() {
    let mut s = Scenario::new();
    s.allocate(G1, 100);
    s.allocate(G2, 100);
    let own = s.list(G1, 1, 10);
    s.list(G2, 4, 10);

    let result = s.buy(G1, 5);
    assert_eq!(result.units_filled, 5);
    assert_eq!(result.fills[0].seller, G2);
    assert_eq!(s.market.listing(own).unwrap().remaining, 10);
}

#[test]
fn journal_records_accepted_mutations() {
    let mut s = Scenario::new();
    let mark = s.market.events().last().map_or(0, |r| r.sequence);
    s.allocate(G1, 20);
    s.list(G1, 2, 5);

    let events = s.market.events_since(mark);
    let labels: Vec<&str> = events.iter().map(|r| r.event.label()).collect();
    assert_eq!(labels, vec!["CREDITS_ALLOCATED", "LISTING_CREATED"]);
}

#[test]
fn requests_round_trip_through_json() {
    let mut s = Scenario::new();
    let lines = [
        format!(
            r#"{{"caller":"{}","request":{{"op":"allocate_credit","generator":1001,"amount":30}}}}"#,
            regulator()
        ),
        format!(
            r#"{{"caller":"{}","request":{{"op":"list_credit","seller":1001,"price":3,"quantity":10}}}}"#,
            addr(G1)
        ),
        format!(
            r#"{{"caller":"{}","request":{{"op":"get_quantities"}}}}"#,
            addr(C1)
        ),
    ];
    let mut last = Response::Ok;
    for line in &lines {
        let envelope: Envelope = serde_json::from_str(line).unwrap();
        last = s.market.execute(&envelope.caller, envelope.request).unwrap();
    }
    assert_eq!(last, Response::Values(vec![10]));
}
