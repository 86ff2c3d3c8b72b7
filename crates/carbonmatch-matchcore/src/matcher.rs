//! Price-priority fill planner.
//!
//! A buy request is matched in two phases:
//!
//! ```text
//! plan_buy(&OrderBook, buyer, quantity) -> FillPlan     (pure)
//! apply_plan(&mut OrderBook, &FillPlan)                  (book mutation only)
//! ```
//!
//! The caller settles balances between the two phases. If settlement is
//! rejected (e.g. the buyer cannot pay), the plan is simply dropped and
//! the book is untouched.
//!
//! ## Self-Trade Prevention
//!
//! Listings owned by the buyer are skipped and stay on the book. The
//! buy continues against the next listing in priority order.

use carbonmatch_types::{AccountId, CarbonError, Fill, FillId, MatchResult, Result};

use crate::{OrderBook, determinism::compute_fill_root};

/// Fills a buy request would produce against the current book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillPlan {
    pub buy_sequence: u64,
    pub buyer: AccountId,
    pub requested: u64,
    /// In matching priority order.
    pub fills: Vec<Fill>,
    pub units_filled: u64,
    /// Σ price × quantity over `fills`.
    pub total_cost: u64,
    /// Listings passed over because the buyer owns them.
    pub skipped_self: usize,
}

impl FillPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Freeze the plan into the reported match result.
    #[must_use]
    pub fn into_match_result(self) -> MatchResult {
        let fill_root = compute_fill_root(&self.fills);
        MatchResult {
            buy_sequence: self.buy_sequence,
            buyer: Some(self.buyer),
            requested: self.requested,
            units_filled: self.units_filled,
            weighted_average_price: MatchResult::average_price(self.total_cost, self.units_filled),
            total_cost: self.total_cost,
            fills: self.fills,
            fill_root,
        }
    }
}

/// Plan a buy of `quantity` units for `buyer` against `book`.
///
/// ## Algorithm
///
/// 1. Walk listings lowest price first, oldest first among equal prices
/// 2. Skip listings whose seller is the buyer
/// 3. Take `min(still_needed, remaining)` from each listing
/// 4. Stop when the request is satisfied or the book is exhausted
///
/// Running out of listings is a partial fill, not an error.
///
/// # Errors
/// `InvalidArgument` if `quantity` is zero, `CreditOverflow` if a fill
/// cost does not fit in `u64`.
pub fn plan_buy(
    book: &OrderBook,
    buyer: AccountId,
    quantity: u64,
    buy_sequence: u64,
) -> Result<FillPlan> {
    if quantity == 0 {
        return Err(CarbonError::invalid("buy quantity must be positive"));
    }

    let mut fills = Vec::new();
    let mut still_needed = quantity;
    let mut total_cost: u64 = 0;
    let mut skipped_self = 0usize;

    for listing in book.listings() {
        if still_needed == 0 {
            break;
        }
        if listing.seller == buyer {
            skipped_self += 1;
            tracing::warn!(
                buyer = %buyer,
                listing = %listing.id,
                "self-trade prevented, listing skipped"
            );
            continue;
        }

        let take = still_needed.min(listing.remaining);
        let cost = listing
            .price
            .checked_mul(take)
            .ok_or(CarbonError::CreditOverflow)?;
        total_cost = total_cost
            .checked_add(cost)
            .ok_or(CarbonError::CreditOverflow)?;

        let fill = Fill {
            id: FillId::deterministic(buy_sequence, fills.len() as u64),
            listing_id: listing.id,
            seller: listing.seller,
            buyer,
            price: listing.price,
            quantity: take,
            cost,
        };
        tracing::debug!(%fill, "planned fill");
        fills.push(fill);
        still_needed -= take;
    }

    Ok(FillPlan {
        buy_sequence,
        buyer,
        requested: quantity,
        fills,
        units_filled: quantity - still_needed,
        total_cost,
        skipped_self,
    })
}

/// Remove the planned quantities from the book.
///
/// Listings that reach zero are removed. The plan must have been made
/// against this book with no intervening mutation.
///
/// # Errors
/// Propagates `ListingNotFound` / `Internal` from the book if the plan is
/// stale.
pub fn apply_plan(book: &mut OrderBook, plan: &FillPlan) -> Result<()> {
    for fill in &plan.fills {
        book.take(&fill.listing_id, fill.quantity)?;
    }
    tracing::debug!(
        buy_sequence = plan.buy_sequence,
        fills = plan.fills.len(),
        units = plan.units_filled,
        root = %hex::encode(compute_fill_root(&plan.fills)),
        "fill plan applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use carbonmatch_types::{Listing, ListingId};
    use rust_decimal::Decimal;

    use super::*;

    const BUYER: AccountId = AccountId(2001);

    fn book_with(listings: &[(u64, u64, u64, u64)]) -> OrderBook {
        let mut book = OrderBook::new();
        for &(seq, seller, price, qty) in listings {
            book.insert(Listing::dummy(seq, seller, price, qty)).unwrap();
        }
        book
    }

    #[test]
    fn cheapest_first_then_oldest() {
        // listing 1 @10, listing 2 @10, listing 3 @5
        let book = book_with(&[(1, 1001, 10, 4), (2, 1002, 10, 6), (3, 1003, 5, 8)]);
        let plan = plan_buy(&book, BUYER, 15, 1).unwrap();

        let order: Vec<ListingId> = plan.fills.iter().map(|f| f.listing_id).collect();
        assert_eq!(order, vec![ListingId(3), ListingId(1), ListingId(2)]);
        let qty: Vec<u64> = plan.fills.iter().map(|f| f.quantity).collect();
        assert_eq!(qty, vec![8, 4, 3]);
        assert_eq!(plan.units_filled, 15);
        assert_eq!(plan.total_cost, 8 * 5 + 4 * 10 + 3 * 10);
    }

    #[test]
    fn partial_fill_when_book_runs_dry() {
        let book = book_with(&[(1, 1001, 5, 5), (2, 1002, 10, 7)]);
        let plan = plan_buy(&book, BUYER, 20, 1).unwrap();
        assert_eq!(plan.units_filled, 12);
        assert_eq!(plan.total_cost, 95);

        let result = plan.into_match_result();
        assert!(result.is_partial());
        assert_eq!(
            result.weighted_average_price,
            Decimal::from(95) / Decimal::from(12)
        );
    }

    #[test]
    fn empty_book_yields_empty_plan() {
        let book = OrderBook::new();
        let plan = plan_buy(&book, BUYER, 10, 1).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.units_filled, 0);

        let result = plan.into_match_result();
        assert_eq!(result.weighted_average_price, Decimal::ZERO);
    }

    #[test]
    fn zero_quantity_rejected() {
        let book = book_with(&[(1, 1001, 5, 5)]);
        assert!(matches!(
            plan_buy(&book, BUYER, 0, 1),
            Err(CarbonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn planning_does_not_mutate_book() {
        let book = book_with(&[(1, 1001, 5, 5)]);
        let _ = plan_buy(&book, BUYER, 3, 1).unwrap();
        assert_eq!(book.quantities(), vec![5]);
    }

    #[test]
    fn apply_removes_exhausted_listings() {
        let mut book = book_with(&[(1, 1001, 5, 5), (2, 1002, 10, 7)]);
        let plan = plan_buy(&book, BUYER, 8, 1).unwrap();
        apply_plan(&mut book, &plan).unwrap();
        assert_eq!(book.prices(), vec![10]);
        assert_eq!(book.quantities(), vec![4]);
    }

    #[test]
    fn own_listings_are_skipped() {
        let book = book_with(&[(1, BUYER.0, 1, 10), (2, 1001, 5, 10)]);
        let plan = plan_buy(&book, BUYER, 4, 1).unwrap();
        assert_eq!(plan.skipped_self, 1);
        assert_eq!(plan.fills.len(), 1);
        assert_eq!(plan.fills[0].listing_id, ListingId(2));

        let mut book = book;
        apply_plan(&mut book, &plan).unwrap();
        assert!(book.get(&ListingId(1)).is_some());
    }

    #[test]
    fn cost_overflow_detected() {
        let book = book_with(&[(1, 1001, u64::MAX, 2)]);
        assert!(matches!(
            plan_buy(&book, BUYER, 2, 1),
            Err(CarbonError::CreditOverflow)
        ));
    }

    #[test]
    fn fill_ids_are_deterministic() {
        let book = book_with(&[(1, 1001, 5, 5), (2, 1002, 10, 7)]);
        let a = plan_buy(&book, BUYER, 8, 42).unwrap();
        let b = plan_buy(&book, BUYER, 8, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fills[1].id, FillId::deterministic(42, 1));
    }

    #[test]
    fn randomized_plans_respect_book_totals() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut book = OrderBook::new();
            for seq in 1..=rng.gen_range(1..20u64) {
                let seller = rng.gen_range(1000..1005u64);
                let price = rng.gen_range(1..50u64);
                let qty = rng.gen_range(1..30u64);
                book.insert(Listing::dummy(seq, seller, price, qty)).unwrap();
            }
            let before = book.total_quantity();
            let want = rng.gen_range(1..200u64);
            let plan = plan_buy(&book, BUYER, want, 1).unwrap();

            assert!(plan.units_filled <= want);
            let cost: u64 = plan.fills.iter().map(|f| f.cost).sum();
            assert_eq!(cost, plan.total_cost);
            for pair in plan.fills.windows(2) {
                assert!(pair[0].price <= pair[1].price);
            }

            apply_plan(&mut book, &plan).unwrap();
            assert_eq!(
                book.total_quantity() + u128::from(plan.units_filled),
                before
            );
        }
    }
}
