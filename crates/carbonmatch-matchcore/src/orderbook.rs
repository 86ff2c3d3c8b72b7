//! The sell-listing book.
//!
//! Uses a `BTreeMap<price, PriceLevel>` so iteration is lowest price
//! first, and each level keeps its listings in sequence order. Walking
//! levels then listings therefore yields the matching priority
//! `(price ascending, sequence ascending)`.
//!
//! An auxiliary `HashMap<ListingId, price>` enables O(log N) withdrawal.

use std::collections::{BTreeMap, HashMap};

use carbonmatch_types::{AccountId, CarbonError, Listing, ListingId, Result};

use crate::price_level::PriceLevel;

/// The book of active sell listings.
#[derive(Debug, Default)]
pub struct OrderBook {
    /// Lowest price first.
    levels: BTreeMap<u64, PriceLevel>,
    /// Fast lookup: `ListingId -> price`.
    index: HashMap<ListingId, u64>,
    /// Open listing count per seller.
    open_by_seller: HashMap<AccountId, usize>,
}

impl OrderBook {
    /// Create a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
            index: HashMap::new(),
            open_by_seller: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion / removal
    // =================================================================

    /// Insert a listing at its price.
    ///
    /// # Errors
    /// `DuplicateListing` if the id is already on the book,
    /// `InvalidArgument` if the price or remaining quantity is zero.
    pub fn insert(&mut self, listing: Listing) -> Result<()> {
        if self.index.contains_key(&listing.id) {
            return Err(CarbonError::DuplicateListing(listing.id));
        }
        if listing.price == 0 || listing.remaining == 0 {
            return Err(CarbonError::invalid(format!(
                "{} must have positive price and quantity",
                listing.id
            )));
        }

        self.index.insert(listing.id, listing.price);
        *self.open_by_seller.entry(listing.seller).or_insert(0) += 1;
        self.levels
            .entry(listing.price)
            .or_insert_with(|| PriceLevel::new(listing.price))
            .insert(listing);
        Ok(())
    }

    /// Remove a listing by id. Returns the removed listing.
    pub fn remove(&mut self, id: &ListingId) -> Result<Listing> {
        let price = self
            .index
            .remove(id)
            .ok_or(CarbonError::ListingNotFound(*id))?;
        let level = self
            .levels
            .get_mut(&price)
            .ok_or(CarbonError::ListingNotFound(*id))?;
        let listing = level.remove(id).ok_or(CarbonError::ListingNotFound(*id))?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        self.release_seller_slot(listing.seller);
        Ok(listing)
    }

    /// Take `quantity` from a listing, removing it once exhausted.
    /// Returns the quantity left on the listing.
    ///
    /// # Errors
    /// `ListingNotFound`, or `Internal` if `quantity` exceeds what remains.
    pub fn take(&mut self, id: &ListingId, quantity: u64) -> Result<u64> {
        let price = *self
            .index
            .get(id)
            .ok_or(CarbonError::ListingNotFound(*id))?;
        let level = self
            .levels
            .get_mut(&price)
            .ok_or(CarbonError::ListingNotFound(*id))?;
        let listing = level.get_mut(id).ok_or(CarbonError::ListingNotFound(*id))?;
        if listing.remaining < quantity {
            return Err(CarbonError::Internal(format!(
                "take {quantity} exceeds remaining {} on {id}",
                listing.remaining
            )));
        }
        listing.remaining -= quantity;
        let left = listing.remaining;
        if left == 0 {
            self.remove(id)?;
        }
        Ok(left)
    }

    fn release_seller_slot(&mut self, seller: AccountId) {
        if let Some(count) = self.open_by_seller.get_mut(&seller) {
            *count -= 1;
            if *count == 0 {
                self.open_by_seller.remove(&seller);
            }
        }
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn get(&self, id: &ListingId) -> Option<&Listing> {
        let price = self.index.get(id)?;
        self.levels.get(price)?.get(id)
    }

    /// Number of active listings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of distinct price levels.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Open listings held by `seller`.
    #[must_use]
    pub fn open_listings(&self, seller: AccountId) -> usize {
        self.open_by_seller.get(&seller).copied().unwrap_or(0)
    }

    /// Σ remaining over every listing.
    #[must_use]
    pub fn total_quantity(&self) -> u128 {
        self.listings().map(|l| u128::from(l.remaining)).sum()
    }

    /// Σ remaining over `seller`'s listings. Must equal the seller's
    /// locked balance.
    #[must_use]
    pub fn locked_by(&self, seller: AccountId) -> u64 {
        self.listings()
            .filter(|l| l.seller == seller)
            .map(|l| l.remaining)
            .sum()
    }

    // =================================================================
    // Iteration (for the matcher and the read surface)
    // =================================================================

    /// Listings in matching priority: price ascending, then sequence.
    pub fn listings(&self) -> impl Iterator<Item = &Listing> {
        self.levels.values().flat_map(|level| level.listings.iter())
    }

    /// Price levels from best (lowest) to worst.
    pub fn levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.values()
    }

    /// Listing prices in matching priority.
    #[must_use]
    pub fn prices(&self) -> Vec<u64> {
        self.listings().map(|l| l.price).collect()
    }

    /// Listing remaining quantities, index-aligned with [`prices`](Self::prices).
    #[must_use]
    pub fn quantities(&self) -> Vec<u64> {
        self.listings().map(|l| l.remaining).collect()
    }
}
