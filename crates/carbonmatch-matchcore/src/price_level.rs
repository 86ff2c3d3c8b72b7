//! A single price level in the sell book.
//!
//! Listings at the same price are stored in sequence order (time
//! priority) using a [`VecDeque`].

use std::collections::VecDeque;

use carbonmatch_types::{Listing, ListingId};

/// All listings at one price.
///
/// The front of the deque has the lowest sequence number and is filled
/// first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price at this level.
    pub price: u64,
    /// Listings in time-priority order (front = oldest = highest priority).
    pub listings: VecDeque<Listing>,
}

impl PriceLevel {
    /// Create a new empty price level.
    #[must_use]
    pub fn new(price: u64) -> Self {
        Self {
            price,
            listings: VecDeque::new(),
        }
    }

    /// Insert a listing at its sequence position. New listings always
    /// carry the highest sequence, so this is a push to the back in the
    /// common case.
    pub fn insert(&mut self, listing: Listing) {
        let pos = self
            .listings
            .partition_point(|l| l.sequence < listing.sequence);
        self.listings.insert(pos, listing);
    }

    /// Peek at the front listing without removing it.
    #[must_use]
    pub fn front(&self) -> Option<&Listing> {
        self.listings.front()
    }

    /// Total remaining quantity across all listings at this level.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.listings.iter().map(|l| l.remaining).sum()
    }

    pub fn get(&self, id: &ListingId) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == *id)
    }

    pub fn get_mut(&mut self, id: &ListingId) -> Option<&mut Listing> {
        self.listings.iter_mut().find(|l| l.id == *id)
    }

    /// Remove a specific listing by id. Returns the removed listing, or `None`.
    pub fn remove(&mut self, id: &ListingId) -> Option<Listing> {
        let pos = self.listings.iter().position(|l| l.id == *id)?;
        self.listings.remove(pos)
    }

    /// Returns `true` if there are no listings at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Number of listings at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }
}
