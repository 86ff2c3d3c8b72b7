//! Determinism digests.
//!
//! Replaying the same request log must produce the same fills and the
//! same book. The `fill_root` summarizes the fills of one buy; the book
//! digest summarizes every open listing. Both are plain SHA-256 over a
//! fixed, versioned encoding.

use carbonmatch_types::Fill;
use sha2::{Digest, Sha256};

use crate::OrderBook;

/// Hash over a sequence of fills. Order matters.
#[must_use]
pub fn compute_fill_root(fills: &[Fill]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"carbonmatch:fill_root:v1:");
    hasher.update((fills.len() as u64).to_le_bytes());

    for fill in fills {
        hasher.update(fill.id.0.as_bytes());
        hasher.update(fill.listing_id.0.to_le_bytes());
        hasher.update(fill.seller.0.to_le_bytes());
        hasher.update(fill.buyer.0.to_le_bytes());
        hasher.update(fill.price.to_le_bytes());
        hasher.update(fill.quantity.to_le_bytes());
        hasher.update(fill.cost.to_le_bytes());
    }

    hasher.finalize().into()
}

#[must_use]
pub fn verify_fill_root(fills: &[Fill], expected_root: &[u8; 32]) -> bool {
    compute_fill_root(fills) == *expected_root
}

/// Hash over every open listing in priority order.
///
/// Creation timestamps are excluded, so two books built by replaying the
/// same requests digest identically.
#[must_use]
pub fn compute_book_digest(book: &OrderBook) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"carbonmatch:book:v1:");
    hasher.update((book.len() as u64).to_le_bytes());

    for listing in book.listings() {
        hasher.update(listing.id.0.to_le_bytes());
        hasher.update(listing.seller.0.to_le_bytes());
        hasher.update(listing.price.to_le_bytes());
        hasher.update(listing.quantity.to_le_bytes());
        hasher.update(listing.remaining.to_le_bytes());
        hasher.update(listing.sequence.to_le_bytes());
    }

    hasher.finalize().into()
}
