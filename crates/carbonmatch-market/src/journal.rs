//! Bounded event journal.
//!
//! Every accepted mutation appends one [`EventRecord`]. The journal keeps
//! at most `capacity` records; when full, the oldest is evicted. Sequence
//! numbers keep counting across evictions, so a reader polling with
//! `since(last_seen)` can detect that it fell behind.

use std::collections::VecDeque;

use carbonmatch_types::{CarbonError, EventRecord, LedgerEvent, Result};
use chrono::Utc;

#[derive(Debug, Clone)]
pub struct EventJournal {
    /// Front = oldest.
    records: VecDeque<EventRecord>,
    capacity: usize,
    /// Sequence of the most recently appended record (0 = none yet).
    last_sequence: u64,
}

impl EventJournal {
    /// # Errors
    /// `Configuration` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CarbonError::Configuration(
                "journal capacity must be > 0".into(),
            ));
        }
        Ok(Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            last_sequence: 0,
        })
    }

    /// Rebuild from stored records. Keeps only the newest `capacity`.
    pub fn restore(
        capacity: usize,
        records: impl IntoIterator<Item = EventRecord>,
        last_sequence: u64,
    ) -> Result<Self> {
        let mut journal = Self::new(capacity)?;
        for record in records {
            if record.sequence > last_sequence {
                return Err(CarbonError::Serialization(format!(
                    "journal record {} is past last sequence {last_sequence}",
                    record.sequence
                )));
            }
            journal.push(record);
        }
        journal.last_sequence = last_sequence;
        Ok(journal)
    }

    /// Append an event, returning its sequence number.
    pub fn append(&mut self, event: LedgerEvent) -> u64 {
        self.last_sequence += 1;
        let record = EventRecord {
            sequence: self.last_sequence,
            event,
            recorded_at: Utc::now(),
        };
        self.push(record);
        self.last_sequence
    }

    fn push(&mut self, record: EventRecord) {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Retained records with `sequence > after`.
    #[must_use]
    pub fn since(&self, after: u64) -> Vec<EventRecord> {
        let start = self.records.partition_point(|r| r.sequence <= after);
        self.records.range(start..).cloned().collect()
    }

    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
