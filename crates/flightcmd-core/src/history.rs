//! Bounded tick history
//!
//! Fixed-capacity, insertion-ordered buffers of the most recent control ticks.
//! When full, the oldest entry is overwritten. Entries are never mutated once
//! stored.

use std::fmt;

use ringbuf::{traits::*, HeapRb};
use tracing::debug;

use crate::error::CoreError;
use crate::{Action, Observation, Vec3};

/// Default number of ticks retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Everything recorded about one completed control tick
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord<I = ()> {
    /// Rotor/thrust commands applied
    pub action: Action,
    /// Observation after actuation
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    /// Opaque per-tick information
    pub info: I,
    /// Position channel of the last full-state command
    pub commanded_reference: Vec3,
}

/// Fixed-capacity FIFO ring buffer
pub struct HistoryBuffer<T> {
    ring: HeapRb<T>,
    evicted: u64,
}

impl<T> fmt::Debug for HistoryBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryBuffer")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity())
            .field("evicted", &self.evicted)
            .finish()
    }
}

impl<T> HistoryBuffer<T> {
    /// Create an empty buffer holding at most `capacity` entries
    pub fn new(capacity: usize) -> Result<Self, CoreError> {
        if capacity == 0 {
            return Err(CoreError::config("history capacity must be at least 1"));
        }
        Ok(Self {
            ring: HeapRb::new(capacity),
            evicted: 0,
        })
    }

    /// Append an entry, evicting the oldest one when full
    pub fn append(&mut self, entry: T) {
        if self.ring.push_overwrite(entry).is_some() {
            self.evicted += 1;
        }
    }

    /// The `n` most recent entries in chronological order
    ///
    /// Asking for more than is stored returns everything available.
    pub fn latest(&self, n: usize) -> Vec<&T> {
        let len = self.len();
        if n > len {
            debug!(requested = n, available = len, "History underflow, returning available entries");
        }
        self.ring.iter().skip(len.saturating_sub(n)).collect()
    }

    /// Strict variant of [`latest`](Self::latest) that refuses short reads
    pub fn try_latest(&self, n: usize) -> Result<Vec<&T>, CoreError> {
        let available = self.len();
        if n > available {
            return Err(CoreError::Underflow { requested: n, available });
        }
        Ok(self.latest(n))
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&T> {
        self.ring.iter().last()
    }

    /// Oldest retained entry
    pub fn oldest(&self) -> Option<&T> {
        self.ring.try_peek()
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.ring.iter()
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    /// Total entries overwritten since creation
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        while self.ring.try_pop().is_some() {}
        self.evicted = 0;
    }
}
