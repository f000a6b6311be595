use chrono::{DateTime, Utc};
use core_types::PriceBar;
use std::collections::VecDeque;

/// A FIFO ring of closed bars, oldest first.
#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: VecDeque<PriceBar>,
    capacity: usize,
}

impl BarSeries {
    /// Creates an empty series. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_open_time(&self) -> Option<DateTime<Utc>> {
        self.bars.back().map(|b| b.open_time)
    }

    /// Appends a bar and evicts the oldest one if the ring is over capacity.
    ///
    /// Returns true when a bar was evicted. Ordering is checked by the caller.
    pub(crate) fn push(&mut self, bar: PriceBar) -> bool {
        self.bars.push_back(bar);
        if self.bars.len() > self.capacity {
            self.bars.pop_front();
            true
        } else {
            false
        }
    }

    /// The most recent `n` bars (or all of them if fewer are held), oldest first.
    pub fn window(&self, n: usize) -> Vec<PriceBar> {
        let skip = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(skip).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<PriceBar> {
        self.bars.iter().cloned().collect()
    }
}
