use crate::error::SeriesError;
use crate::series::BarSeries;
use core_types::{PriceBar, Timeframe};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies one bar series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl SeriesKey {
    pub fn new(symbol: &str, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
        }
    }
}

/// What happened to a bar handed to [`SeriesStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The bar was stored. `evicted` is true when the oldest bar was dropped to make room.
    Appended { len: usize, evicted: bool },
    /// The bar was still forming and was not stored.
    Ignored,
}

/// Owns the bar history of every `(symbol, timeframe)` pair.
///
/// Series are created lazily on the first closed bar. Writers of different
/// series never block each other; readers take a short read lock and leave with
/// an owned copy of the window.
#[derive(Debug)]
pub struct SeriesStore {
    series: DashMap<SeriesKey, Arc<RwLock<BarSeries>>>,
    capacities: HashMap<Timeframe, usize>,
    default_capacity: usize,
}

impl SeriesStore {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            series: DashMap::new(),
            capacities: HashMap::new(),
            default_capacity,
        }
    }

    /// Sets the ring size used for a timeframe's series created after this call.
    pub fn with_capacity(mut self, timeframe: Timeframe, capacity: usize) -> Self {
        self.capacities.insert(timeframe, capacity);
        self
    }

    pub fn capacity_for(&self, timeframe: Timeframe) -> usize {
        self.capacities
            .get(&timeframe)
            .copied()
            .unwrap_or(self.default_capacity)
    }

    /// Validates and stores a bar.
    ///
    /// Unclosed bars are ignored. Bars that break the OHLC invariants, or whose
    /// open time is not strictly after the last stored bar, are rejected and leave
    /// the series untouched.
    pub fn append(&self, timeframe: Timeframe, bar: PriceBar) -> Result<AppendOutcome, SeriesError> {
        if !bar.closed {
            tracing::trace!(symbol = %bar.symbol, %timeframe, "Ignoring unclosed bar");
            return Ok(AppendOutcome::Ignored);
        }
        bar.validate()?;

        let key = SeriesKey::new(&bar.symbol, timeframe);
        let capacity = self.capacity_for(timeframe);
        // Clone the Arc out so the map shard is not held while we take the series lock.
        let series = self
            .series
            .entry(key)
            .or_insert_with(|| Arc::new(RwLock::new(BarSeries::new(capacity))))
            .clone();

        let mut series = series.write();
        if let Some(last) = series.last_open_time() {
            if bar.open_time <= last {
                return Err(SeriesError::OutOfOrderBar {
                    symbol: bar.symbol,
                    timeframe,
                    last,
                    received: bar.open_time,
                });
            }
        }
        let evicted = series.push(bar);

        Ok(AppendOutcome::Appended {
            len: series.len(),
            evicted,
        })
    }

    fn get(&self, symbol: &str, timeframe: Timeframe) -> Option<Arc<RwLock<BarSeries>>> {
        self.series
            .get(&SeriesKey::new(symbol, timeframe))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// The most recent `n` bars, oldest first. Empty when the series does not exist.
    pub fn window(&self, symbol: &str, timeframe: Timeframe, n: usize) -> Vec<PriceBar> {
        self.get(symbol, timeframe)
            .map(|series| series.read().window(n))
            .unwrap_or_default()
    }

    /// A copy of the whole retained history, oldest first.
    pub fn snapshot(&self, symbol: &str, timeframe: Timeframe) -> Vec<PriceBar> {
        self.get(symbol, timeframe)
            .map(|series| series.read().to_vec())
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &str, timeframe: Timeframe) -> usize {
        self.get(symbol, timeframe)
            .map(|series| series.read().len())
            .unwrap_or(0)
    }
}
