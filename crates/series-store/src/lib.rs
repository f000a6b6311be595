//! # Bar history
//!
//! Bounded, chronologically ordered rings of closed bars, one per
//! `(symbol, timeframe)` pair. Each ring has a single writer (its market-data
//! feed) and any number of readers, which always copy a consistent snapshot out
//! under a read lock.

pub mod error;
pub mod series;
pub mod store;

pub use error::SeriesError;
pub use series::BarSeries;
pub use store::{AppendOutcome, SeriesKey, SeriesStore};
