use chrono::{DateTime, Utc};
use core_types::{CoreError, Timeframe};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Rejected invalid bar: {0}")]
    InvalidBar(#[from] CoreError),

    #[error(
        "Rejected out-of-order bar for {symbol} {timeframe}: open time {received} is not after {last}"
    )]
    OutOfOrderBar {
        symbol: String,
        timeframe: Timeframe,
        last: DateTime<Utc>,
        received: DateTime<Utc>,
    },
}
