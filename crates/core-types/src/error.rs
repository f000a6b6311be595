use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid bar for {symbol}: {reason}")]
    InvalidBar { symbol: String, reason: String },

    #[error("Unknown timeframe '{0}'")]
    UnknownTimeframe(String),
}
