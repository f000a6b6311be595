//! # Exchange market-data adapter
//!
//! A thin WebSocket wrapper around the Binance futures kline streams. It knows
//! nothing about strategies: it turns stream messages into `PriceBar`s and hands
//! them to whoever holds the receiving end of the channel.

pub mod error;
pub mod live_connector;

pub use error::ApiError;
pub use live_connector::{LiveConnector, parse_kline_message};
