use crate::error::CoreError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side of the order
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// The trend classification of a tunnel snapshot.
///
/// `None` is reserved for snapshots that could not be classified at all
/// (not enough history). A classified snapshot is always one of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrendDirection {
    #[default]
    None,
    Bullish,
    Bearish,
    Sideways,
}

impl TrendDirection {
    pub fn is_directional(&self) -> bool {
        matches!(self, TrendDirection::Bullish | TrendDirection::Bearish)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignalType {
    #[default]
    None,
    Buy,
    Sell,
    StopLossExit,
    TakeProfitExit,
}

impl SignalType {
    /// The order side an entry signal opens with. Exit signals have no side of their own.
    pub fn entry_side(&self) -> Option<OrderSide> {
        match self {
            SignalType::Buy => Some(OrderSide::Buy),
            SignalType::Sell => Some(OrderSide::Sell),
            _ => None,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, SignalType::StopLossExit | SignalType::TakeProfitExit)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalType::None => "NONE",
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::StopLossExit => "STOP_LOSS",
            SignalType::TakeProfitExit => "TAKE_PROFIT",
        };
        f.write_str(label)
    }
}

/// Kline intervals supported by the market-data feed.
///
/// Variants are declared shortest first, so the derived ordering compares durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// The interval string used by the exchange stream names (e.g. `btcusdt@kline_15m`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::M30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            other => Err(CoreError::UnknownTimeframe(other.to_string())),
        }
    }
}
