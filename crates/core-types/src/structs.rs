use crate::enums::{OrderSide, SignalType, Timeframe};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One OHLCV candle as delivered by the market-data feed.
///
/// `closed` is false for the in-progress updates the exchange streams while the
/// candle is still forming; only closed bars are ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub closed: bool,
}

impl PriceBar {
    /// Checks `low <= {open, close} <= high`, that every price is positive and
    /// that the volume is not negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: String| CoreError::InvalidBar {
            symbol: self.symbol.clone(),
            reason,
        };

        if self.symbol.is_empty() {
            return Err(invalid("symbol is empty".to_string()));
        }
        if self.high < self.low {
            return Err(invalid(format!("high {} is below low {}", self.high, self.low)));
        }
        for (name, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(invalid(format!(
                    "{} {} outside [{}, {}]",
                    name, value, self.low, self.high
                )));
            }
        }
        if self.low <= Decimal::ZERO {
            return Err(invalid(format!("non-positive price {}", self.low)));
        }
        if self.volume.is_sign_negative() && !self.volume.is_zero() {
            return Err(invalid(format!("negative volume {}", self.volume)));
        }
        Ok(())
    }
}

/// A decision produced by the signal or exit engine.
///
/// Entry signals (`Buy`/`Sell`) carry stop-loss and take-profit levels; exit
/// signals do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub signal_id: Uuid,
    pub symbol: String,
    pub signal_type: SignalType,
    pub price: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    /// Always within `[0, 1]`.
    pub confidence: Decimal,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub timeframe: Timeframe,
}

/// A position opened by the execution layer and tracked for trailing exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub position_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl OpenPosition {
    pub fn is_long(&self) -> bool {
        self.side == OrderSide::Buy
    }
}
