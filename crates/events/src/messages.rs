use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::{OrderSide, Timeframe, TradingSignal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the severity of a log message for structured logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A human-readable log line forwarded to notifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// A bar dropped at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRejected {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub open_time: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectiveOrderKind {
    StopLoss,
    TakeProfit,
}

/// A stop-loss or take-profit order placed for an open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectiveOrder {
    pub position_id: Uuid,
    pub symbol: String,
    pub kind: ProtectiveOrderKind,
    /// The side of the protective order, opposite to the position.
    pub side: OrderSide,
    pub trigger_price: Decimal,
    pub placed_at: DateTime<Utc>,
}

/// The top-level event enum.
/// Everything the engine reports to the outside world is one of these variants.
///
/// With `#[serde(tag = "type", content = "payload")]` a `SignalEmitted` event
/// serializes as `{"type": "SignalEmitted", "payload": { ...signal fields... }}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// A structured log message.
    Log(LogMessage),
    /// An entry or exit signal that passed every filter.
    SignalEmitted(TradingSignal),
    BarRejected(BarRejected),
    ProtectiveOrderPlaced(ProtectiveOrder),
}

impl EngineEvent {
    pub fn to_json(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}
