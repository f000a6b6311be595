//! # Vegas Engine
//!
//! Wires the pure strategy logic to live data: `TradingCore` owns the bar
//! history and answers entry, exit and diagnostic queries; `LiveEngine` adds
//! the position lifecycle and protective-order scheduling; `feed::run_feed`
//! drives both from one market-data subscription per symbol and timeframe.

use crate::error::EngineError;
use core_types::{PriceBar, Timeframe, TradingSignal};
use events::LogLevel;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod error;
pub mod feed;
pub mod positions;
pub mod protective;
pub mod trading_core;

pub use positions::PositionBook;
pub use protective::{DryRunGateway, OrderGateway, ProtectiveOrderScheduler};
pub use trading_core::{Bot, TradingCore};

/// The live orchestrator: decides per fast bar whether to look for an entry or
/// an exit, and keeps positions and their protective orders in step.
pub struct LiveEngine {
    core: Arc<TradingCore>,
    scheduler: ProtectiveOrderScheduler,
}

impl LiveEngine {
    pub fn new(core: Arc<TradingCore>, scheduler: ProtectiveOrderScheduler) -> Self {
        Self { core, scheduler }
    }

    pub fn core(&self) -> &Arc<TradingCore> {
        &self.core
    }

    pub fn scheduler(&self) -> &ProtectiveOrderScheduler {
        &self.scheduler
    }

    /// Runs after a closed fast bar for `symbol` has been stored.
    ///
    /// With a position open only the trailing exit is checked; an exit closes
    /// the position and cancels its pending protective orders. Without one the
    /// entry rules run, and an entry opens a position whose stop and target are
    /// placed after the configured delay. Must be called inside a Tokio runtime.
    pub fn on_fast_bar(&self, symbol: &str) -> Result<Option<TradingSignal>, EngineError> {
        let symbol = self.core.bot(symbol)?.symbol.as_str();
        if let Some(position) = self.core.positions().get(symbol) {
            let exit = self.core.check_exit(symbol, position.is_long())?;
            if let Some(signal) = exit.as_ref().filter(|signal| signal.signal_type.is_exit()) {
                self.core.close_position(symbol);
                self.scheduler.cancel(position.position_id);
                tracing::info!(%symbol, position_id = %position.position_id, "Position closed");
                self.core.notify(
                    LogLevel::Info,
                    format!("Closed {symbol} position on {} at {}", signal.signal_type, signal.price),
                );
            }
            return Ok(exit);
        }

        let Some(signal) = self.core.evaluate(symbol)? else {
            return Ok(None);
        };
        // Sizing belongs to the execution layer; the paper position only tracks side and entry.
        let position = self.core.open_position(&signal, Decimal::ZERO)?;
        tracing::info!(%symbol, position_id = %position.position_id, side = ?position.side, "Position opened");
        self.core.notify(
            LogLevel::Info,
            format!("Opened {} position on {symbol} at {}", signal.signal_type, signal.price),
        );
        self.scheduler
            .schedule(position, signal.stop_loss, signal.take_profit);
        Ok(Some(signal))
    }

    /// Spawns [`feed::run_feed`] for one subscription.
    pub fn spawn_feed(
        self: &Arc<Self>,
        symbol: String,
        timeframe: Timeframe,
        bars: mpsc::Receiver<PriceBar>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(feed::run_feed(Arc::clone(self), symbol, timeframe, bars, shutdown))
    }
}
