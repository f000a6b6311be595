use crate::error::EngineError;
use crate::positions::PositionBook;
use chrono::Utc;
use configuration::Config;
use core_types::{OpenPosition, PriceBar, Timeframe, TradingSignal};
use events::{BarRejected, EngineEvent, LogLevel, LogMessage};
use rust_decimal::Decimal;
use series_store::{AppendOutcome, SeriesStore};
use std::collections::HashMap;
use std::sync::Arc;
use strategies::{Assessment, MarketView, StrategyRegistry, TunnelState, VegasTunnel, tunnel};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A symbol bound to the strategy that trades it.
#[derive(Debug, Clone)]
pub struct Bot {
    pub symbol: String,
    pub strategy_name: String,
    pub strategy: Arc<VegasTunnel>,
}

/// The synchronous heart of the engine: bar ingestion plus the entry, exit and
/// introspection queries for every configured symbol.
///
/// All methods take `&self`; the bar history lives in a concurrent
/// [`SeriesStore`], so one `Arc<TradingCore>` is shared by every feed task.
pub struct TradingCore {
    fast_timeframe: Timeframe,
    slow_timeframe: Timeframe,
    min_confidence: Decimal,
    store: SeriesStore,
    bots: HashMap<String, Bot>,
    positions: PositionBook,
    events: broadcast::Sender<EngineEvent>,
}

impl TradingCore {
    /// Builds one bot per enabled symbol, resolving its strategy from `registry`.
    pub fn new(
        config: &Config,
        registry: &StrategyRegistry,
        events: broadcast::Sender<EngineEvent>,
    ) -> Result<Self, EngineError> {
        let live = &config.live;
        let store = SeriesStore::new(config.series.fast_capacity)
            .with_capacity(live.fast_timeframe, config.capacity_for(live.fast_timeframe))
            .with_capacity(live.slow_timeframe, config.capacity_for(live.slow_timeframe));

        let mut bots = HashMap::new();
        for bot in config.enabled_bots() {
            let strategy = registry.get(&bot.strategy)?;
            // Exchange streams report symbols in upper case.
            let symbol = canonical(&bot.symbol);
            tracing::info!(%symbol, strategy = %bot.strategy, "Loaded bot");
            bots.insert(
                symbol.clone(),
                Bot {
                    symbol,
                    strategy_name: bot.strategy.clone(),
                    strategy,
                },
            );
        }

        Ok(Self {
            fast_timeframe: live.fast_timeframe,
            slow_timeframe: live.slow_timeframe,
            min_confidence: live.min_confidence,
            store,
            bots,
            positions: PositionBook::new(),
            events,
        })
    }

    pub fn fast_timeframe(&self) -> Timeframe {
        self.fast_timeframe
    }

    pub fn slow_timeframe(&self) -> Timeframe {
        self.slow_timeframe
    }

    /// Configured symbols in sorted order.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.bots.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Looks up a bot by symbol, ignoring case.
    pub fn bot(&self, symbol: &str) -> Result<&Bot, EngineError> {
        self.bots
            .get(&canonical(symbol))
            .ok_or_else(|| EngineError::BotNotFound(symbol.to_string()))
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// A handle on the event channel for components that report alongside the core.
    pub fn event_sender(&self) -> broadcast::Sender<EngineEvent> {
        self.events.clone()
    }

    /// Broadcasts a human-readable `Log` event for notifiers.
    pub fn notify(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(EngineEvent::Log(LogMessage::new(level, message)));
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Ingests one bar from the `(symbol, timeframe)` subscription.
    ///
    /// Unclosed bars come back as `Ignored`. A rejected bar is logged, reported
    /// as a `BarRejected` event and returned as an error; the series is left
    /// untouched and the feed should carry on.
    pub fn on_closed_bar(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        mut bar: PriceBar,
    ) -> Result<AppendOutcome, EngineError> {
        let symbol = self.bot(symbol)?.symbol.as_str();
        if timeframe != self.fast_timeframe && timeframe != self.slow_timeframe {
            return Err(EngineError::UnsupportedTimeframe(timeframe));
        }

        let open_time = bar.open_time;
        let result = if !bar.symbol.eq_ignore_ascii_case(symbol) {
            Err(EngineError::SymbolMismatch {
                expected: symbol.to_string(),
                received: bar.symbol.clone(),
            })
        } else {
            bar.symbol = symbol.to_string();
            self.store.append(timeframe, bar).map_err(EngineError::from)
        };

        if let Err(e) = &result {
            tracing::warn!(symbol, %timeframe, error = %e, "Rejected bar");
            self.emit(EngineEvent::BarRejected(BarRejected {
                symbol: symbol.to_string(),
                timeframe,
                open_time,
                reason: e.to_string(),
            }));
        }
        result
    }

    fn market<'a>(&self, symbol: &'a str, fast: &'a [PriceBar], slow: &'a [PriceBar]) -> MarketView<'a> {
        MarketView {
            symbol,
            fast_timeframe: self.fast_timeframe,
            slow_timeframe: self.slow_timeframe,
            fast,
            slow,
        }
    }

    /// Where the symbol's entry setup stands on its latest fast bar.
    pub fn assess(&self, symbol: &str) -> Result<Assessment, EngineError> {
        let bot = self.bot(symbol)?;
        let fast = self.store.snapshot(&bot.symbol, self.fast_timeframe);
        let slow = self.store.snapshot(&bot.symbol, self.slow_timeframe);
        Ok(bot.strategy.assess(&self.market(&bot.symbol, &fast, &slow)))
    }

    /// Requests a fresh entry decision for `symbol`.
    ///
    /// Signals below the configured minimum confidence are dropped. Emitted
    /// signals are also broadcast as `SignalEmitted`.
    pub fn evaluate(&self, symbol: &str) -> Result<Option<TradingSignal>, EngineError> {
        let Some(signal) = self.assess(symbol)?.signal else {
            return Ok(None);
        };
        if signal.confidence < self.min_confidence {
            tracing::info!(
                symbol,
                confidence = %signal.confidence,
                min_confidence = %self.min_confidence,
                "Signal below minimum confidence; dropped"
            );
            return Ok(None);
        }

        tracing::info!(
            symbol,
            signal_type = %signal.signal_type,
            price = %signal.price,
            stop_loss = ?signal.stop_loss,
            take_profit = ?signal.take_profit,
            confidence = %signal.confidence,
            "Entry signal"
        );
        self.emit(EngineEvent::SignalEmitted(signal.clone()));
        Ok(Some(signal))
    }

    /// Trailing-exit check for a position in `symbol`.
    pub fn check_exit(&self, symbol: &str, is_long: bool) -> Result<Option<TradingSignal>, EngineError> {
        let bot = self.bot(symbol)?;
        let symbol = bot.symbol.as_str();
        let fast = self.store.snapshot(symbol, self.fast_timeframe);
        let signal = bot
            .strategy
            .check_trailing_exit(symbol, self.fast_timeframe, &fast, is_long);

        if let Some(signal) = &signal {
            tracing::info!(symbol, is_long, price = %signal.price, "Exit signal");
            self.emit(EngineEvent::SignalEmitted(signal.clone()));
        }
        Ok(signal)
    }

    /// The tunnel snapshot of the latest bar on `timeframe`, `None` while warming up.
    pub fn tunnel_state(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<TunnelState>, EngineError> {
        let bot = self.bot(symbol)?;
        let params = bot.strategy.params();
        let periods = if timeframe == self.fast_timeframe {
            &params.fast
        } else if timeframe == self.slow_timeframe {
            &params.slow
        } else {
            return Err(EngineError::UnsupportedTimeframe(timeframe));
        };
        let bars = self.store.snapshot(&bot.symbol, timeframe);
        Ok(tunnel::latest(&bars, periods))
    }

    pub fn series_len(&self, symbol: &str, timeframe: Timeframe) -> usize {
        self.store.len(&canonical(symbol), timeframe)
    }

    /// Records the position opened by an entry signal and returns it.
    pub fn open_position(&self, signal: &TradingSignal, quantity: Decimal) -> Result<OpenPosition, EngineError> {
        let bot = self.bot(&signal.symbol)?;
        let side = signal
            .signal_type
            .entry_side()
            .ok_or_else(|| EngineError::InvalidSignal(format!("{} is not an entry", signal.signal_type)))?;

        let position = OpenPosition {
            position_id: Uuid::new_v4(),
            symbol: bot.symbol.clone(),
            side,
            quantity,
            entry_price: signal.price,
            opened_at: Utc::now(),
        };
        if let Some(previous) = self.positions.open(position.clone()) {
            tracing::warn!(symbol = %previous.symbol, position_id = %previous.position_id, "Replaced an open position");
        }
        Ok(position)
    }

    pub fn close_position(&self, symbol: &str) -> Option<OpenPosition> {
        self.positions.close(&canonical(symbol))
    }
}

fn canonical(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}
