use crate::error::ConfigError;
use core_types::Timeframe;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub live: LiveConfig,
    #[serde(default)]
    pub series: SeriesConfig,
    #[serde(default)]
    pub strategies: Strategies,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parameters for the live market-data loop and the bots it drives.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// When false the feed connects to the exchange testnet and orders are only logged.
    #[serde(default)]
    pub live_trading_enabled: bool,
    /// The tactical entry timeframe. Every closed bar here triggers an evaluation.
    #[serde(default = "default_fast_timeframe")]
    pub fast_timeframe: Timeframe,
    /// The macro trend filter timeframe.
    #[serde(default = "default_slow_timeframe")]
    pub slow_timeframe: Timeframe,
    /// Entry signals below this confidence are discarded.
    #[serde(default)]
    pub min_confidence: Decimal,
    /// Delay between opening a position and placing its stop-loss/take-profit orders.
    #[serde(default = "default_protective_order_delay_secs")]
    pub protective_order_delay_secs: u64,
    pub bots: Vec<LiveBotConfig>,
}

/// Binds one symbol to a registered strategy.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveBotConfig {
    /// Stored upper-cased, as the exchange reports it.
    #[serde(deserialize_with = "uppercase_symbol")]
    pub symbol: String,
    #[serde(default = "default_strategy_name")]
    pub strategy: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Ring sizes for the per-symbol bar history.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    #[serde(default = "default_fast_capacity")]
    pub fast_capacity: usize,
    #[serde(default = "default_slow_capacity")]
    pub slow_capacity: usize,
}

/// Contains the parameter sets for all available strategies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Strategies {
    #[serde(default)]
    pub vegas_tunnel: VegasTunnelParams,
}

/// The five EMA periods of one timeframe's tunnel set.
///
/// `short` is the momentum line, `mid_a`/`mid_b` form the mid tunnel and
/// `long_a`/`long_b` the long tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelPeriods {
    pub short: usize,
    pub mid_a: usize,
    pub mid_b: usize,
    pub long_a: usize,
    pub long_b: usize,
}

impl TunnelPeriods {
    /// The number of bars needed before the first tunnel snapshot is defined.
    ///
    /// For a valid set this is the longer of the two long-tunnel periods.
    pub fn warmup(&self) -> usize {
        [self.short, self.mid_a, self.mid_b, self.long_a, self.long_b]
            .into_iter()
            .max()
            .unwrap_or(0)
    }
}

impl Default for TunnelPeriods {
    fn default() -> Self {
        Self {
            short: 12,
            mid_a: 144,
            mid_b: 169,
            long_a: 288,
            long_b: 338,
        }
    }
}

/// Parameters for the dual-timeframe Vegas tunnel strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegasTunnelParams {
    /// Tunnel set evaluated on the fast (entry) timeframe.
    #[serde(default)]
    pub fast: TunnelPeriods,
    /// Tunnel set evaluated on the slow (trend filter) timeframe.
    #[serde(default)]
    pub slow: TunnelPeriods,
    /// How far outside a tunnel band a close may sit and still count as a pullback into it.
    #[serde(default = "default_pullback_tolerance_pct")]
    pub pullback_tolerance_pct: Decimal,
    /// Offset applied to the tunnel bound when placing the stop.
    #[serde(default = "default_stop_buffer_pct")]
    pub stop_buffer_pct: Decimal,
    /// Relative gap between the slow mid and long tunnels that earns the separation bonus.
    #[serde(default = "default_separation_margin_pct")]
    pub separation_margin_pct: Decimal,
    #[serde(default = "default_risk_reward_ratio")]
    pub risk_reward_ratio: Decimal,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    /// Fixed confidence reported on trailing exit signals.
    #[serde(default = "default_exit_confidence")]
    pub exit_confidence: Decimal,
}

impl Default for VegasTunnelParams {
    fn default() -> Self {
        Self {
            fast: TunnelPeriods::default(),
            slow: TunnelPeriods::default(),
            pullback_tolerance_pct: default_pullback_tolerance_pct(),
            stop_buffer_pct: default_stop_buffer_pct(),
            separation_margin_pct: default_separation_margin_pct(),
            risk_reward_ratio: default_risk_reward_ratio(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            exit_confidence: default_exit_confidence(),
        }
    }
}

/// Where and how verbosely the application logs.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

// --- Default Implementations ---
// This allows a user to omit whole sections from their toml
// and still have it work with sensible defaults.

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            fast_capacity: default_fast_capacity(),
            slow_capacity: default_slow_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

fn uppercase_symbol<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|symbol| symbol.trim().to_ascii_uppercase())
}

fn default_fast_timeframe() -> Timeframe {
    Timeframe::M15
}
fn default_slow_timeframe() -> Timeframe {
    Timeframe::H4
}
fn default_protective_order_delay_secs() -> u64 {
    2
}
fn default_strategy_name() -> String {
    "vegas_tunnel".to_string()
}
fn default_true() -> bool {
    true
}
fn default_fast_capacity() -> usize {
    1000
}
fn default_slow_capacity() -> usize {
    500
}
fn default_pullback_tolerance_pct() -> Decimal {
    dec!(0.002)
}
fn default_stop_buffer_pct() -> Decimal {
    dec!(0.002)
}
fn default_separation_margin_pct() -> Decimal {
    dec!(0.002)
}
fn default_risk_reward_ratio() -> Decimal {
    dec!(2.0)
}
fn default_stop_loss_pct() -> Decimal {
    dec!(0.02)
}
fn default_take_profit_pct() -> Decimal {
    dec!(0.04)
}
fn default_exit_confidence() -> Decimal {
    dec!(0.9)
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file_prefix() -> String {
    "vegas.log".to_string()
}

impl Config {
    /// Checks the cross-section rules that serde cannot express.
    ///
    /// Strategy parameters themselves are validated when the strategy is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let live = &self.live;

        if live.fast_timeframe >= live.slow_timeframe {
            return Err(ConfigError::ValidationError(format!(
                "fast_timeframe ({}) must be shorter than slow_timeframe ({})",
                live.fast_timeframe, live.slow_timeframe
            )));
        }

        if live.min_confidence < Decimal::ZERO || live.min_confidence > Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "min_confidence must be between 0 and 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for bot in &live.bots {
            if bot.symbol.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "bot symbol cannot be empty".to_string(),
                ));
            }
            if !seen.insert(bot.symbol.to_uppercase()) {
                return Err(ConfigError::ValidationError(format!(
                    "bot symbol '{}' is configured more than once",
                    bot.symbol
                )));
            }
        }
        if !live.bots.iter().any(|b| b.enabled) {
            return Err(ConfigError::ValidationError(
                "at least one bot must be enabled".to_string(),
            ));
        }

        let params = &self.strategies.vegas_tunnel;
        if self.series.fast_capacity < params.fast.warmup() {
            return Err(ConfigError::ValidationError(format!(
                "series.fast_capacity ({}) is smaller than the longest fast EMA period ({})",
                self.series.fast_capacity,
                params.fast.warmup()
            )));
        }
        if self.series.slow_capacity < params.slow.warmup() {
            return Err(ConfigError::ValidationError(format!(
                "series.slow_capacity ({}) is smaller than the longest slow EMA period ({})",
                self.series.slow_capacity,
                params.slow.warmup()
            )));
        }

        Ok(())
    }

    /// The ring size configured for a timeframe; unknown timeframes get the fast capacity.
    pub fn capacity_for(&self, timeframe: Timeframe) -> usize {
        if timeframe == self.live.slow_timeframe {
            self.series.slow_capacity
        } else {
            self.series.fast_capacity
        }
    }

    pub fn enabled_bots(&self) -> impl Iterator<Item = &LiveBotConfig> {
        self.live.bots.iter().filter(|b| b.enabled)
    }
}
