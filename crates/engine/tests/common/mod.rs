#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use configuration::{
    Config, LiveBotConfig, LiveConfig, LoggingConfig, SeriesConfig, Strategies, TunnelPeriods,
    VegasTunnelParams,
};
use core_types::{PriceBar, Timeframe};
use engine::TradingCore;
use events::EngineEvent;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategies::StrategyRegistry;
use tokio::sync::broadcast;

pub const SYMBOL: &str = "BTCUSDT";

pub fn config() -> Config {
    let periods = TunnelPeriods {
        short: 2,
        mid_a: 4,
        mid_b: 5,
        long_a: 8,
        long_b: 9,
    };
    Config {
        live: LiveConfig {
            live_trading_enabled: false,
            fast_timeframe: Timeframe::M15,
            slow_timeframe: Timeframe::H4,
            min_confidence: Decimal::ZERO,
            protective_order_delay_secs: 2,
            bots: vec![
                LiveBotConfig {
                    symbol: SYMBOL.to_string(),
                    strategy: "vegas_tunnel".to_string(),
                    enabled: true,
                },
                LiveBotConfig {
                    symbol: "ETHUSDT".to_string(),
                    strategy: "vegas_tunnel".to_string(),
                    enabled: true,
                },
            ],
        },
        series: SeriesConfig::default(),
        strategies: Strategies {
            vegas_tunnel: VegasTunnelParams {
                fast: periods,
                slow: periods,
                ..VegasTunnelParams::default()
            },
        },
        logging: LoggingConfig::default(),
    }
}

pub fn setup_with(config: &Config) -> (TradingCore, broadcast::Receiver<EngineEvent>) {
    let registry = StrategyRegistry::from_config(&config.strategies).unwrap();
    let (tx, rx) = broadcast::channel(1024);
    (TradingCore::new(config, &registry, tx).unwrap(), rx)
}

pub fn setup() -> (TradingCore, broadcast::Receiver<EngineEvent>) {
    setup_with(&config())
}

fn open_time(timeframe: Timeframe, i: usize) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + timeframe.duration() * i as i32
}

pub fn bar(timeframe: Timeframe, i: usize, close: Decimal) -> PriceBar {
    PriceBar {
        symbol: SYMBOL.to_string(),
        open_time: open_time(timeframe, i),
        open: close,
        high: close + dec!(1),
        low: close - dec!(1),
        close,
        volume: dec!(3),
        closed: true,
    }
}

pub fn bars(timeframe: Timeframe, closes: &[Decimal]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| bar(timeframe, i, close))
        .collect()
}

pub fn linear(start: i64, step: i64, n: i64) -> Vec<Decimal> {
    (0..n).map(|i| Decimal::from(start + step * i)).collect()
}

/// Fast closes for a rally to 159, a dip to 156 and a bounce to 157.
pub fn bullish_pullback_closes() -> Vec<Decimal> {
    let mut closes = linear(100, 1, 60);
    closes.extend([dec!(156), dec!(157)]);
    closes
}

/// Fast closes for a slide to 241, a bounce to 244 and a close at 243.
pub fn bearish_rally_closes() -> Vec<Decimal> {
    let mut closes = linear(300, -1, 60);
    closes.extend([dec!(244), dec!(243)]);
    closes
}

pub fn feed_slow(core: &TradingCore, closes: &[Decimal]) {
    for bar in bars(Timeframe::H4, closes) {
        core.on_closed_bar(SYMBOL, Timeframe::H4, bar).unwrap();
    }
}

pub fn feed_fast(core: &TradingCore, closes: &[Decimal]) {
    for bar in bars(Timeframe::M15, closes) {
        core.on_closed_bar(SYMBOL, Timeframe::M15, bar).unwrap();
    }
}

pub fn assert_close(actual: Decimal, expected: Decimal) {
    assert!(
        (actual - expected).abs() < dec!(0.0001),
        "expected {expected}, got {actual}"
    );
}
