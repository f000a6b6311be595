//! End-to-end entry and exit decisions on hand-built bar series.
//!
//! Every series uses short tunnel periods (2 / 4,5 / 8,9) so the expected EMA
//! values can be checked by hand: on a linear series an SMA-seeded EMA of
//! period `p` trails the close by exactly `(p - 1) / 2` per unit slope.

use chrono::{TimeZone, Utc};
use configuration::{TunnelPeriods, VegasTunnelParams};
use core_types::{PriceBar, SignalType, Timeframe, TrendDirection};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategies::{MarketView, SetupPhase, VegasTunnel};

const SYMBOL: &str = "BTCUSDT";

fn params() -> VegasTunnelParams {
    let periods = TunnelPeriods {
        short: 2,
        mid_a: 4,
        mid_b: 5,
        long_a: 8,
        long_b: 9,
    };
    VegasTunnelParams {
        fast: periods,
        slow: periods,
        ..VegasTunnelParams::default()
    }
}

fn strategy() -> VegasTunnel {
    VegasTunnel::new(params()).unwrap()
}

fn series(step_secs: i64, closes: &[Decimal]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            symbol: SYMBOL.to_string(),
            open_time: Utc.timestamp_opt(1_700_000_000 + i as i64 * step_secs, 0).unwrap(),
            open: close,
            high: close + dec!(1),
            low: close - dec!(1),
            close,
            volume: dec!(5),
            closed: true,
        })
        .collect()
}

fn fast(closes: &[Decimal]) -> Vec<PriceBar> {
    series(15 * 60, closes)
}

fn slow(closes: &[Decimal]) -> Vec<PriceBar> {
    series(4 * 3600, closes)
}

fn linear(start: i64, step: i64, n: i64) -> Vec<Decimal> {
    (0..n).map(|i| Decimal::from(start + step * i)).collect()
}

fn view<'a>(fast: &'a [PriceBar], slow: &'a [PriceBar]) -> MarketView<'a> {
    MarketView {
        symbol: SYMBOL,
        fast_timeframe: Timeframe::M15,
        slow_timeframe: Timeframe::H4,
        fast,
        slow,
    }
}

fn assert_close(actual: Decimal, expected: Decimal) {
    assert!(
        (actual - expected).abs() < dec!(0.0001),
        "expected {expected}, got {actual}"
    );
}

/// Slow uptrend; fast rallies to 159, dips to 156 and closes back at 157.
fn bullish_pullback() -> (Vec<PriceBar>, Vec<PriceBar>) {
    let mut closes = linear(100, 1, 60);
    closes.extend([dec!(156), dec!(157)]);
    (fast(&closes), slow(&linear(100, 1, 30)))
}

/// Mirror image: slow downtrend; fast falls to 241, bounces to 244 and closes at 243.
fn bearish_rally() -> (Vec<PriceBar>, Vec<PriceBar>) {
    let mut closes = linear(300, -1, 60);
    closes.extend([dec!(244), dec!(243)]);
    (fast(&closes), slow(&linear(300, -1, 30)))
}

#[test]
fn bullish_pullback_triggers_a_buy() {
    let (fast, slow) = bullish_pullback();
    let assessment = strategy().assess(&view(&fast, &slow));
    assert_eq!(assessment.phase, SetupPhase::Triggered);
    assert_eq!(assessment.bias, TrendDirection::Bullish);

    let signal = assessment.signal.unwrap();
    assert_eq!(signal.signal_type, SignalType::Buy);
    assert_eq!(signal.symbol, SYMBOL);
    assert_eq!(signal.price, dec!(157));
    assert_eq!(signal.timeframe, Timeframe::M15);
    // Stop just under the fast mid tunnel lower bound (EMA5 = 156.78).
    let stop = signal.stop_loss.unwrap();
    let target = signal.take_profit.unwrap();
    assert_close(stop, dec!(156.464222));
    assert_close(target, dec!(158.071555));
    assert!(stop < signal.price && signal.price < target);
    assert_close(target - signal.price, (signal.price - stop) * dec!(2));
    assert_eq!(signal.confidence, dec!(0.9));
    assert!(signal.reason.contains("4h tunnels bullish"));
    assert!(signal.reason.contains("closed above EMA2"));
    assert_eq!(signal.timestamp, fast.last().unwrap().open_time + Timeframe::M15.duration());
}

#[test]
fn bearish_rally_triggers_a_sell() {
    let (fast, slow) = bearish_rally();
    let signal = strategy().evaluate(&view(&fast, &slow)).unwrap();

    assert_eq!(signal.signal_type, SignalType::Sell);
    assert_eq!(signal.price, dec!(243));
    let stop = signal.stop_loss.unwrap();
    let target = signal.take_profit.unwrap();
    // Stop just above the fast mid tunnel upper bound (EMA4 = 243.22).
    assert_close(stop, dec!(243.708667));
    assert_close(target, dec!(241.582667));
    assert!(target < signal.price && signal.price < stop);
    assert_eq!(signal.confidence, dec!(0.9));
}

#[test]
fn pullback_without_momentum_waits() {
    // The dip bar itself (156) is below EMA2 and outside the tunnels.
    let (fast, slow) = bullish_pullback();
    let dip = &fast[..fast.len() - 1];
    let assessment = strategy().assess(&view(dip, &slow));
    assert_eq!(assessment.phase, SetupPhase::AwaitingPullback);
    assert!(assessment.signal.is_none());

    // The bounce bar (244) touches the long tunnel but closes above EMA2.
    let (fast, slow) = bearish_rally();
    let bounce = &fast[..fast.len() - 1];
    let assessment = strategy().assess(&view(bounce, &slow));
    assert_eq!(assessment.phase, SetupPhase::AwaitingPullback);
    assert_eq!(assessment.bias, TrendDirection::Bearish);
}

#[test]
fn extended_trend_is_not_a_pullback() {
    let fast = fast(&linear(100, 1, 60));
    let slow = slow(&linear(100, 1, 30));
    let assessment = strategy().assess(&view(&fast, &slow));
    assert_eq!(assessment.phase, SetupPhase::AwaitingPullback);
    assert!(assessment.signal.is_none());
}

#[test]
fn flat_market_never_signals() {
    let fast = fast(&[dec!(100); 40]);
    let slow = slow(&[dec!(100); 40]);
    let assessment = strategy().assess(&view(&fast, &slow));
    assert_eq!(assessment.phase, SetupPhase::Idle);
    assert_eq!(assessment.bias, TrendDirection::Sideways);
    assert!(assessment.signal.is_none());
}

#[test]
fn fast_trend_alone_is_not_enough() {
    let (fast, _) = bullish_pullback();
    let slow = slow(&[dec!(100); 30]);
    assert!(strategy().evaluate(&view(&fast, &slow)).is_none());
}

#[test]
fn stale_slow_close_does_not_block_a_fresh_entry() {
    let (fast, _) = bullish_pullback();
    let mut closes = linear(100, 1, 30);
    // Still classified bullish, with the slow close (126) under its own mid tunnel (126.67).
    closes.push(dec!(126));
    let slow = slow(&closes);

    let signal = strategy().evaluate(&view(&fast, &slow)).unwrap();
    assert_eq!(signal.signal_type, SignalType::Buy);
    assert_close(signal.stop_loss.unwrap(), dec!(156.464222));
}

#[test]
fn price_below_slow_mid_tunnel_blocks_a_buy() {
    // Same pullback shape, 40 lower: a valid fast setup at 117, under the slow mid tunnel (127).
    let mut closes = linear(60, 1, 60);
    closes.extend([dec!(116), dec!(117)]);
    let fast = fast(&closes);
    let slow = slow(&linear(100, 1, 30));

    let assessment = strategy().assess(&view(&fast, &slow));
    assert_eq!(assessment.phase, SetupPhase::Idle);
    assert_eq!(assessment.bias, TrendDirection::Bullish);
    assert!(assessment.signal.is_none());
}

#[test]
fn price_above_slow_mid_tunnel_blocks_a_sell() {
    // Bearish rally shape, 40 higher: a valid fast setup at 283, above the slow mid tunnel (273).
    let mut closes = linear(340, -1, 60);
    closes.extend([dec!(284), dec!(283)]);
    let fast = fast(&closes);
    let slow = slow(&linear(300, -1, 30));

    let assessment = strategy().assess(&view(&fast, &slow));
    assert_eq!(assessment.phase, SetupPhase::Idle);
    assert_eq!(assessment.bias, TrendDirection::Bearish);
}

#[test]
fn insufficient_history_is_not_ready() {
    let (fast, slow) = bullish_pullback();
    let assessment = strategy().assess(&view(&fast, &slow[..8]));
    assert_eq!(assessment.phase, SetupPhase::NotReady);
    assert_eq!(assessment.bias, TrendDirection::None);

    let assessment = strategy().assess(&view(&fast[..8], &slow));
    assert_eq!(assessment.phase, SetupPhase::NotReady);
    assert_eq!(assessment.bias, TrendDirection::Bullish);

    assert!(strategy().evaluate(&view(&[], &[])).is_none());
}

#[test]
fn trailing_exit_follows_position_side() {
    let (fast, _) = bullish_pullback();
    let dip = &fast[..fast.len() - 1];
    let strategy = strategy();

    let exit = strategy
        .check_trailing_exit(SYMBOL, Timeframe::M15, dip, true)
        .unwrap();
    assert_eq!(exit.signal_type, SignalType::TakeProfitExit);
    assert_eq!(exit.price, dec!(156));
    assert_eq!(exit.confidence, dec!(0.9));
    assert!(strategy.check_trailing_exit(SYMBOL, Timeframe::M15, dip, false).is_none());

    let rising = self::fast(&linear(100, 1, 30));
    assert!(strategy.check_trailing_exit(SYMBOL, Timeframe::M15, &rising, true).is_none());
    assert!(strategy.check_trailing_exit(SYMBOL, Timeframe::M15, &rising, false).is_some());
}
