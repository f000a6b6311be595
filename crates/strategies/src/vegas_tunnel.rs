use crate::error::StrategyError;
use crate::exit;
use crate::tunnel::{self, TunnelState};
use configuration::{TunnelPeriods, VegasTunnelParams};
use core_types::{OrderSide, PriceBar, SignalType, Timeframe, TradingSignal, TrendDirection};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

const BASE_CONFIDENCE: Decimal = dec!(0.6);
const SEPARATION_BONUS: Decimal = dec!(0.2);
const MOMENTUM_BONUS: Decimal = dec!(0.1);

/// The bar history one evaluation looks at.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    pub symbol: &'a str,
    pub fast_timeframe: Timeframe,
    pub slow_timeframe: Timeframe,
    /// Closed fast-timeframe bars, oldest first. The last one is the bar being evaluated.
    pub fast: &'a [PriceBar],
    /// Closed slow-timeframe bars, oldest first.
    pub slow: &'a [PriceBar],
}

/// How far a symbol is from an entry on the latest fast bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupPhase {
    /// One of the timeframes does not have enough history yet.
    NotReady,
    /// The slow timeframe is not trending, or price has left the slow mid tunnel.
    Idle,
    /// The macro trend is confirmed; waiting for a pullback into a fast tunnel and a momentum close.
    AwaitingPullback,
    Triggered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub phase: SetupPhase,
    /// Direction of the slow tunnel, `None` when it could not be classified.
    pub bias: TrendDirection,
    /// Present exactly when `phase` is `Triggered`.
    pub signal: Option<TradingSignal>,
}

impl Assessment {
    fn waiting(phase: SetupPhase, bias: TrendDirection) -> Self {
        Self {
            phase,
            bias,
            signal: None,
        }
    }
}

/// Static description of a configured strategy, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub params: VegasTunnelParams,
    /// Bars needed on each timeframe before the strategy can evaluate.
    pub fast_warmup: usize,
    pub slow_warmup: usize,
}

/// The dual-timeframe Vegas tunnel strategy.
///
/// The slow timeframe decides the trend: a long setup needs its mid tunnel
/// strictly above its long tunnel and the current fast close above the slow
/// mid tunnel (mirrored for shorts). The fast timeframe decides the timing: its
/// close must have pulled back into (or within tolerance of) either fast tunnel
/// and closed back on the trend side of the short EMA.
///
/// The strategy is stateless. Every call recomputes the tunnels from the bars it
/// is given, so one instance can be shared across symbols and threads.
#[derive(Debug, Clone)]
pub struct VegasTunnel {
    params: VegasTunnelParams,
}

impl VegasTunnel {
    pub const NAME: &'static str = "vegas_tunnel";

    pub fn new(params: VegasTunnelParams) -> Result<Self, StrategyError> {
        validate_periods("fast", &params.fast)?;
        validate_periods("slow", &params.slow)?;

        let p = &params;
        ensure(
            p.stop_loss_pct > Decimal::ZERO && p.stop_loss_pct <= dec!(0.1),
            "stop_loss_pct must be in (0, 0.1]",
        )?;
        ensure(
            p.take_profit_pct > Decimal::ZERO && p.take_profit_pct <= dec!(0.2),
            "take_profit_pct must be in (0, 0.2]",
        )?;
        ensure(
            p.risk_reward_ratio > Decimal::ONE,
            "risk_reward_ratio must be greater than 1",
        )?;
        ensure(
            p.pullback_tolerance_pct >= Decimal::ZERO && p.pullback_tolerance_pct < dec!(0.1),
            "pullback_tolerance_pct must be in [0, 0.1)",
        )?;
        ensure(
            p.stop_buffer_pct >= Decimal::ZERO && p.stop_buffer_pct < dec!(0.1),
            "stop_buffer_pct must be in [0, 0.1)",
        )?;
        ensure(
            p.separation_margin_pct >= Decimal::ZERO,
            "separation_margin_pct cannot be negative",
        )?;
        ensure(
            p.exit_confidence >= Decimal::ZERO && p.exit_confidence <= Decimal::ONE,
            "exit_confidence must be in [0, 1]",
        )?;

        Ok(Self { params })
    }

    pub fn params(&self) -> &VegasTunnelParams {
        &self.params
    }

    pub fn info(&self) -> StrategyInfo {
        StrategyInfo {
            name: Self::NAME.to_string(),
            params: self.params.clone(),
            fast_warmup: self.params.fast.warmup(),
            slow_warmup: self.params.slow.warmup(),
        }
    }

    /// Runs the entry pipeline on the latest fast bar and reports where it stopped.
    pub fn assess(&self, market: &MarketView<'_>) -> Assessment {
        let p = &self.params;

        let Some(slow) = tunnel::latest(market.slow, &p.slow) else {
            debug!(
                symbol = market.symbol,
                have = market.slow.len(),
                need = p.slow.warmup(),
                "Insufficient slow history"
            );
            return Assessment::waiting(SetupPhase::NotReady, TrendDirection::None);
        };
        let (Some(fast), Some(bar)) = (tunnel::latest(market.fast, &p.fast), market.fast.last())
        else {
            debug!(
                symbol = market.symbol,
                have = market.fast.len(),
                need = p.fast.warmup(),
                "Insufficient fast history"
            );
            return Assessment::waiting(SetupPhase::NotReady, slow.direction);
        };

        if !slow.direction.is_directional() {
            return Assessment::waiting(SetupPhase::Idle, slow.direction);
        }
        let side = match slow.direction {
            TrendDirection::Bearish => OrderSide::Sell,
            _ => OrderSide::Buy,
        };

        // The current fast close is checked against the slow mid tunnel of the latest
        // slow bar, which may be up to one slow interval old.
        let price = fast.close;
        let confirmed = match side {
            OrderSide::Buy => price > slow.mid.lower,
            OrderSide::Sell => price < slow.mid.upper,
        };
        if !confirmed {
            debug!(
                symbol = market.symbol,
                %price,
                slow_mid_lower = %slow.mid.lower,
                slow_mid_upper = %slow.mid.upper,
                "Price is on the wrong side of the slow mid tunnel"
            );
            return Assessment::waiting(SetupPhase::Idle, slow.direction);
        }

        let tolerance = p.pullback_tolerance_pct;
        let touched = if fast.mid.contains_with_tolerance(price, tolerance) {
            "mid"
        } else if fast.long.contains_with_tolerance(price, tolerance) {
            "long"
        } else {
            return Assessment::waiting(SetupPhase::AwaitingPullback, slow.direction);
        };

        let momentum = match side {
            OrderSide::Buy => price > fast.ema_short,
            OrderSide::Sell => price < fast.ema_short,
        };
        if !momentum {
            return Assessment::waiting(SetupPhase::AwaitingPullback, slow.direction);
        }

        let Some((stop_loss, take_profit)) = self.protective_levels(&fast, side, price) else {
            debug!(
                symbol = market.symbol,
                %price,
                "No tunnel bound on the protective side of the trigger; skipping"
            );
            return Assessment::waiting(SetupPhase::AwaitingPullback, slow.direction);
        };

        let (signal_type, verb) = match side {
            OrderSide::Buy => (SignalType::Buy, "closed above"),
            OrderSide::Sell => (SignalType::Sell, "closed below"),
        };
        let signal = TradingSignal {
            signal_id: Uuid::new_v4(),
            symbol: market.symbol.to_string(),
            signal_type,
            price,
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
            confidence: self.confidence(&slow, &fast, side),
            reason: format!(
                "{} tunnels {}; {} retested the {} tunnel and {} EMA{}",
                market.slow_timeframe,
                if side == OrderSide::Buy { "bullish" } else { "bearish" },
                market.fast_timeframe,
                touched,
                verb,
                p.fast.short
            ),
            timestamp: bar.open_time + market.fast_timeframe.duration(),
            timeframe: market.fast_timeframe,
        };
        debug!(symbol = market.symbol, ?signal, "Entry triggered");

        Assessment {
            phase: SetupPhase::Triggered,
            bias: slow.direction,
            signal: Some(signal),
        }
    }

    /// Returns an entry signal for the latest fast bar, if every entry condition holds.
    pub fn evaluate(&self, market: &MarketView<'_>) -> Option<TradingSignal> {
        self.assess(market).signal
    }

    /// Trailing exit for an open position, see [`exit::trailing_exit`].
    pub fn check_trailing_exit(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        fast: &[PriceBar],
        is_long: bool,
    ) -> Option<TradingSignal> {
        exit::trailing_exit(&self.params, symbol, timeframe, fast, is_long)
    }

    /// Stop and target for an entry at `price`.
    ///
    /// The stop sits just beyond the nearest fast tunnel bound on the protective
    /// side of the trigger; the target is `risk_reward_ratio` times that distance
    /// on the other side.
    fn protective_levels(
        &self,
        fast: &TunnelState,
        side: OrderSide,
        price: Decimal,
    ) -> Option<(Decimal, Decimal)> {
        let p = &self.params;
        match side {
            OrderSide::Buy => {
                let level = [fast.mid.lower, fast.long.upper]
                    .into_iter()
                    .filter(|&l| l < price)
                    .max()?;
                let stop = level * (Decimal::ONE - p.stop_buffer_pct);
                (stop < price).then(|| (stop, price + (price - stop) * p.risk_reward_ratio))
            }
            OrderSide::Sell => {
                let level = [fast.mid.upper, fast.long.lower]
                    .into_iter()
                    .filter(|&l| l > price)
                    .min()?;
                let stop = level * (Decimal::ONE + p.stop_buffer_pct);
                (stop > price).then(|| (stop, price - (stop - price) * p.risk_reward_ratio))
            }
        }
    }

    fn confidence(&self, slow: &TunnelState, fast: &TunnelState, side: OrderSide) -> Decimal {
        let margin = self.params.separation_margin_pct;
        let mut confidence = BASE_CONFIDENCE;

        let separated = match side {
            OrderSide::Buy => slow.mid.lower > slow.long.upper * (Decimal::ONE + margin),
            OrderSide::Sell => slow.mid.upper < slow.long.lower * (Decimal::ONE - margin),
        };
        if separated {
            confidence += SEPARATION_BONUS;
        }

        let short_leads = match side {
            OrderSide::Buy => fast.ema_short > fast.mid.lower,
            OrderSide::Sell => fast.ema_short < fast.mid.upper,
        };
        if short_leads {
            confidence += MOMENTUM_BONUS;
        }

        confidence.clamp(Decimal::ZERO, Decimal::ONE)
    }
}

fn ensure(condition: bool, message: &str) -> Result<(), StrategyError> {
    if condition {
        Ok(())
    } else {
        Err(StrategyError::InvalidParameters(message.to_string()))
    }
}

fn validate_periods(label: &str, periods: &TunnelPeriods) -> Result<(), StrategyError> {
    let widest_mid = periods.mid_a.max(periods.mid_b);
    if periods.short == 0 {
        return Err(StrategyError::InvalidParameters(format!(
            "{label} short EMA period must be positive"
        )));
    }
    if periods.mid_a <= periods.short || periods.mid_b <= periods.short {
        return Err(StrategyError::InvalidParameters(format!(
            "{label} mid tunnel periods must be longer than the short EMA ({})",
            periods.short
        )));
    }
    if periods.long_a <= widest_mid || periods.long_b <= widest_mid {
        return Err(StrategyError::InvalidParameters(format!(
            "{label} long tunnel periods must be longer than the mid tunnel ({widest_mid})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunnel::Band;
    use proptest::prelude::*;

    fn state(mid: (Decimal, Decimal), long: (Decimal, Decimal), close: Decimal) -> TunnelState {
        let mid = Band::from_pair(mid.0, mid.1);
        let long = Band::from_pair(long.0, long.1);
        TunnelState {
            close,
            ema_short: close,
            ema_mid_a: mid.upper,
            ema_mid_b: mid.lower,
            ema_long_a: long.upper,
            ema_long_b: long.lower,
            mid,
            long,
            direction: tunnel::classify_direction(&mid, &long),
        }
    }

    #[test]
    fn default_params_are_valid() {
        let strategy = VegasTunnel::new(VegasTunnelParams::default()).unwrap();
        let info = strategy.info();
        assert_eq!(info.name, "vegas_tunnel");
        assert_eq!(info.fast_warmup, 338);
        assert_eq!(info.slow_warmup, 338);
    }

    #[test]
    fn period_ordering_is_enforced() {
        let mut params = VegasTunnelParams::default();
        params.fast.mid_a = 12;
        assert!(matches!(
            VegasTunnel::new(params),
            Err(StrategyError::InvalidParameters(_))
        ));

        let mut params = VegasTunnelParams::default();
        params.slow.long_a = 169;
        let err = VegasTunnel::new(params).unwrap_err();
        assert!(err.to_string().contains("slow long tunnel"));

        let mut params = VegasTunnelParams::default();
        params.fast.short = 0;
        assert!(VegasTunnel::new(params).is_err());
    }

    #[test]
    fn ratio_and_percentages_are_bounded() {
        let cases: [fn(&mut VegasTunnelParams); 6] = [
            |p| p.risk_reward_ratio = dec!(1.0),
            |p| p.stop_loss_pct = dec!(0),
            |p| p.take_profit_pct = dec!(0.25),
            |p| p.pullback_tolerance_pct = dec!(0.1),
            |p| p.stop_buffer_pct = dec!(-0.001),
            |p| p.exit_confidence = dec!(1.5),
        ];
        for mutate in cases {
            let mut params = VegasTunnelParams::default();
            mutate(&mut params);
            assert!(VegasTunnel::new(params).is_err());
        }
    }

    #[test]
    fn stop_uses_nearest_bound_below_a_long_trigger() {
        let strategy = VegasTunnel::new(VegasTunnelParams::default()).unwrap();
        let fast = state((dec!(101), dec!(99)), (dec!(95), dec!(94)), dec!(100));
        let (stop, target) = strategy
            .protective_levels(&fast, OrderSide::Buy, dec!(100))
            .unwrap();
        assert_eq!(stop, dec!(99) * dec!(0.998));
        assert_eq!(target, dec!(100) + (dec!(100) - stop) * dec!(2));
    }

    #[test]
    fn no_bound_on_the_protective_side_means_no_levels() {
        let strategy = VegasTunnel::new(VegasTunnelParams::default()).unwrap();
        // Both candidate bounds sit above the long trigger.
        let fast = state((dec!(103), dec!(102)), (dec!(101), dec!(100.5)), dec!(100));
        assert!(strategy.protective_levels(&fast, OrderSide::Buy, dec!(100)).is_none());
        // And both below the short trigger.
        let fast = state((dec!(99), dec!(98)), (dec!(97), dec!(96)), dec!(100));
        assert!(strategy.protective_levels(&fast, OrderSide::Sell, dec!(100)).is_none());
    }

    #[test]
    fn confidence_drops_the_separation_bonus_for_tight_tunnels() {
        let strategy = VegasTunnel::new(VegasTunnelParams::default()).unwrap();
        let fast = state((dec!(101), dec!(99)), (dec!(95), dec!(94)), dec!(100));
        let wide = state((dec!(110), dec!(108)), (dec!(100), dec!(99)), dec!(111));
        let tight = state((dec!(100.1), dec!(100.05)), (dec!(100), dec!(99)), dec!(101));
        assert_eq!(strategy.confidence(&wide, &fast, OrderSide::Buy), dec!(0.9));
        assert_eq!(strategy.confidence(&tight, &fast, OrderSide::Buy), dec!(0.7));
    }

    fn price() -> impl Strategy<Value = Decimal> {
        (1i64..100_000).prop_map(|v| Decimal::new(v, 1))
    }

    proptest! {
        #[test]
        fn confidence_is_clamped(
            slow in prop::array::uniform5(price()),
            fast in prop::array::uniform5(price()),
            margin in 0i64..50,
            buy in any::<bool>(),
        ) {
            let mut params = VegasTunnelParams::default();
            params.separation_margin_pct = Decimal::new(margin, 3);
            let strategy = VegasTunnel::new(params).unwrap();
            let slow = state((slow[0], slow[1]), (slow[2], slow[3]), slow[4]);
            let fast = state((fast[0], fast[1]), (fast[2], fast[3]), fast[4]);
            let side = if buy { OrderSide::Buy } else { OrderSide::Sell };

            let confidence = strategy.confidence(&slow, &fast, side);
            prop_assert!(confidence >= dec!(0.6) && confidence <= Decimal::ONE);
        }
    }
}
