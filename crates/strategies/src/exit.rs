use crate::tunnel;
use configuration::VegasTunnelParams;
use core_types::{PriceBar, SignalType, Timeframe, TradingSignal};
use tracing::debug;
use uuid::Uuid;

/// Trailing exit on the fast short EMA.
///
/// A long is closed once the latest fast close drops below the short EMA, a
/// short once it rises above it. The exit is reported as a take-profit with the
/// configured fixed confidence. Returns `None` while the fast tunnel is still
/// warming up or the trend line holds.
pub fn trailing_exit(
    params: &VegasTunnelParams,
    symbol: &str,
    timeframe: Timeframe,
    bars: &[PriceBar],
    is_long: bool,
) -> Option<TradingSignal> {
    let state = tunnel::latest(bars, &params.fast)?;
    let bar = bars.last()?;

    let broken = if is_long {
        state.close < state.ema_short
    } else {
        state.close > state.ema_short
    };
    if !broken {
        return None;
    }

    debug!(symbol, is_long, close = %state.close, ema = %state.ema_short, "Trailing exit triggered");
    Some(TradingSignal {
        signal_id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        signal_type: SignalType::TakeProfitExit,
        price: state.close,
        stop_loss: None,
        take_profit: None,
        confidence: params.exit_confidence,
        reason: format!(
            "{} close {} EMA{}",
            timeframe,
            if is_long { "fell below" } else { "rose above" },
            params.fast.short
        ),
        timestamp: bar.open_time + timeframe.duration(),
        timeframe,
    })
}
