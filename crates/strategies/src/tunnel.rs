//! Tunnel classification.
//!
//! A tunnel is the band between two EMAs. Each timeframe carries a mid tunnel,
//! a long tunnel and a short momentum EMA; the relative position of the two
//! bands decides the trend direction of a bar.

use crate::indicators::ema;
use configuration::TunnelPeriods;
use core_types::{PriceBar, TrendDirection};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The closed interval spanned by two EMA values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub upper: Decimal,
    pub lower: Decimal,
}

impl Band {
    pub fn from_pair(a: Decimal, b: Decimal) -> Self {
        Self {
            upper: a.max(b),
            lower: a.min(b),
        }
    }

    /// True when `price` lies inside the band widened by `tolerance` (a fraction) on each side.
    pub fn contains_with_tolerance(&self, price: Decimal, tolerance: Decimal) -> bool {
        price >= self.lower * (Decimal::ONE - tolerance)
            && price <= self.upper * (Decimal::ONE + tolerance)
    }
}

/// The five EMA values of one bar, the two bands they form, and the resulting trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelState {
    pub close: Decimal,
    pub ema_short: Decimal,
    pub ema_mid_a: Decimal,
    pub ema_mid_b: Decimal,
    pub ema_long_a: Decimal,
    pub ema_long_b: Decimal,
    pub mid: Band,
    pub long: Band,
    pub direction: TrendDirection,
}

/// Bullish when the whole mid band sits strictly above the long band, bearish
/// when strictly below. Any overlap or touch is sideways.
pub fn classify_direction(mid: &Band, long: &Band) -> TrendDirection {
    if mid.lower > long.upper {
        TrendDirection::Bullish
    } else if mid.upper < long.lower {
        TrendDirection::Bearish
    } else {
        TrendDirection::Sideways
    }
}

/// Computes a tunnel snapshot for every bar.
///
/// Entries are `None` until every EMA is defined, i.e. before index
/// `periods.warmup() - 1`. An invalid period set (any zero period) or a series
/// shorter than the warmup yields all `None`.
pub fn classify(bars: &[PriceBar], periods: &TunnelPeriods) -> Vec<Option<TunnelState>> {
    let mut states = vec![None; bars.len()];
    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();

    let (Some(short), Some(mid_a), Some(mid_b), Some(long_a), Some(long_b)) = (
        ema(&closes, periods.short),
        ema(&closes, periods.mid_a),
        ema(&closes, periods.mid_b),
        ema(&closes, periods.long_a),
        ema(&closes, periods.long_b),
    ) else {
        return states;
    };

    for (i, state) in states.iter_mut().enumerate() {
        let (Some(s), Some(ma), Some(mb), Some(la), Some(lb)) =
            (short[i], mid_a[i], mid_b[i], long_a[i], long_b[i])
        else {
            continue;
        };
        let mid = Band::from_pair(ma, mb);
        let long = Band::from_pair(la, lb);
        *state = Some(TunnelState {
            close: closes[i],
            ema_short: s,
            ema_mid_a: ma,
            ema_mid_b: mb,
            ema_long_a: la,
            ema_long_b: lb,
            mid,
            long,
            direction: classify_direction(&mid, &long),
        });
    }

    states
}

/// The snapshot of the most recent bar, if enough history exists to compute it.
pub fn latest(bars: &[PriceBar], periods: &TunnelPeriods) -> Option<TunnelState> {
    if bars.len() < periods.warmup() {
        return None;
    }
    classify(bars, periods).pop().flatten()
}
