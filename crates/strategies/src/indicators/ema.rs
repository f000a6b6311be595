use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Exponential moving average of `values` with the given `period`.
///
/// The first defined value sits at index `period - 1` and is the simple average
/// of the first `period` inputs. Every later value follows
/// `ema[i] = ema[i-1] + alpha * (values[i] - ema[i-1])` with `alpha = 2 / (period + 1)`.
/// Indices before the seed are `None`.
///
/// Returns `None` when the period is zero or there are fewer values than the period.
pub fn ema(values: &[Decimal], period: usize) -> Option<Vec<Option<Decimal>>> {
    if period == 0 || values.len() < period {
        return None;
    }

    let alpha = dec!(2) / Decimal::from(period + 1);
    let seed = values[..period].iter().sum::<Decimal>() / Decimal::from(period);

    let mut out = vec![None; values.len()];
    out[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, &value) in values.iter().enumerate().skip(period) {
        // Same recursion as alpha*x + (1-alpha)*prev, but exact on a flat series.
        prev += alpha * (value - prev);
        out[i] = Some(prev);
    }

    Some(out)
}
