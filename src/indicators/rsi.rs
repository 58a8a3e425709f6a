//! Relative Strength Index.
//!
//! Gains and losses are summed over the whole filtered history and divided by
//! `lookback`, not accumulated over a trailing window. Scoring thresholds are
//! tuned against this variant, so it intentionally differs from Wilder's RSI.
//! When there are no losses `rs` is pinned to 100, giving `100 - 100/101`.

/// Default RSI lookback.
pub const RSI_LOOKBACK: usize = 14;

/// RSI over `closes`, or `None` when fewer than `lookback` values exist.
pub fn rsi(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || closes.len() < lookback {
        return None;
    }

    let (gains, losses) = closes
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change >= 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gains / lookback as f64;
    let avg_loss = losses / lookback as f64;
    let rs = if avg_loss == 0.0 { 100.0 } else { avg_gain / avg_loss };

    Some(100.0 - 100.0 / (1.0 + rs))
}
