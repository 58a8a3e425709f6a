//! Simple and exponential moving averages over filtered closes.

/// Mean of the last `lookback` values.
pub fn sma(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || closes.len() < lookback {
        return None;
    }
    let recent = &closes[closes.len() - lookback..];
    Some(recent.iter().sum::<f64>() / lookback as f64)
}

/// Exponential moving average seeded with the first close and run across the
/// entire sequence (not only the last `lookback` bars).
pub fn ema(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || closes.len() < lookback {
        return None;
    }
    let k = 2.0 / (lookback as f64 + 1.0);
    let (first, rest) = closes.split_first()?;
    Some(rest.iter().fold(*first, |ema, close| ema + k * (close - ema)))
}
