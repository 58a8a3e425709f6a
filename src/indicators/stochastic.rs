//! Stochastic oscillator %K.
//!
//! %D would need a smoothing history and is always unavailable.

use serde::Serialize;

pub const STOCHASTIC_LOOKBACK: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: Option<f64>,
}

/// %K of the last close against the trailing high/low window.
///
/// Returns `None` when any input is shorter than `lookback` or the window has
/// no range (highest high equals lowest low).
pub fn stochastic_k(
    closes: &[f64],
    highs: &[f64],
    lows: &[f64],
    lookback: usize,
) -> Option<Stochastic> {
    if lookback == 0
        || closes.len() < lookback
        || highs.len() < lookback
        || lows.len() < lookback
    {
        return None;
    }

    let last_close = *closes.last()?;
    let highest = highs[highs.len() - lookback..]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let lowest = lows[lows.len() - lookback..]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    let range = highest - lowest;
    if range <= 0.0 {
        return None;
    }

    Some(Stochastic {
        k: (last_close - lowest) / range * 100.0,
        d: None,
    })
}
