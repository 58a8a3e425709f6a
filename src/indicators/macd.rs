//! MACD line (EMA12 - EMA26).
//!
//! No EMA-of-MACD history is kept, so the signal line and histogram are
//! always reported as unavailable.

use serde::Serialize;

use super::moving_average::ema;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Macd {
    pub macd_line: f64,
    pub signal_line: Option<f64>,
    pub histogram: Option<f64>,
}

/// Requires at least 26 closes.
pub fn macd(closes: &[f64]) -> Option<Macd> {
    if closes.len() < MACD_SLOW {
        return None;
    }
    let fast = ema(closes, MACD_FAST)?;
    let slow = ema(closes, MACD_SLOW)?;
    Some(Macd {
        macd_line: fast - slow,
        signal_line: None,
        histogram: None,
    })
}
