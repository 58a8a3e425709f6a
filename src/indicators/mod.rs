//! Indicator library
//!
//! Pure functions over null-filtered price sequences. Every function returns
//! `None` instead of an error when the history is too short, so the scorer can
//! degrade gracefully on young listings or short ranges.
//!
//! - **Momentum**: RSI, Stochastic %K
//! - **Trend**: SMA, EMA, MACD line
//! - **Volatility**: Bollinger Bands

pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod stochastic;

pub use bollinger::{bollinger_bands, BollingerBands, BOLLINGER_LOOKBACK, BOLLINGER_MULTIPLIER};
pub use macd::{macd, Macd, MACD_FAST, MACD_SLOW};
pub use moving_average::{ema, sma};
pub use rsi::{rsi, RSI_LOOKBACK};
pub use stochastic::{stochastic_k, Stochastic, STOCHASTIC_LOOKBACK};

use serde::Serialize;

use crate::PriceSeries;

/// Indicator values feeding the recommendation scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    /// Quoted price from the series metadata.
    pub current_price: f64,
    pub rsi: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub macd: Option<Macd>,
    pub bollinger: Option<BollingerBands>,
    pub stochastic: Option<Stochastic>,
}

impl IndicatorSnapshot {
    /// Compute every indicator with its default lookback.
    pub fn compute(series: &PriceSeries) -> Self {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();

        Self {
            current_price: series.meta().current_price,
            rsi: rsi(&closes, RSI_LOOKBACK),
            sma20: sma(&closes, 20),
            sma50: sma(&closes, 50),
            sma200: sma(&closes, 200),
            macd: macd(&closes),
            bollinger: bollinger_bands(&closes, BOLLINGER_LOOKBACK, BOLLINGER_MULTIPLIER),
            stochastic: stochastic_k(&closes, &highs, &lows, STOCHASTIC_LOOKBACK),
        }
    }
}
