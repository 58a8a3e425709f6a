//! Pattern and divergence detectors
//!
//! # Detector Categories
//!
//! - **Chart (5)**: Head and Shoulders (and inverse), Double Top/Bottom, Triangles
//! - **Signal (5)**: VCP, RSI/MACD divergence, SMA crossover, Breakout setup
//!
//! Shared extrema, volatility and trendline math lives in [`helpers`].

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod chart;
pub mod signals;

// Re-export all detectors for convenience
pub use chart::*;
pub use helpers::*;
pub use signals::*;
