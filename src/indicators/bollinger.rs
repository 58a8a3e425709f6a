//! Bollinger Bands over the trailing window.
//!
//! Uses the population standard deviation (divide by `lookback`).

use serde::Serialize;

pub const BOLLINGER_LOOKBACK: usize = 20;
pub const BOLLINGER_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub std_dev: f64,
}

pub fn bollinger_bands(
    closes: &[f64],
    lookback: usize,
    multiplier: f64,
) -> Option<BollingerBands> {
    if lookback == 0 || closes.len() < lookback {
        return None;
    }
    let recent = &closes[closes.len() - lookback..];
    let n = lookback as f64;
    let middle = recent.iter().sum::<f64>() / n;
    let variance = recent.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    Some(BollingerBands {
        upper: middle + std_dev * multiplier,
        middle,
        lower: middle - std_dev * multiplier,
        std_dev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_collapse_on_flat_series() {
        let bands = bollinger_bands(&[42.0; 25], 20, 2.0).unwrap();
        assert_eq!(bands.upper, bands.middle);
        assert_eq!(bands.lower, bands.middle);
        assert_eq!(bands.std_dev, 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        // mean 5, population variance 4
        let closes = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bands = bollinger_bands(&closes, 8, 2.0).unwrap();
        assert!((bands.middle - 5.0).abs() < 1e-12);
        assert!((bands.std_dev - 2.0).abs() < 1e-12);
        assert!((bands.upper - 9.0).abs() < 1e-12);
        assert!((bands.lower - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unavailable_below_lookback() {
        assert!(bollinger_bands(&[1.0; 19], 20, 2.0).is_none());
    }
}
