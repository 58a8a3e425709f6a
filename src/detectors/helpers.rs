//! Shared math for the pattern detectors
//!
//! Local extrema, annualized volatility, window slicing and least-squares
//! trendlines over plain `f64` sequences.

use serde::Serialize;

// ============================================================
// CONSTANTS
// ============================================================

/// Trading days used to annualize daily return volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// r² above which a trendline is considered a good fit.
pub const GOOD_FIT_R2: f64 = 0.7;
/// r² above which a trendline is considered a fair fit.
pub const FAIR_FIT_R2: f64 = 0.5;

// ============================================================
// EXTREMA
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremumKind {
    Peak,
    Trough,
}

/// A local peak or trough at `index` of the scanned sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtremumPoint {
    pub index: usize,
    pub value: f64,
}

/// Single left-to-right scan for strict local extrema.
///
/// A point qualifies only when it is strictly above (peak) or below (trough)
/// both neighbours, so endpoints and plateaus never qualify.
pub fn find_extrema(values: &[f64], kind: ExtremumKind) -> Vec<ExtremumPoint> {
    values
        .windows(3)
        .enumerate()
        .filter(|(_, w)| match kind {
            ExtremumKind::Peak => w[1] > w[0] && w[1] > w[2],
            ExtremumKind::Trough => w[1] < w[0] && w[1] < w[2],
        })
        .map(|(i, w)| ExtremumPoint {
            index: i + 1,
            value: w[1],
        })
        .collect()
}

#[inline]
pub fn find_peaks(values: &[f64]) -> Vec<ExtremumPoint> {
    find_extrema(values, ExtremumKind::Peak)
}

#[inline]
pub fn find_troughs(values: &[f64]) -> Vec<ExtremumPoint> {
    find_extrema(values, ExtremumKind::Trough)
}

/// Last two extrema, oldest first.
#[inline]
pub fn last_pair(points: &[ExtremumPoint]) -> Option<[ExtremumPoint; 2]> {
    match points {
        [.., prev, last] => Some([*prev, *last]),
        _ => None,
    }
}

// ============================================================
// WINDOWS & STATISTICS
// ============================================================

/// Last `n` values (all of them when shorter).
#[inline]
pub fn trailing(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Window `[len - from_end, len - to_end)`, clamped to the sequence.
///
/// `window_from_end(v, 40, 20)` is the 20 bars preceding the last 20.
#[inline]
pub fn window_from_end(values: &[f64], from_end: usize, to_end: usize) -> &[f64] {
    let len = values.len();
    let start = len.saturating_sub(from_end);
    let end = len.saturating_sub(to_end).max(start);
    &values[start..end]
}

#[inline]
pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Highest minus lowest value, 0 for an empty slice.
pub fn price_range(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    hi - lo
}

/// Annualized standard deviation of simple returns. 0 with fewer than 2 prices.
pub fn volatility(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
    let n = returns.len() as f64;
    let avg = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / n;
    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

// ============================================================
// TRENDLINES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitQuality {
    Poor,
    Fair,
    Good,
}

impl FitQuality {
    pub fn from_r_squared(r_squared: f64) -> Self {
        if r_squared > GOOD_FIT_R2 {
            FitQuality::Good
        } else if r_squared > FAIR_FIT_R2 {
            FitQuality::Fair
        } else {
            FitQuality::Poor
        }
    }
}

/// Ordinary least-squares line of values against their index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub quality: FitQuality,
}

impl Trendline {
    /// Fit `values[i]` against `i`. `None` with fewer than two points.
    ///
    /// A constant sequence is fitted exactly by a flat line and gets r² = 1.
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n;

        let (sxy, sxx) = values
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
                let dx = i as f64 - mean_x;
                (sxy + dx * (y - mean_y), sxx + dx * dx)
            });

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let (ss_res, ss_tot) = values
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(res, tot), (i, &y)| {
                let predicted = slope * i as f64 + intercept;
                (res + (y - predicted).powi(2), tot + (y - mean_y).powi(2))
            });

        let r_squared = if ss_tot > 0.0 {
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Some(Self {
            slope,
            intercept,
            r_squared,
            quality: FitQuality::from_r_squared(r_squared),
        })
    }

    /// Projected value at `index`.
    #[inline]
    pub fn value_at(&self, index: f64) -> f64 {
        self.slope * index + self.intercept
    }
}
