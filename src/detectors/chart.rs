//! Chart formations found from extrema and trendlines
//!
//! Head-and-shoulders and double top/bottom scan the extrema of the whole
//! filtered close sequence and only report formations that are still live,
//! i.e. whose last extremum lies within a few bars of the latest close.
//! Triangles fit least-squares trendlines to the trailing highs and lows.

use super::helpers::{
    find_extrema, trailing, ExtremumKind, ExtremumPoint, FitQuality, Trendline,
};
use crate::{
    params::{ParamMeta, ParamSet, ParameterizedDetector},
    AnalysisError, Confidence, Direction, Evidence, PatternCategory, PatternDetector, PatternId,
    PatternMatch, PatternResult, Period, PriceSeries, Ratio, Result, Strength,
};

impl_with_defaults!(
    HeadAndShouldersDetector,
    InverseHeadAndShouldersDetector,
    DoubleTopDetector,
    DoubleBottomDetector,
    TriangleDetector,
);

// ============================================================
// SHARED SCANS
// ============================================================

/// Three consecutive extrema of one kind forming a head between two shoulders.
fn scan_head_and_shoulders(
    closes: &[f64],
    kind: ExtremumKind,
    head_prominence: f64,
    shoulder_tolerance: f64,
    live_window: usize,
) -> Option<([ExtremumPoint; 3], f64)> {
    let last = closes.len().checked_sub(1)?;
    let points = find_extrema(closes, kind);

    points.windows(3).rev().find_map(|w| {
        let (left, head, right) = (w[0], w[1], w[2]);
        if last - right.index > live_window {
            return None;
        }
        let shoulders = (left.value + right.value) / 2.0;
        let prominent = match kind {
            ExtremumKind::Peak => head.value >= shoulders * (1.0 + head_prominence),
            ExtremumKind::Trough => head.value <= shoulders * (1.0 - head_prominence),
        };
        let shoulder_diff = (left.value - right.value).abs() / shoulders;
        (prominent && shoulder_diff <= shoulder_tolerance)
            .then_some(([left, head, right], shoulder_diff))
    })
}

/// Two consecutive extrema of one kind at nearly the same level.
fn scan_double(
    closes: &[f64],
    kind: ExtremumKind,
    tolerance: f64,
    live_window: usize,
) -> Option<([ExtremumPoint; 2], f64)> {
    let last = closes.len().checked_sub(1)?;
    let points = find_extrema(closes, kind);

    points.windows(2).rev().find_map(|w| {
        let (first, second) = (w[0], w[1]);
        if last - second.index > live_window {
            return None;
        }
        let level = (first.value + second.value) / 2.0;
        let diff = (first.value - second.value).abs() / level;
        (diff <= tolerance).then_some(([first, second], diff))
    })
}

/// Lowest (for peaks) or highest (for troughs) close between two extrema.
fn neckline(closes: &[f64], from: usize, to: usize, kind: ExtremumKind) -> f64 {
    let between = closes[from..=to].iter().copied();
    match kind {
        ExtremumKind::Peak => between.fold(f64::INFINITY, f64::min),
        ExtremumKind::Trough => between.fold(f64::NEG_INFINITY, f64::max),
    }
}

fn validate_ratio(field: &'static str, value: Ratio) -> Result<()> {
    Ratio::new(value.get()).map(|_| ()).map_err(|_| AnalysisError::OutOfRange {
        field,
        value: value.get(),
        min: 0.0,
        max: 1.0,
    })
}

// ============================================================
// HEAD AND SHOULDERS
// ============================================================

/// Bearish reversal: three peaks, the middle one clearly the highest.
#[derive(Debug, Clone)]
pub struct HeadAndShouldersDetector {
    /// Minimum head height above the shoulder mean.
    pub head_prominence: Ratio,
    /// Maximum shoulder height difference relative to their mean.
    pub shoulder_tolerance: Ratio,
    /// Bars allowed after the right shoulder.
    pub live_window: Period,
}

impl Default for HeadAndShouldersDetector {
    fn default() -> Self {
        Self {
            head_prominence: Ratio::new_const(0.05),
            shoulder_tolerance: Ratio::new_const(0.10),
            live_window: Period::new_const(5),
        }
    }
}

/// Bullish reversal: three troughs, the middle one clearly the lowest.
#[derive(Debug, Clone)]
pub struct InverseHeadAndShouldersDetector {
    pub head_prominence: Ratio,
    pub shoulder_tolerance: Ratio,
    pub live_window: Period,
}

impl Default for InverseHeadAndShouldersDetector {
    fn default() -> Self {
        Self {
            head_prominence: Ratio::new_const(0.05),
            shoulder_tolerance: Ratio::new_const(0.10),
            live_window: Period::new_const(5),
        }
    }
}

fn detect_head_and_shoulders(
    series: &PriceSeries,
    kind: ExtremumKind,
    head_prominence: Ratio,
    shoulder_tolerance: Ratio,
    live_window: Period,
) -> PatternResult {
    let (pattern_id, direction, name, title) = match kind {
        ExtremumKind::Peak => (
            PatternId::HeadAndShoulders,
            Direction::Bearish,
            "head and shoulders",
            "Head and shoulders",
        ),
        ExtremumKind::Trough => (
            PatternId::InverseHeadAndShoulders,
            Direction::Bullish,
            "inverse head and shoulders",
            "Inverse head and shoulders",
        ),
    };

    let closes = series.closes();
    if closes.len() < 7 {
        return PatternResult::insufficient(name, 7, closes.len());
    }

    let Some(([left, head, right], shoulder_diff)) = scan_head_and_shoulders(
        &closes,
        kind,
        head_prominence.get(),
        shoulder_tolerance.get(),
        live_window.get(),
    ) else {
        return PatternResult::not_detected(format!(
            "No live {name} formation in the last {} bars",
            live_window.get()
        ));
    };

    let shoulders = (left.value + right.value) / 2.0;
    let prominence = (head.value - shoulders).abs() / shoulders;
    let confidence = if shoulder_diff <= shoulder_tolerance.get() / 2.0 {
        Confidence::High
    } else {
        Confidence::Medium
    };
    let strength = if prominence >= 2.0 * head_prominence.get() {
        Strength::Strong
    } else {
        Strength::Moderate
    };
    let neck = neckline(&closes, left.index, right.index, kind);

    PatternResult::Detected(PatternMatch {
        pattern_id,
        direction,
        confidence,
        strength,
        description: format!(
            "{title}: head {:.2} vs shoulders {:.2} / {:.2}",
            head.value,
            left.value,
            right.value
        ),
        evidence: Evidence::Extrema {
            points: vec![left, head, right],
        },
        notes: vec![
            format!("Head {:.1}% beyond shoulder average", prominence * 100.0),
            format!("Shoulders differ by {:.1}%", shoulder_diff * 100.0),
            format!("Neckline at {neck:.2}"),
        ],
    })
}

impl PatternDetector for HeadAndShouldersDetector {
    fn name(&self) -> &'static str {
        "head_and_shoulders"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Chart
    }

    fn min_bars(&self) -> usize {
        7
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        detect_head_and_shoulders(
            series,
            ExtremumKind::Peak,
            self.head_prominence,
            self.shoulder_tolerance,
            self.live_window,
        )
    }

    fn validate_config(&self) -> Result<()> {
        validate_ratio("head_prominence", self.head_prominence)?;
        validate_ratio("shoulder_tolerance", self.shoulder_tolerance)
    }

    fn description(&self) -> &'static str {
        "Three peaks with a dominant middle peak, near the latest bar"
    }
}

impl PatternDetector for InverseHeadAndShouldersDetector {
    fn name(&self) -> &'static str {
        "inverse_head_and_shoulders"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Chart
    }

    fn min_bars(&self) -> usize {
        7
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        detect_head_and_shoulders(
            series,
            ExtremumKind::Trough,
            self.head_prominence,
            self.shoulder_tolerance,
            self.live_window,
        )
    }

    fn validate_config(&self) -> Result<()> {
        validate_ratio("head_prominence", self.head_prominence)?;
        validate_ratio("shoulder_tolerance", self.shoulder_tolerance)
    }

    fn description(&self) -> &'static str {
        "Three troughs with a dominant middle trough, near the latest bar"
    }
}

// ============================================================
// DOUBLE TOP / BOTTOM
// ============================================================

#[derive(Debug, Clone)]
pub struct DoubleTopDetector {
    /// Maximum height difference of the two peaks relative to their mean.
    pub tolerance: Ratio,
    /// Bars allowed after the second peak.
    pub live_window: Period,
}

impl Default for DoubleTopDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(0.03),
            live_window: Period::new_const(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DoubleBottomDetector {
    pub tolerance: Ratio,
    pub live_window: Period,
}

impl Default for DoubleBottomDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(0.03),
            live_window: Period::new_const(3),
        }
    }
}

fn detect_double(
    series: &PriceSeries,
    kind: ExtremumKind,
    tolerance: Ratio,
    live_window: Period,
) -> PatternResult {
    let (pattern_id, direction, name, title) = match kind {
        ExtremumKind::Peak => (PatternId::DoubleTop, Direction::Bearish, "double top", "Double top"),
        ExtremumKind::Trough => (
            PatternId::DoubleBottom,
            Direction::Bullish,
            "double bottom",
            "Double bottom",
        ),
    };

    let closes = series.closes();
    if closes.len() < 5 {
        return PatternResult::insufficient(name, 5, closes.len());
    }

    let Some(([first, second], diff)) =
        scan_double(&closes, kind, tolerance.get(), live_window.get())
    else {
        return PatternResult::not_detected(format!(
            "No live {name} in the last {} bars",
            live_window.get()
        ));
    };

    let confidence = if diff <= tolerance.get() / 3.0 {
        Confidence::High
    } else {
        Confidence::Medium
    };
    let level = neckline(&closes, first.index, second.index, kind);

    PatternResult::Detected(PatternMatch {
        pattern_id,
        direction,
        confidence,
        strength: Strength::Moderate,
        description: format!(
            "{title} at {:.2} / {:.2}",
            first.value,
            second.value
        ),
        evidence: Evidence::Extrema {
            points: vec![first, second],
        },
        notes: vec![
            format!("Extremes differ by {:.1}%", diff * 100.0),
            format!("{} bars between extremes", second.index - first.index),
            format!("Confirmation level at {level:.2}"),
        ],
    })
}

impl PatternDetector for DoubleTopDetector {
    fn name(&self) -> &'static str {
        "double_top"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Chart
    }

    fn min_bars(&self) -> usize {
        5
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        detect_double(series, ExtremumKind::Peak, self.tolerance, self.live_window)
    }

    fn validate_config(&self) -> Result<()> {
        validate_ratio("tolerance", self.tolerance)
    }

    fn description(&self) -> &'static str {
        "Two recent peaks at nearly the same level"
    }
}

impl PatternDetector for DoubleBottomDetector {
    fn name(&self) -> &'static str {
        "double_bottom"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Chart
    }

    fn min_bars(&self) -> usize {
        5
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        detect_double(series, ExtremumKind::Trough, self.tolerance, self.live_window)
    }

    fn validate_config(&self) -> Result<()> {
        validate_ratio("tolerance", self.tolerance)
    }

    fn description(&self) -> &'static str {
        "Two recent troughs at nearly the same level"
    }
}

// ============================================================
// TRIANGLES
// ============================================================

/// Ascending, descending or symmetrical triangle from trailing trendlines.
#[derive(Debug, Clone)]
pub struct TriangleDetector {
    /// Highs and lows fitted.
    pub lookback: Period,
    /// Slope magnitude (price per bar) treated as flat.
    pub flat_slope: f64,
    /// Minimum `support_slope - resistance_slope` (price per bar) for a
    /// symmetrical triangle.
    pub min_convergence: f64,
}

impl Default for TriangleDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(20),
            flat_slope: 0.001,
            min_convergence: 0.002,
        }
    }
}

impl TriangleDetector {
    fn classify(&self, resistance: &Trendline, support: &Trendline) -> Option<(PatternId, Direction)> {
        let flat = self.flat_slope;
        let (res, sup) = (resistance.slope, support.slope);

        if res.abs() < flat && sup > flat {
            Some((PatternId::AscendingTriangle, Direction::Bullish))
        } else if sup.abs() < flat && res < -flat {
            Some((PatternId::DescendingTriangle, Direction::Bearish))
        } else if res < -flat && sup > flat && sup - res > self.min_convergence {
            Some((PatternId::SymmetricalTriangle, Direction::Neutral))
        } else {
            None
        }
    }
}

impl PatternDetector for TriangleDetector {
    fn name(&self) -> &'static str {
        "triangle"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Chart
    }

    fn min_bars(&self) -> usize {
        self.lookback.get()
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        let n = self.lookback.get();
        let highs = series.highs();
        let lows = series.lows();
        let available = highs.len().min(lows.len());
        if available < n.max(2) {
            return PatternResult::insufficient("triangle", n.max(2), available);
        }

        let (Some(resistance), Some(support)) = (
            Trendline::fit(trailing(&highs, n)),
            Trendline::fit(trailing(&lows, n)),
        ) else {
            return PatternResult::insufficient("triangle", n.max(2), available);
        };

        let Some((pattern_id, direction)) = self.classify(&resistance, &support) else {
            return PatternResult::not_detected(format!(
                "No triangle: resistance slope {:.4}, support slope {:.4}",
                resistance.slope, support.slope
            ));
        };

        let fit = resistance.quality.min(support.quality);
        let confidence = match fit {
            FitQuality::Good => Confidence::High,
            FitQuality::Fair => Confidence::Medium,
            FitQuality::Poor => Confidence::Low,
        };
        let strength = match fit {
            FitQuality::Good => Strength::Strong,
            FitQuality::Fair => Strength::Moderate,
            FitQuality::Poor => Strength::Weak,
        };

        let label = match pattern_id {
            PatternId::AscendingTriangle => "Ascending triangle",
            PatternId::DescendingTriangle => "Descending triangle",
            _ => "Symmetrical triangle",
        };
        let end = (n - 1) as f64;

        PatternResult::Detected(PatternMatch {
            pattern_id,
            direction,
            confidence,
            strength,
            description: format!("{label} over the last {n} bars"),
            evidence: Evidence::Trendlines {
                resistance,
                support,
            },
            notes: vec![
                format!(
                    "Resistance slope {:.4} (r² {:.2})",
                    resistance.slope, resistance.r_squared
                ),
                format!(
                    "Support slope {:.4} (r² {:.2})",
                    support.slope, support.r_squared
                ),
                format!(
                    "Lines at {:.2} / {:.2} on the latest bar",
                    resistance.value_at(end),
                    support.value_at(end)
                ),
            ],
        })
    }

    fn validate_config(&self) -> Result<()> {
        for (field, slope) in [("flat_slope", self.flat_slope), ("min_convergence", self.min_convergence)] {
            if !(slope.is_finite() && slope >= 0.0) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{field} must be a finite non-negative slope, got {slope}"
                )));
            }
        }
        if self.lookback.get() < 2 {
            return Err(AnalysisError::InvalidConfig(
                "triangle lookback must cover at least 2 bars".into(),
            ));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Converging trendlines over the trailing highs and lows"
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

const HEAD_PROMINENCE: ParamMeta = ParamMeta::ratio(
    "head_prominence",
    0.05,
    (0.02, 0.10, 0.01),
    "Minimum head height beyond the shoulder mean",
);
const SHOULDER_TOLERANCE: ParamMeta = ParamMeta::ratio(
    "shoulder_tolerance",
    0.10,
    (0.05, 0.20, 0.05),
    "Maximum relative shoulder height difference",
);
const SHOULDER_LIVE_WINDOW: ParamMeta =
    ParamMeta::period("live_window", 5.0, (3.0, 10.0, 1.0), "Bars allowed after the right shoulder");

static HEAD_AND_SHOULDERS_PARAMS: &[ParamMeta] = &[HEAD_PROMINENCE, SHOULDER_TOLERANCE, SHOULDER_LIVE_WINDOW];

const DOUBLE_TOLERANCE: ParamMeta = ParamMeta::ratio(
    "tolerance",
    0.03,
    (0.01, 0.05, 0.01),
    "Maximum relative height difference of the two extremes",
);
const DOUBLE_LIVE_WINDOW: ParamMeta =
    ParamMeta::period("live_window", 3.0, (1.0, 6.0, 1.0), "Bars allowed after the second extreme");

static DOUBLE_PARAMS: &[ParamMeta] = &[DOUBLE_TOLERANCE, DOUBLE_LIVE_WINDOW];

const TRIANGLE_LOOKBACK: ParamMeta =
    ParamMeta::period("lookback", 20.0, (10.0, 40.0, 5.0), "Trailing highs and lows fitted");
const FLAT_SLOPE: ParamMeta =
    ParamMeta::factor("flat_slope", 0.001, (0.0, 0.01, 0.001), "Slope (price per bar) treated as flat");
const MIN_CONVERGENCE: ParamMeta = ParamMeta::factor(
    "min_convergence",
    0.002,
    (0.0, 0.02, 0.002),
    "Minimum slope gap (price per bar) for a symmetrical triangle",
);

static TRIANGLE_PARAMS: &[ParamMeta] = &[TRIANGLE_LOOKBACK, FLAT_SLOPE, MIN_CONVERGENCE];

/// Head-and-shoulders tunables shared by both orientations.
fn shoulder_params(prominence: Ratio, tolerance: Ratio, live_window: Period) -> ParamSet {
    ParamSet::new()
        .with(HEAD_PROMINENCE.name, prominence.get())
        .with(SHOULDER_TOLERANCE.name, tolerance.get())
        .with(SHOULDER_LIVE_WINDOW.name, live_window.get() as f64)
}

impl ParameterizedDetector for HeadAndShouldersDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HEAD_AND_SHOULDERS_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            head_prominence: params.ratio(&HEAD_PROMINENCE)?,
            shoulder_tolerance: params.ratio(&SHOULDER_TOLERANCE)?,
            live_window: params.period(&SHOULDER_LIVE_WINDOW)?,
        })
    }

    fn params(&self) -> ParamSet {
        shoulder_params(self.head_prominence, self.shoulder_tolerance, self.live_window)
    }
}

impl ParameterizedDetector for InverseHeadAndShouldersDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HEAD_AND_SHOULDERS_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            head_prominence: params.ratio(&HEAD_PROMINENCE)?,
            shoulder_tolerance: params.ratio(&SHOULDER_TOLERANCE)?,
            live_window: params.period(&SHOULDER_LIVE_WINDOW)?,
        })
    }

    fn params(&self) -> ParamSet {
        shoulder_params(self.head_prominence, self.shoulder_tolerance, self.live_window)
    }
}

impl ParameterizedDetector for DoubleTopDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            tolerance: params.ratio(&DOUBLE_TOLERANCE)?,
            live_window: params.period(&DOUBLE_LIVE_WINDOW)?,
        })
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with(DOUBLE_TOLERANCE.name, self.tolerance.get())
            .with(DOUBLE_LIVE_WINDOW.name, self.live_window.get() as f64)
    }
}

impl ParameterizedDetector for DoubleBottomDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            tolerance: params.ratio(&DOUBLE_TOLERANCE)?,
            live_window: params.period(&DOUBLE_LIVE_WINDOW)?,
        })
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with(DOUBLE_TOLERANCE.name, self.tolerance.get())
            .with(DOUBLE_LIVE_WINDOW.name, self.live_window.get() as f64)
    }
}

impl ParameterizedDetector for TriangleDetector {
    fn param_meta() -> &'static [ParamMeta] {
        TRIANGLE_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            lookback: params.period(&TRIANGLE_LOOKBACK)?,
            flat_slope: params.factor(&FLAT_SLOPE)?,
            min_convergence: params.factor(&MIN_CONVERGENCE)?,
        })
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with(TRIANGLE_LOOKBACK.name, self.lookback.get() as f64)
            .with(FLAT_SLOPE.name, self.flat_slope)
            .with(MIN_CONVERGENCE.name, self.min_convergence)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, SeriesMeta};

    fn closes_series(closes: &[f64]) -> PriceSeries {
        let last = *closes.last().unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 86_400, c, c + 1.0, c - 1.0, 1_000.0));
        PriceSeries::from_bars(SeriesMeta::quoted("CHART", last, last), bars).unwrap()
    }

    fn range_series(highs: &[f64], lows: &[f64]) -> PriceSeries {
        let bars = highs.iter().zip(lows).enumerate().map(|(i, (&h, &l))| {
            Bar::new(i as i64 * 86_400, (h + l) / 2.0, h, l, 1_000.0)
        });
        PriceSeries::from_bars(SeriesMeta::quoted("TRI", 100.0, 100.0), bars).unwrap()
    }

    const HEAD_AND_SHOULDERS: [f64; 13] = [
        100.0, 105.0, 110.0, 105.0, 100.0, 108.0, 120.0, 108.0, 100.0, 105.0, 110.5, 105.0, 102.0,
    ];

    #[test]
    fn test_head_and_shoulders_live() {
        let result = HeadAndShouldersDetector::with_defaults().detect(&closes_series(&HEAD_AND_SHOULDERS));
        let m = result.as_match().expect("formation should be detected");
        assert_eq!(m.pattern_id, PatternId::HeadAndShoulders);
        assert_eq!(m.direction, Direction::Bearish);
        assert_eq!(m.confidence, Confidence::High);
        match &m.evidence {
            Evidence::Extrema { points } => {
                let idx: Vec<usize> = points.iter().map(|p| p.index).collect();
                assert_eq!(idx, vec![2, 6, 10]);
            }
            other => panic!("unexpected evidence {other:?}"),
        }
        assert!(m.notes.iter().any(|n| n == "Neckline at 100.00"));
    }

    #[test]
    fn test_head_and_shoulders_stale() {
        let mut closes = HEAD_AND_SHOULDERS.to_vec();
        closes.extend((0..10).map(|i| 101.0 - f64::from(i)));
        let result = HeadAndShouldersDetector::default().detect(&closes_series(&closes));
        assert!(!result.is_detected());
    }

    #[test]
    fn test_head_needs_prominence() {
        let closes = [100.0, 105.0, 110.0, 105.0, 100.0, 108.0, 112.0, 108.0, 100.0, 105.0, 110.5, 105.0, 102.0];
        assert!(!HeadAndShouldersDetector::default().detect(&closes_series(&closes)).is_detected());
    }

    #[test]
    fn test_inverse_head_and_shoulders() {
        let closes = [100.0, 95.0, 90.0, 95.0, 100.0, 92.0, 80.0, 92.0, 100.0, 95.0, 89.5, 95.0, 98.0];
        let result = InverseHeadAndShouldersDetector::default().detect(&closes_series(&closes));
        let m = result.as_match().unwrap();
        assert_eq!(m.pattern_id, PatternId::InverseHeadAndShoulders);
        assert_eq!(m.direction, Direction::Bullish);
    }

    #[test]
    fn test_short_series_not_detected() {
        let result = HeadAndShouldersDetector::default().detect(&closes_series(&[1.0, 2.0, 1.0]));
        assert!(result.reason().unwrap().starts_with("Insufficient data"));
    }

    #[test]
    fn test_double_top_and_bottom() {
        let top = [100.0, 105.0, 110.0, 104.0, 100.0, 104.0, 110.5, 106.0, 103.0];
        let m = DoubleTopDetector::default()
            .detect(&closes_series(&top))
            .into_match()
            .unwrap();
        assert_eq!(m.pattern_id, PatternId::DoubleTop);
        assert_eq!(m.confidence, Confidence::High);

        let bottom = [100.0, 95.0, 90.0, 96.0, 100.0, 96.0, 89.5, 94.0, 97.0];
        let m = DoubleBottomDetector::default()
            .detect(&closes_series(&bottom))
            .into_match()
            .unwrap();
        assert_eq!(m.pattern_id, PatternId::DoubleBottom);
        assert_eq!(m.direction, Direction::Bullish);
    }

    #[test]
    fn test_double_top_outside_tolerance() {
        let top = [100.0, 105.0, 110.0, 104.0, 100.0, 104.0, 116.0, 106.0, 103.0];
        assert!(!DoubleTopDetector::default().detect(&closes_series(&top)).is_detected());
    }

    #[test]
    fn test_ascending_triangle() {
        let highs = vec![110.0; 20];
        let lows: Vec<f64> = (0..20).map(|i| 100.0 + 0.5 * f64::from(i)).collect();
        let m = TriangleDetector::default()
            .detect(&range_series(&highs, &lows))
            .into_match()
            .unwrap();
        assert_eq!(m.pattern_id, PatternId::AscendingTriangle);
        assert_eq!(m.confidence, Confidence::High);
    }

    #[test]
    fn test_descending_and_symmetrical_triangle() {
        let falling: Vec<f64> = (0..20).map(|i| 120.0 - 0.5 * f64::from(i)).collect();
        let flat = vec![100.0; 20];
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + 0.5 * f64::from(i)).collect();

        let detector = TriangleDetector::default();
        let desc = detector.detect(&range_series(&falling, &flat));
        assert_eq!(desc.pattern_id(), Some(PatternId::DescendingTriangle));

        let sym = detector.detect(&range_series(&falling, &rising));
        assert_eq!(sym.pattern_id(), Some(PatternId::SymmetricalTriangle));
    }

    #[test]
    fn test_parallel_channel_is_not_triangle() {
        let highs: Vec<f64> = (0..20).map(|i| 110.0 + f64::from(i)).collect();
        let lows: Vec<f64> = (0..20).map(|i| 100.0 + f64::from(i)).collect();
        assert!(!TriangleDetector::default().detect(&range_series(&highs, &lows)).is_detected());
    }

    #[test]
    fn test_with_params() {
        let params = ParamSet::new().with("tolerance", 0.01);
        let detector = DoubleTopDetector::with_params(&params).unwrap();
        assert_eq!(detector.tolerance.get(), 0.01);
        assert_eq!(detector.live_window.get(), 3);

        let params = params.with("tolerance", 2.0);
        assert!(DoubleTopDetector::with_params(&params).is_err());
        assert_eq!(TriangleDetector::param_meta().len(), 3);
    }

    #[test]
    fn test_triangle_slopes_are_not_ratios() {
        // slopes are price per bar, not shares of anything
        let wide = TriangleDetector {
            flat_slope: 2.5,
            ..Default::default()
        };
        assert!(wide.validate_config().is_ok());

        for bad in [-0.001, f64::NAN, f64::INFINITY] {
            let detector = TriangleDetector {
                flat_slope: bad,
                ..Default::default()
            };
            assert!(detector.validate_config().is_err(), "accepted {bad}");
        }

        let params = ParamSet::new().with("min_convergence", 0.004);
        assert_eq!(TriangleDetector::with_params(&params).unwrap().min_convergence, 0.004);
    }
}
