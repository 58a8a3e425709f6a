//! # chartsense
//!
//! Technical-indicator scoring and chart-pattern detection for daily price
//! histories.
//!
//! The crate is a deterministic heuristic, not a trading system: given one
//! [`PriceSeries`] it computes textbook indicators, runs a registry of pattern
//! detectors, and folds the indicators into a signed score and a
//! BUY/SELL/HOLD [`Label`].
//!
//! ## Quick Start
//!
//! ```rust
//! use chartsense::prelude::*;
//!
//! let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
//! let bars = closes
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &c)| Bar::new(i as i64 * 86_400, c, c * 1.01, c * 0.99, 1_000_000.0));
//! let series = PriceSeries::from_bars(SeriesMeta::quoted("ACME", 399.0, 398.0), bars).unwrap();
//!
//! let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
//! let recommendation = engine.analyze(&series);
//! assert!(recommendation.label.is_buy());
//! ```

pub mod batch;
pub mod detectors;
pub mod indicators;
pub mod params;
pub mod scoring;
pub mod series;
pub mod summary;

pub use series::{Bar, HistoryRange, PriceSeries, SeriesMeta};

pub mod prelude {
    pub use crate::{
        // Batch
        batch::{analyze_parallel, BatchAnalyzer, BatchConfig, BatchError, BatchReport, SeriesSource, StaticSource},
        // Detectors
        detectors::*,
        // Indicators
        indicators::IndicatorSnapshot,
        // Parameters
        params::{ParamMeta, ParamSet, ParamType, ParameterizedDetector},
        // Scoring
        scoring::{analyze, score, Label, Recommendation},
        // Series
        series::{Bar, HistoryRange, PriceSeries, SeriesMeta},
        // Summary
        summary::{summarize, summarize_at, Summary},
        // Errors
        AnalysisError,
        // Engine
        BuiltinDetector,
        Confidence,
        Direction,
        EngineBuilder,
        EngineConfig,
        Evidence,
        PatternCategory,
        // Core trait
        PatternDetector,
        PatternEngine,
        // Types
        PatternId,
        PatternMatch,
        PatternMetadata,
        PatternResult,
        Period,
        Ratio,
        Result,
        Strength,
    };
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Hard failures. Short histories are never errors: indicators yield `None`
/// and detectors yield [`PatternResult::NotDetected`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Malformed series: {0}")]
    MalformedSeries(String),

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn data_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Bar count (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// PATTERN RESULT VOCABULARY
// ============================================================

/// Identifier of a recognizable formation or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternId {
    HeadAndShoulders,
    InverseHeadAndShoulders,
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    VolatilityContraction,
    RsiDivergence,
    MacdDivergence,
    GoldenCross,
    DeathCross,
    CrossoverForming,
    BreakoutSetup,
}

impl PatternId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::HeadAndShoulders => "HEAD_AND_SHOULDERS",
            PatternId::InverseHeadAndShoulders => "INVERSE_HEAD_AND_SHOULDERS",
            PatternId::DoubleTop => "DOUBLE_TOP",
            PatternId::DoubleBottom => "DOUBLE_BOTTOM",
            PatternId::AscendingTriangle => "ASCENDING_TRIANGLE",
            PatternId::DescendingTriangle => "DESCENDING_TRIANGLE",
            PatternId::SymmetricalTriangle => "SYMMETRICAL_TRIANGLE",
            PatternId::VolatilityContraction => "VOLATILITY_CONTRACTION",
            PatternId::RsiDivergence => "RSI_DIVERGENCE",
            PatternId::MacdDivergence => "MACD_DIVERGENCE",
            PatternId::GoldenCross => "GOLDEN_CROSS",
            PatternId::DeathCross => "DEATH_CROSS",
            PatternId::CrossoverForming => "CROSSOVER_FORMING",
            PatternId::BreakoutSetup => "BREAKOUT_SETUP",
        }
    }

    /// Returns the typical/expected direction of this pattern.
    ///
    /// - `Some(Direction::Bullish)` / `Some(Direction::Bearish)` - fixed bias
    /// - `Some(Direction::Neutral)` - no directional bias
    /// - `None` - depends on which side the formation resolves (divergences)
    pub fn typical_direction(&self) -> Option<Direction> {
        match self {
            PatternId::InverseHeadAndShoulders
            | PatternId::DoubleBottom
            | PatternId::AscendingTriangle
            | PatternId::VolatilityContraction
            | PatternId::GoldenCross
            | PatternId::BreakoutSetup => Some(Direction::Bullish),
            PatternId::HeadAndShoulders
            | PatternId::DoubleTop
            | PatternId::DescendingTriangle
            | PatternId::DeathCross => Some(Direction::Bearish),
            PatternId::SymmetricalTriangle | PatternId::CrossoverForming => {
                Some(Direction::Neutral)
            }
            PatternId::RsiDivergence | PatternId::MacdDivergence => None,
        }
    }

    pub fn is_bidirectional(&self) -> bool {
        self.typical_direction().is_none()
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

/// Structured data that triggered a detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// Key extrema in formation order (shoulders and head, or the two tops).
    Extrema { points: Vec<ExtremumPoint> },
    Trendlines {
        resistance: Trendline,
        support: Trendline,
    },
    Volatility {
        recent: f64,
        mid: f64,
        early: f64,
        range_contraction: f64,
        volume_decreasing: bool,
    },
    /// Last two price extrema and last two indicator extrema, oldest first.
    Divergence {
        price: [ExtremumPoint; 2],
        indicator: [ExtremumPoint; 2],
    },
    Crossover {
        confirmed: bool,
        sma20: f64,
        sma50: f64,
        sma200: f64,
        previous_sma50: Option<f64>,
        previous_sma200: Option<f64>,
    },
    Breakout {
        resistance: f64,
        support: f64,
        range_percent: f64,
        current_price: f64,
    },
}

/// A detected formation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    pub direction: Direction,
    pub confidence: Confidence,
    pub strength: Strength,
    pub description: String,
    pub evidence: Evidence,
    /// Human-readable supporting observations.
    pub notes: Vec<String>,
}

/// Outcome of one detector run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatternResult {
    NotDetected { reason: String },
    Detected(PatternMatch),
}

impl PatternResult {
    pub fn not_detected(reason: impl Into<String>) -> Self {
        PatternResult::NotDetected {
            reason: reason.into(),
        }
    }

    /// Uniform "too little history" result.
    pub fn insufficient(what: &str, need: usize, got: usize) -> Self {
        PatternResult::NotDetected {
            reason: format!("Insufficient data for {what}: need {need} bars, got {got}"),
        }
    }

    #[inline]
    pub fn is_detected(&self) -> bool {
        matches!(self, PatternResult::Detected(_))
    }

    pub fn as_match(&self) -> Option<&PatternMatch> {
        match self {
            PatternResult::Detected(m) => Some(m),
            PatternResult::NotDetected { .. } => None,
        }
    }

    pub fn into_match(self) -> Option<PatternMatch> {
        match self {
            PatternResult::Detected(m) => Some(m),
            PatternResult::NotDetected { .. } => None,
        }
    }

    pub fn pattern_id(&self) -> Option<PatternId> {
        self.as_match().map(|m| m.pattern_id)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PatternResult::NotDetected { reason } => Some(reason),
            PatternResult::Detected(_) => None,
        }
    }
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// Kind of detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternCategory {
    /// Price formations found from extrema or trendlines; reported only when detected.
    Chart,
    /// Indicator-derived setups; always reported, detected or not.
    Signal,
}

/// Additional metadata about a detector
#[derive(Debug, Clone)]
pub struct PatternMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub category: PatternCategory,
    pub min_bars: usize,
}

/// One entry of the detector registry.
///
/// Detectors never fail: insufficient history is a
/// [`PatternResult::NotDetected`] with a human-readable reason.
pub trait PatternDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> PatternCategory;
    /// Minimum filtered closes needed for a meaningful result.
    fn min_bars(&self) -> usize;
    fn detect(&self, series: &PriceSeries) -> PatternResult;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> &'static str {
        ""
    }

    fn metadata(&self) -> PatternMetadata {
        PatternMetadata {
            name: self.name(),
            description: self.description(),
            category: self.category(),
            min_bars: self.min_bars(),
        }
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;
use params::{ParamMeta, ParamSet, ParameterizedDetector};

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - fast path via enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect(&self, series: &PriceSeries) -> PatternResult {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, series)),*
                }
            }

            #[inline]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => PatternDetector::name(d)),*
                }
            }

            #[inline]
            pub fn category(&self) -> PatternCategory {
                match self {
                    $(Self::$variant(d) => PatternDetector::category(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }

            pub fn param_meta(&self) -> &'static [ParamMeta] {
                match self {
                    $(Self::$variant(_) => <$detector as ParameterizedDetector>::param_meta()),*
                }
            }

            /// Current tunable values
            pub fn params(&self) -> ParamSet {
                match self {
                    $(Self::$variant(d) => ParameterizedDetector::params(d)),*
                }
            }

            /// Same detector with `overrides` applied on top of its current values
            pub fn reconfigured(&self, overrides: &ParamSet) -> Result<Self> {
                match self {
                    $(Self::$variant(d) => Ok(Self::$variant(ParameterizedDetector::reconfigured(d, overrides)?))),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Signals (5)
    VolatilityContraction(VolatilityContractionDetector),
    RsiDivergence(RsiDivergenceDetector),
    MacdDivergence(MacdDivergenceDetector),
    Crossover(CrossoverDetector),
    Breakout(BreakoutDetector),

    // Chart formations (5)
    HeadAndShoulders(HeadAndShouldersDetector),
    InverseHeadAndShoulders(InverseHeadAndShouldersDetector),
    DoubleTop(DoubleTopDetector),
    DoubleBottom(DoubleBottomDetector),
    Triangle(TriangleDetector),
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject detections below this confidence.
    pub min_confidence: Option<Confidence>,
    /// Accept detections of these patterns only.
    pub pattern_filter: Option<Vec<PatternId>>,
    /// Also report chart detectors that found nothing.
    pub include_undetected_charts: bool,
    /// Tunable overrides keyed by detector name, e.g. `"double_top"`.
    /// Applied to every registered builtin detector of that name at build time.
    pub detectors: BTreeMap<String, ParamSet>,
}

/// Detector registry plus the scorer entry point.
///
/// The engine holds no per-series state; one instance can analyze any number
/// of series, concurrently if needed.
pub struct PatternEngine {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn PatternDetector>>,
    config: EngineConfig,
}

impl Default for PatternEngine {
    /// Engine with every builtin detector and default configuration.
    fn default() -> Self {
        Self {
            builtin: default_signal_detectors()
                .into_iter()
                .chain(default_chart_detectors())
                .collect(),
            custom: Vec::new(),
            config: EngineConfig::default(),
        }
    }
}

impl PatternEngine {
    /// Run every registered detector, in registration order.
    ///
    /// Every signal detector yields exactly one result. A signal detection
    /// rejected by `min_confidence` or `pattern_filter` is reported as not
    /// detected with the rejection as its reason. Chart results are kept only
    /// when detected and accepted, unless `include_undetected_charts` is set.
    pub fn scan(&self, series: &PriceSeries) -> Vec<PatternResult> {
        let builtin = self
            .builtin
            .iter()
            .map(|d| (d.category(), d.detect(series)));
        let custom = self
            .custom
            .iter()
            .map(|d| (d.category(), d.detect(series)));

        let results: Vec<PatternResult> = builtin
            .chain(custom)
            .filter_map(|(category, result)| self.apply_config(category, result))
            .collect();

        log::debug!(
            "{}: ran {} detectors, {} detected",
            series.symbol(),
            self.detector_count(),
            results.iter().filter(|r| r.is_detected()).count()
        );

        results
    }

    /// Only the detected formations.
    pub fn detected(&self, series: &PriceSeries) -> Vec<PatternMatch> {
        self.scan(series)
            .into_iter()
            .filter_map(PatternResult::into_match)
            .collect()
    }

    /// Score the indicators and attach detector output.
    pub fn analyze(&self, series: &PriceSeries) -> scoring::Recommendation {
        let snapshot = indicators::IndicatorSnapshot::compute(series);
        scoring::Recommendation::from_snapshot(snapshot, self.scan(series))
    }

    #[inline]
    pub fn detector_count(&self) -> usize {
        self.builtin.len() + self.custom.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tunables of the first builtin detector named `name`
    pub fn detector_params(&self, name: &str) -> Option<ParamSet> {
        self.builtin.iter().find(|d| d.name() == name).map(BuiltinDetector::params)
    }

    fn rejection(&self, m: &PatternMatch) -> Option<String> {
        if let Some(min) = self.config.min_confidence {
            if m.confidence < min {
                return Some(format!(
                    "{} confidence {:?} below minimum {:?}",
                    m.pattern_id.as_str(),
                    m.confidence,
                    min
                ));
            }
        }
        if let Some(ref filter) = self.config.pattern_filter {
            if !filter.contains(&m.pattern_id) {
                return Some(format!("{} excluded by pattern filter", m.pattern_id.as_str()));
            }
        }
        None
    }

    fn apply_config(&self, category: PatternCategory, result: PatternResult) -> Option<PatternResult> {
        let keep_undetected = category == PatternCategory::Signal || self.config.include_undetected_charts;
        let Some(m) = result.as_match() else {
            return keep_undetected.then_some(result);
        };
        match self.rejection(m) {
            None => Some(result),
            Some(reason) => keep_undetected.then(|| PatternResult::not_detected(reason)),
        }
    }

    fn validate(&self) -> Result<()> {
        for d in &self.builtin {
            d.validate_config()?;
        }
        for d in &self.custom {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
#[derive(Default)]
pub struct EngineBuilder {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn PatternDetector>>,
    config: EngineConfig,
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

fn default_signal_detectors() -> [BuiltinDetector; 5] {
    builtin_defaults![
        VolatilityContraction,
        RsiDivergence,
        MacdDivergence,
        Crossover,
        Breakout,
    ]
}

fn default_chart_detectors() -> [BuiltinDetector; 5] {
    builtin_defaults![
        HeadAndShoulders,
        InverseHeadAndShoulders,
        DoubleTop,
        DoubleBottom,
        Triangle,
    ]
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add all builtin detectors with default configurations
    pub fn with_all_defaults(self) -> Self {
        self.with_signal_defaults().with_chart_defaults()
    }

    /// Add VCP, divergence, crossover and breakout detectors (5)
    pub fn with_signal_defaults(mut self) -> Self {
        self.builtin.extend(default_signal_detectors());
        self
    }

    /// Add head-and-shoulders, double top/bottom and triangle detectors (5)
    pub fn with_chart_defaults(mut self) -> Self {
        self.builtin.extend(default_chart_detectors());
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.builtin.push(detector);
        Ok(self)
    }

    /// Add a custom detector (dynamic dispatch)
    pub fn add_custom<D: PatternDetector + 'static>(mut self, detector: D) -> Self {
        self.custom.push(Box::new(detector));
        self
    }

    /// Reject detections below `confidence`
    pub fn min_confidence(mut self, confidence: Confidence) -> Self {
        self.config.min_confidence = Some(confidence);
        self
    }

    /// Filter to specific patterns only
    pub fn only_patterns(mut self, ids: impl IntoIterator<Item = PatternId>) -> Self {
        self.config.pattern_filter = Some(ids.into_iter().collect());
        self
    }

    /// Report chart detectors even when nothing was found
    pub fn include_undetected_charts(mut self, enable: bool) -> Self {
        self.config.include_undetected_charts = enable;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override tunables of the builtin detector named `detector`
    pub fn tune(mut self, detector: impl Into<String>, params: ParamSet) -> Self {
        self.config.detectors.insert(detector.into(), params);
        self
    }

    fn apply_overrides(&mut self) -> Result<()> {
        for (name, overrides) in &self.config.detectors {
            let mut matched = false;
            for detector in self.builtin.iter_mut().filter(|d| d.name() == name.as_str()) {
                *detector = detector.reconfigured(overrides)?;
                matched = true;
            }
            if !matched {
                return Err(AnalysisError::InvalidConfig(format!(
                    "no registered detector named {name:?}"
                )));
            }
        }
        Ok(())
    }

    /// Build the engine, applying any configured tunable overrides
    pub fn build(mut self) -> Result<PatternEngine> {
        self.apply_overrides()?;
        let engine = PatternEngine {
            builtin: self.builtin,
            custom: self.custom,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_series(closes: &[f64]) -> PriceSeries {
        let last = *closes.last().unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 86_400, c, c * 1.01, c * 0.99, 1_000.0));
        PriceSeries::from_bars(SeriesMeta::quoted("TEST", last, last), bars).unwrap()
    }

    fn uptrend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    /// Custom detector that always fires, at low confidence
    struct AlwaysDetector(PatternCategory);

    impl PatternDetector for AlwaysDetector {
        fn name(&self) -> &'static str {
            "always"
        }

        fn category(&self) -> PatternCategory {
            self.0
        }

        fn min_bars(&self) -> usize {
            1
        }

        fn detect(&self, _series: &PriceSeries) -> PatternResult {
            PatternResult::Detected(PatternMatch {
                pattern_id: PatternId::DoubleBottom,
                direction: Direction::Bullish,
                confidence: Confidence::Low,
                strength: Strength::Weak,
                description: "test".into(),
                evidence: Evidence::Extrema { points: vec![] },
                notes: vec![],
            })
        }
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.5).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_engine_builder() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        assert_eq!(engine.detector_count(), 10);
        assert_eq!(PatternEngine::default().detector_count(), 10);
    }

    #[test]
    fn test_signal_results_always_attached() {
        let engine = EngineBuilder::new().with_signal_defaults().build().unwrap();
        let results = engine.scan(&make_series(&[10.0, 11.0]));
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| !r.is_detected()));
    }

    #[test]
    fn test_undetected_charts_dropped_by_default() {
        let engine = EngineBuilder::new().with_chart_defaults().build().unwrap();
        assert!(engine.scan(&make_series(&[10.0, 11.0])).is_empty());

        let engine = EngineBuilder::new()
            .with_chart_defaults()
            .include_undetected_charts(true)
            .build()
            .unwrap();
        assert_eq!(engine.scan(&make_series(&[10.0, 11.0])).len(), 5);
    }

    #[test]
    fn test_custom_detector_and_filters() {
        let series = make_series(&uptrend(10));

        let engine = EngineBuilder::new().add_custom(AlwaysDetector(PatternCategory::Chart)).build().unwrap();
        assert_eq!(engine.detected(&series).len(), 1);

        let engine = EngineBuilder::new()
            .add_custom(AlwaysDetector(PatternCategory::Chart))
            .min_confidence(Confidence::Medium)
            .build()
            .unwrap();
        assert!(engine.detected(&series).is_empty());

        let engine = EngineBuilder::new()
            .add_custom(AlwaysDetector(PatternCategory::Chart))
            .only_patterns([PatternId::HeadAndShoulders])
            .build()
            .unwrap();
        assert!(engine.detected(&series).is_empty());
    }

    #[test]
    fn test_filtered_signal_stays_attached() {
        let series = make_series(&uptrend(10));

        let engine = EngineBuilder::new()
            .add_custom(AlwaysDetector(PatternCategory::Signal))
            .min_confidence(Confidence::Medium)
            .build()
            .unwrap();
        let results = engine.scan(&series);
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_detected());
        assert!(results[0].reason().unwrap().contains("below minimum"));

        let engine = EngineBuilder::new()
            .add_custom(AlwaysDetector(PatternCategory::Signal))
            .only_patterns([PatternId::GoldenCross])
            .build()
            .unwrap();
        let results = engine.scan(&series);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].reason(),
            Some("DOUBLE_BOTTOM excluded by pattern filter")
        );
    }

    #[test]
    fn test_config_overrides_reach_detectors() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"detectors": {"breakout_setup": {"lookback": 25}, "triangle": {"flat_slope": 0.005}}}"#,
        )
        .unwrap();
        let engine = EngineBuilder::new().with_all_defaults().config(config).build().unwrap();

        let breakout = engine.detector_params("breakout_setup").unwrap();
        assert_eq!(breakout.get("lookback"), Some(25.0));
        assert_eq!(breakout.get("volume_surge"), Some(1.5));
        assert_eq!(engine.detector_params("triangle").unwrap().get("flat_slope"), Some(0.005));
        assert_eq!(engine.detector_params("double_top").unwrap().get("tolerance"), Some(0.03));
    }

    #[test]
    fn test_bad_overrides_fail_build() {
        let unknown_detector = EngineBuilder::new()
            .with_all_defaults()
            .tune("cup_and_handle", ParamSet::new())
            .build();
        assert!(matches!(unknown_detector, Err(AnalysisError::InvalidConfig(_))));

        let out_of_range = EngineBuilder::new()
            .with_signal_defaults()
            .tune("volatility_contraction", ParamSet::new().with("window", 30.0))
            .build();
        assert!(matches!(out_of_range, Err(AnalysisError::OutOfRange { field: "window", .. })));

        let fixed = EngineBuilder::new()
            .with_signal_defaults()
            .tune("rsi_divergence", ParamSet::new().with("lookback", 10.0))
            .build();
        assert!(fixed.is_err());
    }

    #[test]
    fn test_add_checked_rejects_invalid_config() {
        let detector = DoubleTopDetector {
            tolerance: Ratio::new_const(1.5),
            ..Default::default()
        };
        assert!(EngineBuilder::new()
            .add_checked(BuiltinDetector::DoubleTop(detector.clone()))
            .is_err());
        assert!(EngineBuilder::new()
            .add(BuiltinDetector::DoubleTop(detector))
            .build()
            .is_err());
    }

    #[test]
    fn test_metadata() {
        let meta = PatternDetector::metadata(&CrossoverDetector::default());
        assert_eq!(meta.category, PatternCategory::Signal);
        assert_eq!(meta.min_bars, 200);
        assert!(!meta.description.is_empty());
    }

    #[test]
    fn test_pattern_id_direction() {
        assert!(PatternId::DoubleBottom.typical_direction().unwrap().is_bullish());
        assert!(PatternId::HeadAndShoulders.typical_direction().unwrap().is_bearish());
        assert!(PatternId::RsiDivergence.is_bidirectional());
        assert_eq!(PatternId::GoldenCross.to_string(), "GOLDEN_CROSS");
    }

    #[test]
    fn test_insufficient_reason() {
        let r = PatternResult::insufficient("VCP analysis", 50, 12);
        assert!(!r.is_detected());
        assert_eq!(
            r.reason(),
            Some("Insufficient data for VCP analysis: need 50 bars, got 12")
        );
    }

    #[test]
    fn test_engine_config_deserializes_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"min_confidence":"medium"}"#).unwrap();
        assert_eq!(config.min_confidence, Some(Confidence::Medium));
        assert!(config.pattern_filter.is_none());
        assert!(!config.include_undetected_charts);
    }
}
