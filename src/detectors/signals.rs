//! Indicator-derived setups
//!
//! These detectors are always reported by the engine, detected or not, and
//! are attached to every recommendation.

use super::helpers::{
    find_peaks, find_troughs, last_pair, mean, price_range, trailing, volatility,
    window_from_end, ExtremumPoint,
};
use crate::{
    indicators::{ema, rsi, sma, MACD_FAST, MACD_SLOW, RSI_LOOKBACK},
    params::{ParamMeta, ParamSet, ParameterizedDetector},
    AnalysisError, Confidence, Direction, Evidence, PatternCategory, PatternDetector, PatternId,
    PatternMatch, PatternResult, Period, PriceSeries, Ratio, Result, Strength,
};

impl_with_defaults!(
    VolatilityContractionDetector,
    RsiDivergenceDetector,
    MacdDivergenceDetector,
    CrossoverDetector,
    BreakoutDetector,
);

/// Points of price and indicator history compared for divergence.
pub const DIVERGENCE_WINDOW: usize = 15;

// ============================================================
// VOLATILITY CONTRACTION (VCP)
// ============================================================

/// Progressively narrowing volatility and range over three trailing windows.
#[derive(Debug, Clone)]
pub struct VolatilityContractionDetector {
    /// Bars per window.
    pub window: Period,
    /// Recent volatility must be below this share of the middle window's.
    pub max_recent_to_mid: Ratio,
    /// Recent volatility must be below this share of the earliest window's.
    pub max_recent_to_early: Ratio,
    /// Recent range must be below this share of the middle window's range.
    pub max_range_contraction: Ratio,
    /// Recent volume below this share of the prior window marks a dry-up.
    pub volume_dry_up: Ratio,
}

impl Default for VolatilityContractionDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(20),
            max_recent_to_mid: Ratio::new_const(0.7),
            max_recent_to_early: Ratio::new_const(0.6),
            max_range_contraction: Ratio::new_const(0.8),
            volume_dry_up: Ratio::new_const(0.8),
        }
    }
}

impl PatternDetector for VolatilityContractionDetector {
    fn name(&self) -> &'static str {
        "volatility_contraction"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Signal
    }

    fn min_bars(&self) -> usize {
        50
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        let closes = series.closes();
        if closes.len() < self.min_bars() {
            return PatternResult::insufficient("VCP analysis", self.min_bars(), closes.len());
        }

        let w = self.window.get();
        let recent = trailing(&closes, w);
        let mid = window_from_end(&closes, 2 * w, w);
        let early = window_from_end(&closes, 3 * w, 2 * w);

        let (recent_vol, mid_vol, early_vol) = (volatility(recent), volatility(mid), volatility(early));
        let mid_range = price_range(mid);
        if mid_vol <= 0.0 || early_vol <= 0.0 || mid_range <= 0.0 {
            return PatternResult::not_detected("No earlier price movement to contract from");
        }

        let recent_to_mid = recent_vol / mid_vol;
        let recent_to_early = recent_vol / early_vol;
        let range_contraction = price_range(recent) / mid_range;

        if !(recent_to_mid < self.max_recent_to_mid.get()
            && recent_to_early < self.max_recent_to_early.get()
            && range_contraction < self.max_range_contraction.get())
        {
            return PatternResult::not_detected(format!(
                "No volatility contraction (recent/mid volatility {recent_to_mid:.2}, range {range_contraction:.2})"
            ));
        }

        let volumes = series.volumes();
        let volume_decreasing = volumes.len() >= 2 * w
            && match (mean(trailing(&volumes, w)), mean(window_from_end(&volumes, 2 * w, w))) {
                (Some(recent), Some(prior)) => recent < prior * self.volume_dry_up.get(),
                _ => false,
            };

        let (strength, confidence) = if volume_decreasing {
            (Strength::Strong, Confidence::High)
        } else {
            (Strength::Weak, Confidence::Medium)
        };

        PatternResult::Detected(PatternMatch {
            pattern_id: PatternId::VolatilityContraction,
            direction: Direction::Bullish,
            confidence,
            strength,
            description: "Volatility contracting across the last three windows".into(),
            evidence: Evidence::Volatility {
                recent: recent_vol,
                mid: mid_vol,
                early: early_vol,
                range_contraction,
                volume_decreasing,
            },
            notes: vec![
                format!("Volatility reduced by {:.1}%", (1.0 - recent_to_mid) * 100.0),
                format!("Price range narrowed by {:.1}%", (1.0 - range_contraction) * 100.0),
                if volume_decreasing {
                    "Supporting volume decrease".to_string()
                } else {
                    "Limited volume confirmation".to_string()
                },
            ],
        })
    }

    fn validate_config(&self) -> Result<()> {
        for (field, ratio) in [
            ("max_recent_to_mid", self.max_recent_to_mid),
            ("max_recent_to_early", self.max_recent_to_early),
            ("max_range_contraction", self.max_range_contraction),
            ("volume_dry_up", self.volume_dry_up),
        ] {
            if Ratio::new(ratio.get()).is_err() {
                return Err(AnalysisError::OutOfRange {
                    field,
                    value: ratio.get(),
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if 2 * self.window.get() >= self.min_bars() {
            return Err(AnalysisError::InvalidConfig(format!(
                "VCP window {} leaves the earliest window empty at {} bars",
                self.window.get(),
                self.min_bars()
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Shrinking volatility and range over three trailing windows"
    }
}

// ============================================================
// DIVERGENCE
// ============================================================

/// Compare the last two extrema of price and indicator over aligned windows.
///
/// Bullish: price makes a lower low while the indicator makes a higher low.
/// Bearish: price makes a higher high while the indicator makes a lower high.
fn find_divergence(
    prices: &[f64],
    indicator: &[f64],
) -> Option<(Direction, [ExtremumPoint; 2], [ExtremumPoint; 2])> {
    let prices = trailing(prices, DIVERGENCE_WINDOW);
    let indicator = trailing(indicator, DIVERGENCE_WINDOW);

    if let (Some(p), Some(i)) = (last_pair(&find_troughs(prices)), last_pair(&find_troughs(indicator))) {
        if p[1].value < p[0].value && i[1].value > i[0].value {
            return Some((Direction::Bullish, p, i));
        }
    }

    if let (Some(p), Some(i)) = (last_pair(&find_peaks(prices)), last_pair(&find_peaks(indicator))) {
        if p[1].value > p[0].value && i[1].value < i[0].value {
            return Some((Direction::Bearish, p, i));
        }
    }

    None
}

fn divergence_result(
    pattern_id: PatternId,
    indicator_name: &str,
    found: Option<(Direction, [ExtremumPoint; 2], [ExtremumPoint; 2])>,
) -> PatternResult {
    let Some((direction, price, indicator)) = found else {
        return PatternResult::not_detected(format!(
            "No {indicator_name} divergence in the last {DIVERGENCE_WINDOW} bars"
        ));
    };

    let (side, price_move, indicator_move) = match direction {
        Direction::Bullish => ("Bullish", "lower low", "higher low"),
        _ => ("Bearish", "higher high", "lower high"),
    };

    PatternResult::Detected(PatternMatch {
        pattern_id,
        direction,
        confidence: Confidence::Medium,
        strength: Strength::Moderate,
        description: format!(
            "{side} {indicator_name} divergence: price made a {price_move} while {indicator_name} made a {indicator_move}"
        ),
        evidence: Evidence::Divergence { price, indicator },
        notes: vec![
            format!("Price {:.2} -> {:.2}", price[0].value, price[1].value),
            format!(
                "{indicator_name} {:.2} -> {:.2}",
                indicator[0].value, indicator[1].value
            ),
        ],
    })
}

/// RSI recomputed on every trailing `lookback + 1` window.
pub fn rsi_history(closes: &[f64], lookback: usize) -> Vec<f64> {
    (lookback..closes.len())
        .filter_map(|i| rsi(&closes[i - lookback..=i], lookback))
        .collect()
}

/// MACD line recomputed from windowed fast and slow EMAs at every bar.
pub fn macd_history(closes: &[f64]) -> Vec<f64> {
    (MACD_SLOW..closes.len())
        .filter_map(|i| {
            let fast = ema(&closes[i - MACD_FAST..=i], MACD_FAST)?;
            let slow = ema(&closes[i - MACD_SLOW..=i], MACD_SLOW)?;
            Some(fast - slow)
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct RsiDivergenceDetector;

impl PatternDetector for RsiDivergenceDetector {
    fn name(&self) -> &'static str {
        "rsi_divergence"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Signal
    }

    fn min_bars(&self) -> usize {
        30
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        let closes = series.closes();
        if closes.len() < self.min_bars() {
            return PatternResult::insufficient("RSI divergence", self.min_bars(), closes.len());
        }
        let history = rsi_history(&closes, RSI_LOOKBACK);
        divergence_result(
            PatternId::RsiDivergence,
            "RSI",
            find_divergence(&closes, &history),
        )
    }

    fn description(&self) -> &'static str {
        "Price extremes disagreeing with RSI extremes"
    }
}

#[derive(Debug, Clone, Default)]
pub struct MacdDivergenceDetector;

impl PatternDetector for MacdDivergenceDetector {
    fn name(&self) -> &'static str {
        "macd_divergence"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Signal
    }

    fn min_bars(&self) -> usize {
        MACD_SLOW + DIVERGENCE_WINDOW
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        let closes = series.closes();
        if closes.len() < self.min_bars() {
            return PatternResult::insufficient("MACD divergence", self.min_bars(), closes.len());
        }
        let history = macd_history(&closes);
        divergence_result(
            PatternId::MacdDivergence,
            "MACD",
            find_divergence(&closes, &history),
        )
    }

    fn description(&self) -> &'static str {
        "Price extremes disagreeing with MACD line extremes"
    }
}

// ============================================================
// MOVING AVERAGE CROSSOVER
// ============================================================

/// A short and a long moving average observed on the same bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaPair {
    pub short: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverState {
    /// Short average crossed above the long one on this bar.
    Golden,
    /// Short average crossed below the long one on this bar.
    Death,
    /// Averages within the near threshold without a confirmed cross.
    Forming,
    None,
}

/// Cross state from the current and previous bar's averages.
///
/// Order matters: swapping `current` and `previous` turns a confirmed cross
/// into at most a forming one.
pub fn classify_crossover(current: MaPair, previous: Option<MaPair>, near: f64) -> CrossoverState {
    if let Some(prev) = previous {
        if current.short > current.long && prev.short <= prev.long {
            return CrossoverState::Golden;
        }
        if current.short < current.long && prev.short >= prev.long {
            return CrossoverState::Death;
        }
    }
    if current.long != 0.0 && ((current.short - current.long) / current.long).abs() < near {
        return CrossoverState::Forming;
    }
    CrossoverState::None
}

/// SMA50 / SMA200 golden and death crosses.
#[derive(Debug, Clone)]
pub struct CrossoverDetector {
    /// Relative gap under which a cross is considered forming.
    pub near_threshold: Ratio,
    /// Last-bar volume surge that raises golden-cross confidence.
    pub volume_surge: f64,
}

impl Default for CrossoverDetector {
    fn default() -> Self {
        Self {
            near_threshold: Ratio::new_const(0.02),
            volume_surge: 1.2,
        }
    }
}

impl PatternDetector for CrossoverDetector {
    fn name(&self) -> &'static str {
        "moving_average_crossover"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Signal
    }

    fn min_bars(&self) -> usize {
        200
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        let closes = series.closes();
        let (Some(sma20), Some(sma50), Some(sma200)) =
            (sma(&closes, 20), sma(&closes, 50), sma(&closes, 200))
        else {
            return PatternResult::insufficient("crossover analysis", self.min_bars(), closes.len());
        };

        let before = &closes[..closes.len() - 1];
        let previous = match (sma(before, 50), sma(before, 200)) {
            (Some(short), Some(long)) => Some(MaPair { short, long }),
            _ => None,
        };
        let current = MaPair {
            short: sma50,
            long: sma200,
        };

        let state = classify_crossover(current, previous, self.near_threshold.get());
        let (pattern_id, direction, strength, confidence, description) = match state {
            CrossoverState::Golden => {
                let volumes = series.volumes();
                let surge = matches!(volumes.as_slice(), [.., prev, last] if *last > *prev * self.volume_surge);
                let confidence = if surge { Confidence::High } else { Confidence::Medium };
                (
                    PatternId::GoldenCross,
                    Direction::Bullish,
                    Strength::Strong,
                    confidence,
                    "Golden cross: SMA50 crossed above SMA200",
                )
            }
            CrossoverState::Death => (
                PatternId::DeathCross,
                Direction::Bearish,
                Strength::Strong,
                Confidence::High,
                "Death cross: SMA50 crossed below SMA200",
            ),
            CrossoverState::Forming => (
                PatternId::CrossoverForming,
                Direction::Neutral,
                Strength::Weak,
                Confidence::Low,
                "SMA50 and SMA200 converging",
            ),
            CrossoverState::None => {
                return PatternResult::not_detected(format!(
                    "No crossover: SMA50 {sma50:.2}, SMA200 {sma200:.2}"
                ));
            }
        };

        let confirmed = matches!(state, CrossoverState::Golden | CrossoverState::Death);
        let gap = (sma50 - sma200) / sma200 * 100.0;

        PatternResult::Detected(PatternMatch {
            pattern_id,
            direction,
            confidence,
            strength,
            description: description.into(),
            evidence: Evidence::Crossover {
                confirmed,
                sma20,
                sma50,
                sma200,
                previous_sma50: previous.map(|p| p.short),
                previous_sma200: previous.map(|p| p.long),
            },
            notes: vec![
                if confirmed {
                    "Confirmed crossover".to_string()
                } else {
                    "Unconfirmed crossover".to_string()
                },
                format!("SMA50 {gap:+.2}% vs SMA200"),
                format!("SMA20 at {sma20:.2}"),
            ],
        })
    }

    fn validate_config(&self) -> Result<()> {
        if Ratio::new(self.near_threshold.get()).is_err() {
            return Err(AnalysisError::OutOfRange {
                field: "near_threshold",
                value: self.near_threshold.get(),
                min: 0.0,
                max: 1.0,
            });
        }
        if !(self.volume_surge.is_finite() && self.volume_surge >= 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "volume_surge must be >= 1.0, got {}",
                self.volume_surge
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "SMA50 crossing SMA200, or about to"
    }
}

// ============================================================
// BREAKOUT SETUP
// ============================================================

/// Tight consolidation with price pressing against resistance.
#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    pub lookback: Period,
    /// Maximum `(resistance - support) / support`.
    pub max_range: Ratio,
    /// Price must be at least this share of resistance.
    pub proximity: Ratio,
    /// 5-bar to 20-bar average volume ratio marking a strong setup.
    pub volume_surge: f64,
}

impl Default for BreakoutDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(20),
            max_range: Ratio::new_const(0.05),
            proximity: Ratio::new_const(0.98),
            volume_surge: 1.5,
        }
    }
}

impl PatternDetector for BreakoutDetector {
    fn name(&self) -> &'static str {
        "breakout_setup"
    }

    fn category(&self) -> PatternCategory {
        PatternCategory::Signal
    }

    fn min_bars(&self) -> usize {
        30
    }

    fn detect(&self, series: &PriceSeries) -> PatternResult {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let available = closes.len().min(highs.len()).min(lows.len());
        if available < self.min_bars() {
            return PatternResult::insufficient("breakout analysis", self.min_bars(), available);
        }

        let n = self.lookback.get();
        let resistance = trailing(&highs, n).iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let support = trailing(&lows, n).iter().copied().fold(f64::INFINITY, f64::min);
        let Some(&current) = closes.last() else {
            return PatternResult::insufficient("breakout analysis", self.min_bars(), 0);
        };
        if support <= 0.0 {
            return PatternResult::not_detected("Non-positive support level");
        }

        let range_percent = (resistance - support) / support * 100.0;
        if range_percent >= self.max_range.get() * 100.0 {
            return PatternResult::not_detected(format!(
                "Range too wide for a breakout setup ({range_percent:.1}%)"
            ));
        }
        if current < resistance * self.proximity.get() {
            return PatternResult::not_detected(format!(
                "Price {current:.2} not near resistance {resistance:.2}"
            ));
        }

        let volumes = series.volumes();
        let avg = |k: usize| {
            if volumes.len() > k {
                mean(trailing(&volumes, k)).unwrap_or(0.0)
            } else {
                0.0
            }
        };
        let (avg5, avg20) = (avg(5), avg(20));
        let strong_volume = avg20 > 0.0 && avg5 > avg20 * self.volume_surge;

        let (strength, confidence) = if strong_volume {
            (Strength::Strong, Confidence::High)
        } else {
            (Strength::Moderate, Confidence::Medium)
        };

        PatternResult::Detected(PatternMatch {
            pattern_id: PatternId::BreakoutSetup,
            direction: Direction::Bullish,
            confidence,
            strength,
            description: format!("Price testing resistance after a {range_percent:.1}% consolidation"),
            evidence: Evidence::Breakout {
                resistance,
                support,
                range_percent,
                current_price: current,
            },
            notes: vec![
                format!("Consolidation range: {range_percent:.1}%"),
                format!("Resistance at {resistance:.2}"),
                format!("Current price: {current:.2}"),
                if strong_volume {
                    "Above-average volume".to_string()
                } else {
                    "Normal volume".to_string()
                },
            ],
        })
    }

    fn validate_config(&self) -> Result<()> {
        for (field, ratio) in [("max_range", self.max_range), ("proximity", self.proximity)] {
            if Ratio::new(ratio.get()).is_err() {
                return Err(AnalysisError::OutOfRange {
                    field,
                    value: ratio.get(),
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if self.lookback.get() > self.min_bars() {
            return Err(AnalysisError::InvalidConfig(format!(
                "breakout lookback {} exceeds {} bars",
                self.lookback.get(),
                self.min_bars()
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Narrow trailing range with price near its top"
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

const VCP_WINDOW: ParamMeta = ParamMeta::period("window", 20.0, (10.0, 24.0, 2.0), "Bars per volatility window");
const RECENT_TO_MID: ParamMeta = ParamMeta::ratio(
    "max_recent_to_mid",
    0.7,
    (0.5, 0.8, 0.1),
    "Recent volatility ceiling as a share of the middle window",
);
const RECENT_TO_EARLY: ParamMeta = ParamMeta::ratio(
    "max_recent_to_early",
    0.6,
    (0.4, 0.7, 0.1),
    "Recent volatility ceiling as a share of the earliest window",
);
const RANGE_CONTRACTION: ParamMeta = ParamMeta::ratio(
    "max_range_contraction",
    0.8,
    (0.6, 0.9, 0.1),
    "Recent range ceiling as a share of the middle window's range",
);
const VOLUME_DRY_UP: ParamMeta = ParamMeta::ratio(
    "volume_dry_up",
    0.8,
    (0.6, 0.9, 0.1),
    "Recent volume below this share of the prior window",
);

static VCP_PARAMS: &[ParamMeta] = &[VCP_WINDOW, RECENT_TO_MID, RECENT_TO_EARLY, RANGE_CONTRACTION, VOLUME_DRY_UP];

const NEAR_THRESHOLD: ParamMeta = ParamMeta::ratio(
    "near_threshold",
    0.02,
    (0.01, 0.05, 0.01),
    "Relative SMA50/SMA200 gap treated as a forming cross",
);
const CROSS_VOLUME_SURGE: ParamMeta = ParamMeta::factor(
    "volume_surge",
    1.2,
    (1.0, 2.0, 0.1),
    "Last-bar volume multiple that confirms a golden cross",
);

static CROSSOVER_PARAMS: &[ParamMeta] = &[NEAR_THRESHOLD, CROSS_VOLUME_SURGE];

const BREAKOUT_LOOKBACK: ParamMeta =
    ParamMeta::period("lookback", 20.0, (10.0, 30.0, 5.0), "Bars forming the consolidation");
const MAX_RANGE: ParamMeta = ParamMeta::ratio(
    "max_range",
    0.05,
    (0.02, 0.10, 0.01),
    "Widest consolidation relative to support",
);
const PROXIMITY: ParamMeta = ParamMeta::ratio(
    "proximity",
    0.98,
    (0.95, 0.99, 0.01),
    "Price as a share of resistance",
);
const BREAKOUT_VOLUME_SURGE: ParamMeta = ParamMeta::factor(
    "volume_surge",
    1.5,
    (1.0, 3.0, 0.25),
    "5-bar over 20-bar volume multiple marking a strong setup",
);

static BREAKOUT_PARAMS: &[ParamMeta] = &[BREAKOUT_LOOKBACK, MAX_RANGE, PROXIMITY, BREAKOUT_VOLUME_SURGE];

impl ParameterizedDetector for VolatilityContractionDetector {
    fn param_meta() -> &'static [ParamMeta] {
        VCP_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            window: params.period(&VCP_WINDOW)?,
            max_recent_to_mid: params.ratio(&RECENT_TO_MID)?,
            max_recent_to_early: params.ratio(&RECENT_TO_EARLY)?,
            max_range_contraction: params.ratio(&RANGE_CONTRACTION)?,
            volume_dry_up: params.ratio(&VOLUME_DRY_UP)?,
        })
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with(VCP_WINDOW.name, self.window.get() as f64)
            .with(RECENT_TO_MID.name, self.max_recent_to_mid.get())
            .with(RECENT_TO_EARLY.name, self.max_recent_to_early.get())
            .with(RANGE_CONTRACTION.name, self.max_range_contraction.get())
            .with(VOLUME_DRY_UP.name, self.volume_dry_up.get())
    }
}

// Divergence detectors run on fixed RSI/MACD settings and take no tunables.
impl ParameterizedDetector for RsiDivergenceDetector {
    fn param_meta() -> &'static [ParamMeta] {
        &[]
    }

    fn from_params(_params: &ParamSet) -> Result<Self> {
        Ok(Self)
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
    }
}

impl ParameterizedDetector for MacdDivergenceDetector {
    fn param_meta() -> &'static [ParamMeta] {
        &[]
    }

    fn from_params(_params: &ParamSet) -> Result<Self> {
        Ok(Self)
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
    }
}

impl ParameterizedDetector for CrossoverDetector {
    fn param_meta() -> &'static [ParamMeta] {
        CROSSOVER_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            near_threshold: params.ratio(&NEAR_THRESHOLD)?,
            volume_surge: params.factor(&CROSS_VOLUME_SURGE)?,
        })
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with(NEAR_THRESHOLD.name, self.near_threshold.get())
            .with(CROSS_VOLUME_SURGE.name, self.volume_surge)
    }
}

impl ParameterizedDetector for BreakoutDetector {
    fn param_meta() -> &'static [ParamMeta] {
        BREAKOUT_PARAMS
    }

    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            lookback: params.period(&BREAKOUT_LOOKBACK)?,
            max_range: params.ratio(&MAX_RANGE)?,
            proximity: params.ratio(&PROXIMITY)?,
            volume_surge: params.factor(&BREAKOUT_VOLUME_SURGE)?,
        })
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with(BREAKOUT_LOOKBACK.name, self.lookback.get() as f64)
            .with(MAX_RANGE.name, self.max_range.get())
            .with(PROXIMITY.name, self.proximity.get())
            .with(BREAKOUT_VOLUME_SURGE.name, self.volume_surge)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, SeriesMeta};

    fn series_with(closes: &[f64], volumes: &[f64]) -> PriceSeries {
        let last = *closes.last().unwrap();
        let bars = closes.iter().zip(volumes).enumerate().map(|(i, (&c, &v))| {
            Bar::new(i as i64 * 86_400, c, c * 1.005, c * 0.995, v)
        });
        PriceSeries::from_bars(SeriesMeta::quoted("SIG", last, last), bars).unwrap()
    }

    fn series(closes: &[f64]) -> PriceSeries {
        series_with(closes, &vec![1_000.0; closes.len()])
    }

    /// Zig-zag around `base` with the given relative amplitude.
    fn zigzag(n: usize, base: f64, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| if i % 2 == 0 { base * (1.0 + amplitude) } else { base * (1.0 - amplitude) })
            .collect()
    }

    #[test]
    fn test_vcp_insufficient() {
        let result = VolatilityContractionDetector::default().detect(&series(&[10.0; 12]));
        assert_eq!(
            result.reason(),
            Some("Insufficient data for VCP analysis: need 50 bars, got 12")
        );
    }

    #[test]
    fn test_vcp_detected_with_volume_dry_up() {
        let mut closes = zigzag(20, 100.0, 0.04);
        closes.extend(zigzag(20, 100.0, 0.02));
        closes.extend(zigzag(20, 100.0, 0.005));
        let mut volumes = vec![2_000.0; 40];
        volumes.extend(vec![1_000.0; 20]);

        let m = VolatilityContractionDetector::default()
            .detect(&series_with(&closes, &volumes))
            .into_match()
            .unwrap();
        assert_eq!(m.pattern_id, PatternId::VolatilityContraction);
        assert_eq!(m.strength, Strength::Strong);
        assert_eq!(m.notes[2], "Supporting volume decrease");
    }

    #[test]
    fn test_vcp_expanding_volatility() {
        let mut closes = zigzag(20, 100.0, 0.005);
        closes.extend(zigzag(20, 100.0, 0.02));
        closes.extend(zigzag(20, 100.0, 0.04));
        assert!(!VolatilityContractionDetector::default().detect(&series(&closes)).is_detected());
    }

    #[test]
    fn test_vcp_flat_history_not_detected() {
        let result = VolatilityContractionDetector::default().detect(&series(&[50.0; 60]));
        assert!(!result.is_detected());
    }

    #[test]
    fn test_find_divergence_bullish() {
        // price: lower low at the second trough; indicator: higher low
        let prices = [10.0, 8.0, 10.0, 11.0, 7.0, 9.0];
        let indicator = [50.0, 30.0, 50.0, 55.0, 35.0, 45.0];
        let (direction, price, ind) = find_divergence(&prices, &indicator).unwrap();
        assert_eq!(direction, Direction::Bullish);
        assert_eq!([price[0].index, price[1].index], [1, 4]);
        assert!(ind[1].value > ind[0].value);
    }

    #[test]
    fn test_find_divergence_bearish() {
        let prices = [10.0, 12.0, 10.0, 9.0, 13.0, 11.0];
        let indicator = [50.0, 70.0, 50.0, 45.0, 65.0, 55.0];
        let (direction, _, _) = find_divergence(&prices, &indicator).unwrap();
        assert_eq!(direction, Direction::Bearish);
    }

    #[test]
    fn test_find_divergence_confirming_moves() {
        let prices = [10.0, 8.0, 10.0, 11.0, 7.0, 9.0];
        let indicator = [50.0, 30.0, 50.0, 55.0, 25.0, 45.0];
        assert!(find_divergence(&prices, &indicator).is_none());
    }

    #[test]
    fn test_divergence_histories() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + f64::from(i)).collect();
        assert_eq!(rsi_history(&closes, RSI_LOOKBACK).len(), 26);
        assert_eq!(macd_history(&closes).len(), 14);

        let short = RsiDivergenceDetector.detect(&series(&closes[..20]));
        assert!(short.reason().unwrap().contains("need 30 bars"));
        let short = MacdDivergenceDetector.detect(&series(&closes));
        assert!(short.reason().unwrap().contains("need 41 bars"));
    }

    fn divergence_points(result: &PatternResult) -> (Direction, [ExtremumPoint; 2], [ExtremumPoint; 2]) {
        let m = result.as_match().expect("divergence detected");
        match &m.evidence {
            Evidence::Divergence { price, indicator } => (m.direction, *price, *indicator),
            other => panic!("unexpected evidence {other:?}"),
        }
    }

    #[test]
    fn test_rsi_divergence_on_series() {
        // chop, a sharp flush to 82, rebound, then a slow slide to a marginally lower 81
        let mut closes: Vec<f64> = (0..25).map(|i| if i % 2 == 1 { 101.0 } else { 100.0 }).collect();
        closes.extend([
            100.0, 94.0, 88.0, 82.0, 86.0, 90.0, 91.0, 90.0, 89.0, 88.0, 87.0, 86.0, 85.0, 81.0, 83.0, 84.0,
        ]);

        let (direction, price, indicator) = divergence_points(&RsiDivergenceDetector.detect(&series(&closes)));
        assert_eq!(direction, Direction::Bullish);

        let start = closes.len() - DIVERGENCE_WINDOW;
        assert_eq!([price[0].index, price[1].index], [2, 12]);
        for point in price {
            assert_eq!(point.value, closes[start + point.index]);
        }
        // indicator extrema sit on the same trailing bars as the prices they are compared with
        for point in indicator {
            assert!(point.index < DIVERGENCE_WINDOW);
            let bar = start + point.index;
            assert_eq!(Some(point.value), rsi(&closes[bar - RSI_LOOKBACK..=bar], RSI_LOOKBACK));
        }
        assert!(indicator[1].value > indicator[0].value);
    }

    #[test]
    fn test_macd_divergence_on_series() {
        // rising trend under a fading oscillation: higher price peaks, weaker momentum
        let closes: Vec<f64> = (0..60)
            .map(|i| {
                let t = f64::from(i);
                100.0 + 0.5 * t + 10.0 * 0.97f64.powi(i) * (std::f64::consts::TAU * t / 6.0).sin()
            })
            .collect();

        let (direction, price, indicator) = divergence_points(&MacdDivergenceDetector.detect(&series(&closes)));
        assert_eq!(direction, Direction::Bearish);

        let start = closes.len() - DIVERGENCE_WINDOW;
        assert_eq!([price[0].index, price[1].index], [5, 11]);
        assert_eq!([indicator[0].index, indicator[1].index], [4, 10]);
        assert!(price[1].value > price[0].value);
        assert!(indicator[1].value < indicator[0].value);
        for point in price {
            assert_eq!(point.value, closes[start + point.index]);
        }
        for point in indicator {
            let bar = start + point.index;
            let fast = ema(&closes[bar - MACD_FAST..=bar], MACD_FAST).unwrap();
            let slow = ema(&closes[bar - MACD_SLOW..=bar], MACD_SLOW).unwrap();
            assert_eq!(point.value, fast - slow);
        }
    }

    #[test]
    fn test_classify_crossover_order_sensitive() {
        let above = MaPair { short: 101.0, long: 100.0 };
        let equal = MaPair { short: 100.0, long: 100.0 };

        assert_eq!(classify_crossover(above, Some(equal), 0.02), CrossoverState::Golden);
        assert_eq!(classify_crossover(equal, Some(above), 0.02), CrossoverState::Forming);

        let below = MaPair { short: 99.0, long: 100.0 };
        assert_eq!(classify_crossover(below, Some(equal), 0.02), CrossoverState::Death);
        assert_eq!(classify_crossover(below, None, 0.02), CrossoverState::Forming);

        let far = MaPair { short: 110.0, long: 100.0 };
        assert_eq!(classify_crossover(far, Some(far), 0.02), CrossoverState::None);
    }

    #[test]
    fn test_crossover_insufficient_below_200() {
        let closes: Vec<f64> = (0..150).map(|i| 100.0 + f64::from(i)).collect();
        let result = CrossoverDetector::default().detect(&series(&closes));
        assert!(!result.is_detected());
        assert!(result.reason().unwrap().starts_with("Insufficient data"));
    }

    #[test]
    fn test_golden_cross_with_volume_surge() {
        // 199 flat bars then a jump: SMA50 rises above SMA200 on the last bar only
        let mut closes = vec![100.0; 200];
        closes.push(200.0);
        let mut volumes = vec![1_000.0; 200];
        volumes.push(5_000.0);

        let m = CrossoverDetector::default()
            .detect(&series_with(&closes, &volumes))
            .into_match()
            .unwrap();
        assert_eq!(m.pattern_id, PatternId::GoldenCross);
        assert_eq!(m.confidence, Confidence::High);
        assert_eq!(m.notes[0], "Confirmed crossover");
    }

    #[test]
    fn test_death_cross() {
        let mut closes = vec![100.0; 200];
        closes.push(10.0);
        let m = CrossoverDetector::default().detect(&series(&closes)).into_match().unwrap();
        assert_eq!(m.pattern_id, PatternId::DeathCross);
        assert_eq!(m.direction, Direction::Bearish);
    }

    #[test]
    fn test_breakout_setup() {
        let mut closes: Vec<f64> = (0..20).map(|i| 80.0 + f64::from(i)).collect();
        closes.extend(zigzag(19, 100.0, 0.01));
        closes.push(100.8);
        let mut volumes = vec![1_000.0; 35];
        volumes.extend(vec![3_000.0; 5]);

        let m = BreakoutDetector::default()
            .detect(&series_with(&closes, &volumes))
            .into_match()
            .unwrap();
        assert_eq!(m.pattern_id, PatternId::BreakoutSetup);
        assert_eq!(m.strength, Strength::Strong);
        assert_eq!(m.notes[3], "Above-average volume");
    }

    #[test]
    fn test_breakout_rejects_wide_range() {
        let closes: Vec<f64> = (0..40).map(|i| 80.0 + f64::from(i)).collect();
        let result = BreakoutDetector::default().detect(&series(&closes));
        assert!(result.reason().unwrap().starts_with("Range too wide"));
    }

    #[test]
    fn test_breakout_price_below_resistance() {
        let mut closes = zigzag(39, 100.0, 0.01);
        closes.push(98.0);
        let result = BreakoutDetector::default().detect(&series(&closes));
        assert!(result.reason().unwrap().contains("not near resistance"));
    }
}
