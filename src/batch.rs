//! Batch analysis over many symbols
//!
//! Fetching is delegated to a [`SeriesSource`]; the crate ships no network
//! client. [`BatchAnalyzer`] fetches symbols one at a time with a delay in
//! between to respect upstream rate limits, and [`analyze_parallel`] fans
//! already-fetched series out over rayon. In both, one symbol's failure is
//! reported next to the other symbols' results and never aborts the batch.

use std::collections::HashMap;
use std::fmt;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    scoring::Recommendation,
    summary::{summarize, Summary},
    AnalysisError, EngineBuilder, EngineConfig, HistoryRange, PatternEngine, PriceSeries, Result,
};

// ============================================================
// DATA SOURCE
// ============================================================

/// Upstream provider of price histories.
pub trait SeriesSource {
    /// Fetch `symbol` over `range`, or fail with [`AnalysisError::DataUnavailable`].
    fn fetch(&self, symbol: &str, range: HistoryRange) -> Result<PriceSeries>;
}

impl<F> SeriesSource for F
where
    F: Fn(&str, HistoryRange) -> Result<PriceSeries>,
{
    fn fetch(&self, symbol: &str, range: HistoryRange) -> Result<PriceSeries> {
        self(symbol, range)
    }
}

/// In-memory source keyed by upper-cased symbol. Ignores the range.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    series: HashMap<String, PriceSeries>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_uppercase(), series);
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl SeriesSource for StaticSource {
    fn fetch(&self, symbol: &str, range: HistoryRange) -> Result<PriceSeries> {
        self.series
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| {
                AnalysisError::data_unavailable(symbol, format!("no {range} history available"))
            })
    }
}

// ============================================================
// RESULTS
// ============================================================

/// Analysis of one symbol
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub symbol: String,
    pub summary: Summary,
    pub recommendation: Recommendation,
}

/// Failure for one symbol
#[derive(Debug, Clone)]
pub struct BatchError {
    pub symbol: String,
    pub error: AnalysisError,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.symbol, self.error)
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn report(engine: &PatternEngine, series: &PriceSeries) -> BatchReport {
    BatchReport {
        symbol: series.symbol().to_string(),
        summary: summarize(series),
        recommendation: engine.analyze(series),
    }
}

fn split(results: Vec<std::result::Result<BatchReport, BatchError>>) -> (Vec<BatchReport>, Vec<BatchError>) {
    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// SEQUENTIAL BATCH
// ============================================================

/// Batch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub range: HistoryRange,
    /// Pause between consecutive fetches.
    pub delay_ms: u64,
    /// Engine built over every builtin detector.
    pub engine: EngineConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            range: HistoryRange::OneYear,
            delay_ms: 100,
            engine: EngineConfig::default(),
        }
    }
}

/// Fetches and analyzes symbols one at a time.
pub struct BatchAnalyzer<S> {
    source: S,
    engine: PatternEngine,
    config: BatchConfig,
}

impl<S: SeriesSource> BatchAnalyzer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            engine: PatternEngine::default(),
            config: BatchConfig::default(),
        }
    }

    pub fn with_engine(mut self, engine: PatternEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the configuration and rebuild the engine from `config.engine`.
    pub fn with_config(mut self, config: BatchConfig) -> Result<Self> {
        self.engine = EngineBuilder::new()
            .with_all_defaults()
            .config(config.engine.clone())
            .build()?;
        self.config = config;
        Ok(self)
    }

    pub fn engine(&self) -> &PatternEngine {
        &self.engine
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Analyze every symbol in order. Results keep the input order.
    pub fn run<T: AsRef<str>>(&self, symbols: &[T]) -> (Vec<BatchReport>, Vec<BatchError>) {
        let delay = Duration::from_millis(self.config.delay_ms);
        let mut results = Vec::with_capacity(symbols.len());

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            results.push(self.analyze_one(symbol.as_ref()));
        }

        split(results)
    }

    fn analyze_one(&self, symbol: &str) -> std::result::Result<BatchReport, BatchError> {
        log::info!("{symbol}: fetching {} history", self.config.range);

        match self.source.fetch(symbol, self.config.range) {
            Ok(series) => {
                let report = report(&self.engine, &series);
                log::info!(
                    "{symbol}: {} (score {})",
                    report.recommendation.label,
                    report.recommendation.score
                );
                Ok(report)
            }
            Err(error) => {
                log::warn!("{symbol}: {error}");
                Err(BatchError {
                    symbol: symbol.to_string(),
                    error,
                })
            }
        }
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

/// Analyze already-fetched series in parallel.
///
/// Each item pairs the requested symbol with its fetch outcome; failed
/// fetches are passed through as [`BatchError`]s.
pub fn analyze_parallel<I>(engine: &PatternEngine, instruments: I) -> (Vec<BatchReport>, Vec<BatchError>)
where
    I: IntoParallelIterator<Item = (String, Result<PriceSeries>)>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, fetched)| {
            fetched
                .map(|series| report(engine, &series))
                .map_err(|error| BatchError { symbol, error })
        })
        .collect();

    split(results)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, SeriesMeta};

    fn series(symbol: &str, n: usize) -> PriceSeries {
        let bars = (0..n).map(|i| {
            let c = 50.0 + i as f64;
            Bar::new(i as i64 * 86_400, c, c + 1.0, c - 1.0, 1_000.0)
        });
        let last = 50.0 + (n - 1) as f64;
        PriceSeries::from_bars(SeriesMeta::quoted(symbol, last, last - 1.0), bars).unwrap()
    }

    fn no_delay() -> BatchConfig {
        BatchConfig {
            delay_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_static_source_missing_symbol() {
        let source = StaticSource::new().with(series("aaa", 10));
        assert!(source.fetch("AAA", HistoryRange::OneYear).is_ok());
        let err = source.fetch("zzz", HistoryRange::SixMonths).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable { .. }));
        assert!(err.to_string().contains("6mo"));
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let source = StaticSource::new().with(series("GOOD", 60)).with(series("GOOD2", 60));
        let analyzer = BatchAnalyzer::new(source).with_config(no_delay()).unwrap();

        let (reports, errors) = analyzer.run(&["GOOD", "BAD", "GOOD2"]);
        let symbols: Vec<&str> = reports.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["GOOD", "GOOD2"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
    }

    #[test]
    fn test_closure_source() {
        let source = |symbol: &str, _range: HistoryRange| -> Result<PriceSeries> {
            if symbol == "ERR" {
                Err(AnalysisError::data_unavailable(symbol, "upstream timeout"))
            } else {
                Ok(series(symbol, 30))
            }
        };
        let (reports, errors) = BatchAnalyzer::new(source)
            .with_config(no_delay())
            .unwrap()
            .run(&["A", "ERR"]);
        assert_eq!(reports.len(), 1);
        assert_eq!(errors[0].to_string(), "ERR: Data unavailable for ERR: upstream timeout");
    }

    #[test]
    fn test_analyze_parallel() {
        let engine = PatternEngine::default();
        let fetched = vec![
            ("ONE".to_string(), Ok(series("ONE", 40))),
            (
                "TWO".to_string(),
                Err(AnalysisError::data_unavailable("TWO", "not listed")),
            ),
            ("THREE".to_string(), Ok(series("THREE", 250))),
        ];
        let (reports, errors) = analyze_parallel(&engine, fetched);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].symbol, "ONE");
        assert_eq!(errors[0].symbol, "TWO");
    }

    #[test]
    fn test_batch_config_defaults() {
        let config: BatchConfig = serde_json::from_str(r#"{"range":"6mo"}"#).unwrap();
        assert_eq!(config.range, HistoryRange::SixMonths);
        assert_eq!(config.delay_ms, 100);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_batch_config_tunes_engine() {
        let config: BatchConfig = serde_json::from_str(
            r#"{"delay_ms": 0, "engine": {"detectors": {"moving_average_crossover": {"near_threshold": 0.05}}}}"#,
        )
        .unwrap();
        let analyzer = BatchAnalyzer::new(StaticSource::new()).with_config(config).unwrap();
        let params = analyzer.engine().detector_params("moving_average_crossover").unwrap();
        assert_eq!(params.get("near_threshold"), Some(0.05));

        let bad = BatchConfig {
            engine: EngineConfig {
                detectors: [("breakout_setup".to_string(), crate::params::ParamSet::new().with("proximity", 1.5))]
                    .into_iter()
                    .collect(),
                ..Default::default()
            },
            ..no_delay()
        };
        assert!(BatchAnalyzer::new(StaticSource::new()).with_config(bad).is_err());
    }
}
