//! Series store: one immutable OHLCV history per symbol and range.
//!
//! Columns are index-aligned with `timestamps` and may contain gaps (`None`).
//! Gaps are dropped by the filtered accessors and are never treated as zero.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Result};

// ============================================================
// HISTORY RANGE
// ============================================================

/// Amount of history requested from a data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl HistoryRange {
    pub const ALL: [HistoryRange; 6] = [
        HistoryRange::OneMonth,
        HistoryRange::ThreeMonths,
        HistoryRange::SixMonths,
        HistoryRange::OneYear,
        HistoryRange::TwoYears,
        HistoryRange::FiveYears,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryRange::OneMonth => "1mo",
            HistoryRange::ThreeMonths => "3mo",
            HistoryRange::SixMonths => "6mo",
            HistoryRange::OneYear => "1y",
            HistoryRange::TwoYears => "2y",
            HistoryRange::FiveYears => "5y",
        }
    }

    /// Calendar days covered by the range.
    pub fn days(self) -> i64 {
        match self {
            HistoryRange::OneMonth => 30,
            HistoryRange::ThreeMonths => 90,
            HistoryRange::SixMonths => 180,
            HistoryRange::OneYear => 365,
            HistoryRange::TwoYears => 730,
            HistoryRange::FiveYears => 1825,
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        HistoryRange::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or(AnalysisError::InvalidValue(
                "history range must be one of 1mo, 3mo, 6mo, 1y, 2y, 5y",
            ))
    }
}

// ============================================================
// INSTRUMENT METADATA
// ============================================================

/// Instrument metadata reported by the data source alongside the bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub symbol: String,
    pub currency: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub company_name: String,
    /// Set when the source substituted generated demo data.
    #[serde(default)]
    pub is_mock_data: bool,
}

impl SeriesMeta {
    /// Metadata with a quoted price; the company name defaults to the symbol.
    pub fn quoted(symbol: impl Into<String>, current_price: f64, previous_close: f64) -> Self {
        let symbol = symbol.into().to_uppercase();
        Self {
            company_name: symbol.clone(),
            symbol,
            currency: "USD".to_string(),
            current_price,
            previous_close,
            is_mock_data: false,
        }
    }

    pub fn with_company(mut self, name: impl Into<String>) -> Self {
        self.company_name = name.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

// ============================================================
// BARS
// ============================================================

/// One row of a row-oriented source. Any column may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    /// A complete bar.
    pub fn new(timestamp: i64, close: f64, high: f64, low: f64, volume: f64) -> Self {
        Self {
            timestamp,
            close: Some(close),
            high: Some(high),
            low: Some(low),
            volume: Some(volume),
        }
    }
}

// ============================================================
// PRICE SERIES
// ============================================================

/// Validated, read-only price history for one symbol.
///
/// Construction is the only place malformed data is rejected; every
/// indicator and detector downstream can rely on at least one close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    timestamps: Vec<i64>,
    close: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
    meta: SeriesMeta,
}

impl PriceSeries {
    pub fn new(
        meta: SeriesMeta,
        timestamps: Vec<i64>,
        close: Vec<Option<f64>>,
        high: Vec<Option<f64>>,
        low: Vec<Option<f64>>,
        volume: Vec<Option<f64>>,
    ) -> Result<Self> {
        let len = timestamps.len();
        if len == 0 {
            return Err(AnalysisError::MalformedSeries(format!(
                "{}: series has no bars",
                meta.symbol
            )));
        }

        for (name, column) in [("close", &close), ("high", &high), ("low", &low), ("volume", &volume)]
        {
            if column.len() != len {
                return Err(AnalysisError::MalformedSeries(format!(
                    "{}: {name} has {} values, expected {len}",
                    meta.symbol,
                    column.len()
                )));
            }
            if let Some(index) = column
                .iter()
                .position(|v| v.is_some_and(|v| !v.is_finite()))
            {
                return Err(AnalysisError::MalformedSeries(format!(
                    "{}: non-finite {name} at index {index}",
                    meta.symbol
                )));
            }
        }

        if let Some(index) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AnalysisError::MalformedSeries(format!(
                "{}: timestamps not strictly increasing at index {}",
                meta.symbol,
                index + 1
            )));
        }

        if close.iter().all(Option::is_none) {
            return Err(AnalysisError::MalformedSeries(format!(
                "{}: no usable closes",
                meta.symbol
            )));
        }

        Ok(Self {
            timestamps,
            close,
            high,
            low,
            volume,
            meta,
        })
    }

    /// Build from row-oriented bars.
    pub fn from_bars(meta: SeriesMeta, bars: impl IntoIterator<Item = Bar>) -> Result<Self> {
        let bars: Vec<Bar> = bars.into_iter().collect();
        Self::new(
            meta,
            bars.iter().map(|b| b.timestamp).collect(),
            bars.iter().map(|b| b.close).collect(),
            bars.iter().map(|b| b.high).collect(),
            bars.iter().map(|b| b.low).collect(),
            bars.iter().map(|b| b.volume).collect(),
        )
    }

    #[inline]
    pub fn meta(&self) -> &SeriesMeta {
        &self.meta
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.meta.symbol
    }

    #[inline]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Number of bars, including bars with gaps.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Always false for a constructed series; present for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Raw close at a bar index, `None` for a gap or out of range.
    #[inline]
    pub fn close_at(&self, index: usize) -> Option<f64> {
        self.close.get(index).copied().flatten()
    }

    pub fn closes(&self) -> Vec<f64> {
        filtered(&self.close)
    }

    pub fn highs(&self) -> Vec<f64> {
        filtered(&self.high)
    }

    pub fn lows(&self) -> Vec<f64> {
        filtered(&self.low)
    }

    pub fn volumes(&self) -> Vec<f64> {
        filtered(&self.volume)
    }

    /// Last non-null close.
    pub fn last_close(&self) -> Option<f64> {
        self.close.iter().rev().find_map(|v| *v)
    }
}

fn filtered(column: &[Option<f64>]) -> Vec<f64> {
    column.iter().flatten().copied().collect()
}

// ============================================================
// TESTS
// ============================================================
