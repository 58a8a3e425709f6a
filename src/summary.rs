//! Price summary: quoted price, trailing percent changes and indicators.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{indicators::IndicatorSnapshot, PriceSeries};

/// Lookback spans for the trailing changes, in calendar days.
pub const WEEK_DAYS: i64 = 7;
pub const MONTH_DAYS: i64 = 30;
pub const HALF_YEAR_DAYS: i64 = 180;
pub const YEAR_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub symbol: String,
    pub company_name: String,
    pub currency: String,
    pub current_price: f64,
    /// Against the quoted previous close.
    pub change_1d: Option<f64>,
    pub change_1w: Option<f64>,
    pub change_1m: Option<f64>,
    pub change_6m: Option<f64>,
    pub change_1y: Option<f64>,
    pub indicators: IndicatorSnapshot,
}

fn percent_change(current: f64, base: f64) -> Option<f64> {
    (base != 0.0).then(|| (current - base) / base * 100.0)
}

/// Change from the close of the first bar at or after `now - days`.
///
/// `None` when the series starts after the cutoff (it does not span that far
/// back), when no bar is that recent, or when that bar has no close.
fn change_since(series: &PriceSeries, now: DateTime<Utc>, days: i64) -> Option<f64> {
    let cutoff = (now - Duration::days(days)).timestamp();
    let index = series.timestamps().iter().position(|&t| t >= cutoff)?;
    if index == 0 {
        return None;
    }
    percent_change(series.meta().current_price, series.close_at(index)?)
}

/// Summarize against an explicit clock.
pub fn summarize_at(series: &PriceSeries, now: DateTime<Utc>) -> Summary {
    let meta = series.meta();
    Summary {
        symbol: meta.symbol.clone(),
        company_name: meta.company_name.clone(),
        currency: meta.currency.clone(),
        current_price: meta.current_price,
        change_1d: percent_change(meta.current_price, meta.previous_close),
        change_1w: change_since(series, now, WEEK_DAYS),
        change_1m: change_since(series, now, MONTH_DAYS),
        change_6m: change_since(series, now, HALF_YEAR_DAYS),
        change_1y: change_since(series, now, YEAR_DAYS),
        indicators: IndicatorSnapshot::compute(series),
    }
}

/// Summarize against the current wall clock.
pub fn summarize(series: &PriceSeries) -> Summary {
    summarize_at(series, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, SeriesMeta};

    const DAY: i64 = 86_400;
    const START: i64 = 1_600_000_000;

    fn daily_series(n: usize, current: f64, previous: f64) -> PriceSeries {
        let bars = (0..n).map(|i| {
            let c = 100.0 + i as f64;
            Bar::new(START + i as i64 * DAY, c, c, c, 1_000.0)
        });
        PriceSeries::from_bars(SeriesMeta::quoted("sum", current, previous).with_company("Summary Co"), bars)
            .unwrap()
    }

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn test_trailing_changes() {
        let series = daily_series(400, 499.0, 498.0);
        let summary = summarize_at(&series, at(START + 399 * DAY));

        assert_eq!(summary.symbol, "SUM");
        assert_eq!(summary.company_name, "Summary Co");
        let expect = |base: f64| (499.0 - base) / base * 100.0;
        assert!((summary.change_1d.unwrap() - expect(498.0)).abs() < 1e-9);
        assert!((summary.change_1w.unwrap() - expect(492.0)).abs() < 1e-9);
        assert!((summary.change_1m.unwrap() - expect(469.0)).abs() < 1e-9);
        assert!((summary.change_6m.unwrap() - expect(319.0)).abs() < 1e-9);
        assert!((summary.change_1y.unwrap() - expect(134.0)).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_leaves_long_changes_unavailable() {
        let series = daily_series(20, 119.0, 118.0);
        let summary = summarize_at(&series, at(START + 19 * DAY));
        assert!(summary.change_1w.is_some());
        assert!(summary.change_1m.is_none());
        assert!(summary.change_1y.is_none());
    }

    #[test]
    fn test_stale_series_has_no_recent_bar() {
        let series = daily_series(20, 119.0, 118.0);
        let summary = summarize_at(&series, at(START + 500 * DAY));
        assert!(summary.change_1w.is_none());
    }

    #[test]
    fn test_zero_previous_close() {
        let series = daily_series(3, 10.0, 0.0);
        assert!(summarize(&series).change_1d.is_none());
    }
}
