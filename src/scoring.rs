//! Recommendation scorer
//!
//! Folds an [`IndicatorSnapshot`] into a signed integer score using fixed
//! weights, then maps the score onto a five-step [`Label`]. Detector output
//! rides along in the [`Recommendation`] but never moves the score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{indicators::IndicatorSnapshot, PatternEngine, PatternResult, PriceSeries};

/// Reasoning used when no rule fired.
pub const NEUTRAL_REASONING: &str = "Neutral indicators";

// ============================================================
// LABEL
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl Label {
    /// ≥5 strong buy, ≥2 buy, ≥-1 hold, ≥-4 sell, otherwise strong sell.
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 5 => Label::StrongBuy,
            s if s >= 2 => Label::Buy,
            s if s >= -1 => Label::Hold,
            s if s >= -4 => Label::Sell,
            _ => Label::StrongSell,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::StrongSell => "STRONG SELL",
            Label::Sell => "SELL",
            Label::Hold => "HOLD",
            Label::Buy => "BUY",
            Label::StrongBuy => "STRONG BUY",
        }
    }

    #[inline]
    pub fn is_buy(self) -> bool {
        matches!(self, Label::Buy | Label::StrongBuy)
    }

    #[inline]
    pub fn is_sell(self) -> bool {
        matches!(self, Label::Sell | Label::StrongSell)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// SCORING RULES
// ============================================================

/// Accumulates score deltas and their reasons in rule order.
#[derive(Debug, Default)]
struct Tally {
    score: i32,
    reasoning: Vec<String>,
}

impl Tally {
    fn add(&mut self, delta: i32, reason: &str) {
        self.score += delta;
        self.reasoning.push(reason.to_string());
    }
}

/// Score a snapshot. Unavailable indicators contribute nothing.
pub fn score(snapshot: &IndicatorSnapshot) -> (i32, Vec<String>) {
    let price = snapshot.current_price;
    let mut tally = Tally::default();

    if let Some(rsi) = snapshot.rsi {
        if rsi < 30.0 {
            tally.add(2, "RSI oversold (< 30)");
        } else if rsi > 70.0 {
            tally.add(-2, "RSI overbought (> 70)");
        } else if rsi < 50.0 {
            tally.add(1, "RSI bullish momentum");
        } else {
            tally.add(-1, "RSI bearish momentum");
        }
    }

    // Moving averages only count once the full 20/50/200 stack exists.
    if let (Some(sma20), Some(sma50), Some(sma200)) = (snapshot.sma20, snapshot.sma50, snapshot.sma200) {
        let above = [sma20, sma50, sma200].iter().filter(|&&sma| price > sma).count();
        tally.score += above as i32;

        if sma20 > sma50 && sma50 > sma200 {
            tally.add(1, "Golden cross pattern");
        } else if sma20 < sma50 && sma50 < sma200 {
            tally.add(-1, "Death cross pattern");
        }
        if price < sma20 && price < sma50 && price < sma200 {
            tally.add(-2, "Price below all major MAs");
        }
    }

    if let Some(macd) = snapshot.macd {
        if macd.macd_line > 0.0 {
            tally.add(2, "Bullish MACD");
        } else if macd.macd_line < 0.0 {
            tally.add(-2, "Bearish MACD");
        }
    }

    if let Some(bands) = snapshot.bollinger {
        if price < bands.lower {
            tally.add(1, "Near lower Bollinger Band");
        } else if price > bands.upper {
            tally.add(-1, "Near upper Bollinger Band");
        }
    }

    if let Some(stochastic) = snapshot.stochastic {
        if stochastic.k < 20.0 {
            tally.add(1, "Stochastic oversold");
        } else if stochastic.k > 80.0 {
            tally.add(-1, "Stochastic overbought");
        }
    }

    if tally.reasoning.is_empty() {
        tally.reasoning.push(NEUTRAL_REASONING.to_string());
    }
    (tally.score, tally.reasoning)
}

// ============================================================
// RECOMMENDATION
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub label: Label,
    pub score: i32,
    /// Reasons in rule order; never empty.
    pub reasoning: Vec<String>,
    pub indicators: IndicatorSnapshot,
    /// Signal results always, chart formations when detected.
    pub patterns: Vec<PatternResult>,
}

impl Recommendation {
    pub fn from_snapshot(indicators: IndicatorSnapshot, patterns: Vec<PatternResult>) -> Self {
        let (score, reasoning) = score(&indicators);
        Self {
            label: Label::from_score(score),
            score,
            reasoning,
            indicators,
            patterns,
        }
    }

    /// Reasons joined the way they are usually displayed.
    pub fn reasoning_text(&self) -> String {
        self.reasoning.join(", ")
    }
}

/// Analyze with the default engine.
///
/// Deterministic: the same series always yields the same recommendation.
pub fn analyze(series: &PriceSeries) -> Recommendation {
    PatternEngine::default().analyze(series)
}

// ============================================================
// TESTS
// ============================================================
