//! Tunable detector parameters
//!
//! Every builtin detector describes its tunables with [`ParamMeta`] and can be
//! rebuilt from a [`ParamSet`], a name-to-number map that deserializes
//! straight out of [`EngineConfig::detectors`](crate::EngineConfig). The same
//! metadata drives range checks and grid search.
//!
//! # Example
//!
//! ```rust
//! use chartsense::params::{ParamSet, ParameterizedDetector};
//! use chartsense::prelude::*;
//!
//! let params = ParamSet::new().with("tolerance", 0.02);
//! let detector = DoubleTopDetector::with_params(&params).unwrap();
//! assert_eq!(detector.tolerance.get(), 0.02);
//! assert_eq!(detector.live_window.get(), 3);
//!
//! // misspelled names are rejected, not ignored
//! let typo = ParamSet::new().with("tolerence", 0.02);
//! assert!(DoubleTopDetector::with_params(&typo).is_err());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, PatternDetector, Period, Ratio, Result};

// ============================================================
// PARAMETER METADATA
// ============================================================

/// Kind of value a parameter holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Share in `0.0..=1.0`
  Ratio,
  /// Whole number of bars, at least 1
  Period,
  /// Finite non-negative number in its own unit (slopes, multipliers)
  Factor,
}

/// Description of one tunable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamMeta {
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted values and grid step: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(name: &'static str, default: f64, range: (f64, f64, f64), description: &'static str) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(name: &'static str, default: f64, range: (f64, f64, f64), description: &'static str) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn factor(name: &'static str, default: f64, range: (f64, f64, f64), description: &'static str) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// `min` to `max` inclusive, `step` apart. The last value is clamped to `max`.
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 || max <= min {
      return vec![min];
    }
    let steps = ((max - min) / step + 1e-9).floor() as usize;
    (0..=steps).map(|i| (min + step * i as f64).min(max)).collect()
  }

  /// Check `value` against the range and the parameter type.
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if !value.is_finite() || value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period if value.fract() != 0.0 => {
        Err(AnalysisError::InvalidValue("Period must be a whole number of bars"))
      },
      ParamType::Period => Period::new(value as usize).map(|_| ()),
      ParamType::Factor if value < 0.0 => Err(AnalysisError::InvalidValue("Factor must be non-negative")),
      ParamType::Factor => Ok(()),
    }
  }
}

// ============================================================
// PARAMETER SETS
// ============================================================

/// Parameter values by name. Names missing from the set take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, f64>);

impl ParamSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
    self.insert(name, value);
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
    self.0.insert(name.into(), value)
  }

  pub fn get(&self, name: &str) -> Option<f64> {
    self.0.get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.0.iter().map(|(name, value)| (name.as_str(), *value))
  }

  /// `self` with every entry of `overrides` on top
  pub fn merged(&self, overrides: &ParamSet) -> ParamSet {
    let mut merged = self.clone();
    merged.0.extend(overrides.0.iter().map(|(k, v)| (k.clone(), *v)));
    merged
  }

  /// Reject names `meta` does not describe and out-of-range values.
  pub fn check(&self, detector: &str, meta: &[ParamMeta]) -> Result<()> {
    for (name, value) in self.iter() {
      let Some(m) = meta.iter().find(|m| m.name == name) else {
        return Err(AnalysisError::InvalidConfig(format!(
          "{detector} has no parameter named {name:?}"
        )));
      };
      m.validate(value)?;
    }
    Ok(())
  }

  fn value(&self, meta: &ParamMeta) -> Result<f64> {
    let value = self.get(meta.name).unwrap_or(meta.default);
    meta.validate(value)?;
    Ok(value)
  }

  pub fn ratio(&self, meta: &ParamMeta) -> Result<Ratio> {
    Ratio::new(self.value(meta)?)
  }

  pub fn period(&self, meta: &ParamMeta) -> Result<Period> {
    Period::new(self.value(meta)? as usize)
  }

  pub fn factor(&self, meta: &ParamMeta) -> Result<f64> {
    self.value(meta)
  }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ParamSet {
  fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detectors that can be rebuilt from a [`ParamSet`]
pub trait ParameterizedDetector: PatternDetector + Sized {
  /// Every tunable, in a stable order. Empty for fixed detectors.
  fn param_meta() -> &'static [ParamMeta];

  /// Build from `params`, defaulting what is missing. Unknown names are ignored.
  fn from_params(params: &ParamSet) -> Result<Self>;

  /// Current value of every tunable
  fn params(&self) -> ParamSet;

  /// Checked construction: unknown names and invalid combinations fail.
  fn with_params(params: &ParamSet) -> Result<Self> {
    let detector = Self::from_params(params)?;
    params.check(detector.name(), Self::param_meta())?;
    detector.validate_config()?;
    Ok(detector)
  }

  /// Copy of `self` with `overrides` applied
  fn reconfigured(&self, overrides: &ParamSet) -> Result<Self> {
    Self::with_params(&self.params().merged(overrides))
  }

  /// Every valid detector on the cartesian grid of all parameter ranges
  fn grid() -> Vec<Self> {
    let mut combos = vec![ParamSet::new()];
    for meta in Self::param_meta() {
      combos = combos
        .into_iter()
        .flat_map(|combo| {
          meta
            .generate_grid()
            .into_iter()
            .map(move |v| combo.clone().with(meta.name, v))
        })
        .collect();
    }
    combos.iter().filter_map(|params| Self::with_params(params).ok()).collect()
  }
}

// ============================================================
// TESTS
// ============================================================
