//! # Weight Bounds
//!
//! $$
//! \ell_i \le w_i \le u_i, \qquad \sum_i \ell_i \le 1 \le \sum_i u_i
//! $$
//!
//! Per-ticker box constraints, resolved against the tickers that survive estimation.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::PortfolioError;
use crate::error::Result;

/// Slack allowed when comparing bound sums with one.
const SUM_TOL: f64 = 1e-9;

/// Long-only box constraints keyed by ticker.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightBounds {
  /// `(lower, upper)` applied to every ticker without an override.
  pub default: (f64, f64),
  /// Ticker-specific `(lower, upper)`.
  pub overrides: BTreeMap<String, (f64, f64)>,
}

impl Default for WeightBounds {
  fn default() -> Self {
    Self::new(0.0, 1.0)
  }
}

impl WeightBounds {
  /// Uniform `(lower, upper)` for every ticker.
  pub fn new(lower: f64, upper: f64) -> Self {
    Self {
      default: (lower, upper),
      overrides: BTreeMap::new(),
    }
  }

  /// Global weight cap `0 <= w_i <= upper`.
  pub fn cap(upper: f64) -> Self {
    Self::new(0.0, upper)
  }

  /// Replace the bounds of one ticker.
  pub fn with_override(mut self, ticker: impl Into<String>, lower: f64, upper: f64) -> Self {
    self.overrides.insert(ticker.into(), (lower, upper));
    self
  }

  /// Bounds in the order of `tickers`.
  ///
  /// Fails with `InvalidInput` on malformed bounds and `InfeasibleConstraints` when no
  /// weight vector summing to one fits inside them.
  pub fn resolve(&self, tickers: &[String]) -> Result<ResolvedBounds> {
    for ticker in self.overrides.keys() {
      if !tickers.contains(ticker) {
        debug!(ticker = %ticker, "bound override for an asset not in the panel");
      }
    }

    let mut lower = Vec::with_capacity(tickers.len());
    let mut upper = Vec::with_capacity(tickers.len());
    for ticker in tickers {
      let (lo, hi) = self.overrides.get(ticker).copied().unwrap_or(self.default);
      if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || hi > 1.0 || lo > hi {
        return Err(PortfolioError::invalid(format!(
          "{ticker}: bounds ({lo}, {hi}) must satisfy 0 <= lower <= upper <= 1"
        )));
      }
      lower.push(lo);
      upper.push(hi);
    }

    let lower_sum: f64 = lower.iter().sum();
    let upper_sum: f64 = upper.iter().sum();
    if lower_sum > 1.0 + SUM_TOL {
      return Err(PortfolioError::infeasible(format!(
        "lower bounds sum to {lower_sum:.4} > 1"
      )));
    }
    if upper_sum < 1.0 - SUM_TOL {
      return Err(PortfolioError::infeasible(format!(
        "upper bounds sum to {upper_sum:.4} < 1; raise the weight cap or add assets"
      )));
    }

    Ok(ResolvedBounds { lower, upper })
  }
}

/// Bounds aligned with an asset ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBounds {
  lower: Vec<f64>,
  upper: Vec<f64>,
}

impl ResolvedBounds {
  /// Lower bounds in asset order.
  pub fn lower(&self) -> &[f64] {
    &self.lower
  }

  /// Upper bounds in asset order.
  pub fn upper(&self) -> &[f64] {
    &self.upper
  }

  /// Number of bounded assets.
  pub fn len(&self) -> usize {
    self.lower.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lower.is_empty()
  }

  /// Whether every weight lies inside its bounds up to `tol`.
  pub fn contains(&self, weights: &[f64], tol: f64) -> bool {
    weights.len() == self.len()
      && weights
        .iter()
        .zip(self.lower.iter().zip(self.upper.iter()))
        .all(|(w, (lo, hi))| *w >= lo - tol && *w <= hi + tol)
  }

  /// Largest `mu' w` attainable inside the bounds with `sum(w) = 1`.
  pub(crate) fn max_attainable_return(&self, mu: &[f64]) -> f64 {
    let mut w = self.lower.clone();
    let mut remaining = 1.0 - w.iter().sum::<f64>();

    let mut order: Vec<usize> = (0..mu.len()).collect();
    order.sort_by(|&a, &b| mu[b].total_cmp(&mu[a]));
    for i in order {
      if remaining <= 0.0 {
        break;
      }
      let add = (self.upper[i] - self.lower[i]).min(remaining);
      w[i] += add;
      remaining -= add;
    }

    w.iter().zip(mu.iter()).map(|(w, m)| w * m).sum()
  }
}
