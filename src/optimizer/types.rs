//! # Optimizer Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Objectives and result containers for portfolio optimization.

use std::collections::BTreeMap;
use std::fmt::Display;

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;

use crate::error::PortfolioWarning;

/// Volatility below which the Sharpe ratio is reported as zero.
const VOL_EPS: f64 = 1e-15;

/// Optimization objective.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Objective {
  /// Tangency portfolio.
  #[default]
  MaxSharpe,
  /// Global minimum-variance portfolio.
  MinVolatility,
  /// Minimum variance subject to `mu' w >= target`.
  EfficientReturn { target: f64 },
}

/// Model performance of a weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Performance {
  /// Expected annual return `mu' w`.
  pub expected_return: f64,
  /// Annual volatility `sqrt(w' S w)`.
  pub volatility: f64,
  /// `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}

impl Performance {
  pub fn from_weights(
    weights: &[f64],
    mu: &Array1<f64>,
    cov: &Array2<f64>,
    risk_free_rate: f64,
  ) -> Self {
    let w = ArrayView1::from(weights);
    let expected_return = mu.dot(&w);
    let volatility = w.dot(&cov.dot(&w)).max(0.0).sqrt();
    let sharpe = if volatility > VOL_EPS {
      (expected_return - risk_free_rate) / volatility
    } else {
      0.0
    };

    Self {
      expected_return,
      volatility,
      sharpe,
    }
  }
}

impl Display for Performance {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(f, "Expected annual return: {:.2}%", self.expected_return * 100.0)?;
    writeln!(f, "Annual volatility: {:.2}%", self.volatility * 100.0)?;
    write!(f, "Sharpe Ratio: {:.2}", self.sharpe)
  }
}

/// Cleaned weights keyed by ticker, with their model performance.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
  tickers: Vec<String>,
  weights: Vec<f64>,
  performance: Performance,
  warnings: Vec<PortfolioWarning>,
}

impl Allocation {
  pub(crate) fn new(
    tickers: Vec<String>,
    weights: Vec<f64>,
    performance: Performance,
    warnings: Vec<PortfolioWarning>,
  ) -> Self {
    debug_assert_eq!(tickers.len(), weights.len());
    Self {
      tickers,
      weights,
      performance,
      warnings,
    }
  }

  /// Tickers in weight order.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Weights in ticker order; non-negative and summing to one.
  pub fn weights(&self) -> &[f64] {
    &self.weights
  }

  /// Weight of `ticker`, if it is part of the allocation.
  pub fn weight(&self, ticker: &str) -> Option<f64> {
    self
      .tickers
      .iter()
      .position(|t| t == ticker)
      .map(|i| self.weights[i])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
    self
      .tickers
      .iter()
      .map(String::as_str)
      .zip(self.weights.iter().copied())
  }

  /// Ticker to weight mapping for a rendering layer.
  pub fn to_map(&self) -> BTreeMap<String, f64> {
    self
      .tickers
      .iter()
      .cloned()
      .zip(self.weights.iter().copied())
      .collect()
  }

  /// Model performance of the cleaned weights.
  pub fn performance(&self) -> &Performance {
    &self.performance
  }

  /// Solver-side warnings (estimation warnings live on the report).
  pub fn warnings(&self) -> &[PortfolioWarning] {
    &self.warnings
  }
}

/// One point of the efficient frontier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrontierPoint {
  pub expected_return: f64,
  pub volatility: f64,
}
