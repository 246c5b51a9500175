//! # Expected Returns
//!
//! $$
//! \hat\mu_i = f \cdot \frac{1}{n}\sum_{t=1}^{n} r_{t,i}
//! \quad\text{or}\quad
//! \hat\mu_i = \Big(\prod_{t=1}^{n}(1 + r_{t,i})\Big)^{f/n} - 1
//! $$
//!
//! Annualized expected-return estimators.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

use crate::error::PortfolioError;
use crate::error::Result;

/// Trading periods per year for daily data.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Expected-return estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReturnEstimator {
  /// Arithmetic mean scaled by the annualization factor.
  #[default]
  Arithmetic,
  /// Geometric (CAGR) growth over the sample, annualized.
  Compounded,
}

impl ReturnEstimator {
  pub fn estimate(&self, returns: &Array2<f64>, frequency: usize) -> Result<Array1<f64>> {
    match self {
      ReturnEstimator::Arithmetic => mean_historical_return(returns, frequency),
      ReturnEstimator::Compounded => compounded_return(returns, frequency),
    }
  }
}

/// `mean(r) * frequency` per column.
pub fn mean_historical_return(returns: &Array2<f64>, frequency: usize) -> Result<Array1<f64>> {
  let mean = returns
    .mean_axis(Axis(0))
    .ok_or_else(|| PortfolioError::invalid("cannot estimate returns from an empty sample"))?;
  Ok(mean * frequency as f64)
}

/// `prod(1 + r)^(frequency / n) - 1` per column.
pub fn compounded_return(returns: &Array2<f64>, frequency: usize) -> Result<Array1<f64>> {
  let n = returns.nrows();
  if n == 0 {
    return Err(PortfolioError::invalid(
      "cannot estimate returns from an empty sample",
    ));
  }

  let exponent = frequency as f64 / n as f64;
  Ok(
    returns
      .axis_iter(Axis(1))
      .map(|column| {
        let growth: f64 = column.iter().map(|r| 1.0 + r).product();
        growth.max(0.0).powf(exponent) - 1.0
      })
      .collect(),
  )
}
