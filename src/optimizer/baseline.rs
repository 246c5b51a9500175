//! # Equal-Weight Baseline
//!
//! $$
//! w_i = \frac{1}{N}
//! $$
//!
//! Naive diversification reported next to the optimized allocation.

use super::types::Allocation;
use super::types::Performance;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::estimate::MarketEstimates;

pub fn equal_weight(estimates: &MarketEstimates, risk_free_rate: f64) -> Result<Allocation> {
  let n = estimates.n_assets();
  if n == 0 {
    return Err(PortfolioError::invalid("no assets for an equal-weight portfolio"));
  }
  if !risk_free_rate.is_finite() {
    return Err(PortfolioError::invalid("risk-free rate must be finite"));
  }

  let weights = vec![1.0 / n as f64; n];
  let performance =
    Performance::from_weights(&weights, estimates.mu(), estimates.cov(), risk_free_rate);

  Ok(Allocation::new(
    estimates.tickers().to_vec(),
    weights,
    performance,
    Vec::new(),
  ))
}
