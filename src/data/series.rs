//! # Asset Price Series
//!
//! $$
//! \{(t_k, p_k)\}_{k=1}^{T}, \quad t_1 < t_2 < \dots < t_T
//! $$
//!
//! Adjusted-close history of a single ticker.

use chrono::NaiveDate;

use crate::error::PortfolioError;
use crate::error::Result;

/// A ticker with its dated adjusted-close prices.
///
/// Non-finite prices are treated as missing observations.
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
  ticker: String,
  prices: Vec<(NaiveDate, f64)>,
}

impl Asset {
  /// Build an asset, validating the ticker, date ordering and price sign.
  pub fn new(ticker: impl AsRef<str>, prices: Vec<(NaiveDate, f64)>) -> Result<Self> {
    let ticker = ticker.as_ref().trim().to_string();
    if ticker.is_empty() {
      return Err(PortfolioError::invalid("ticker must not be empty"));
    }

    if let Some(w) = prices.windows(2).find(|w| w[1].0 <= w[0].0) {
      return Err(PortfolioError::invalid(format!(
        "{ticker}: timestamps must be strictly increasing ({} follows {})",
        w[1].0, w[0].0
      )));
    }

    if let Some((date, price)) = prices.iter().find(|(_, p)| p.is_finite() && *p <= 0.0) {
      return Err(PortfolioError::invalid(format!(
        "{ticker}: non-positive price {price} on {date}"
      )));
    }

    Ok(Self { ticker, prices })
  }

  pub fn ticker(&self) -> &str {
    &self.ticker
  }

  pub fn prices(&self) -> &[(NaiveDate, f64)] {
    &self.prices
  }

  pub fn len(&self) -> usize {
    self.prices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.prices.is_empty()
  }

  /// Whether at least one observation carries a finite price.
  pub fn has_prices(&self) -> bool {
    self.prices.iter().any(|(_, p)| p.is_finite())
  }
}
