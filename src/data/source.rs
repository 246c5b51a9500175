//! # Price Source
//!
//! $$
//! \text{fetch} : (\mathcal{S}, [t_0, t_1]) \to \{(t_k, p_k)\}_{s \in \mathcal{S}}
//! $$
//!
//! Seam for the market-data provider. Implementations deliver adjusted close prices.

use chrono::Months;
use chrono::NaiveDate;

use super::series::Asset;
use crate::error::PortfolioError;
use crate::error::Result;

/// Inclusive date window of a price request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
  start: NaiveDate,
  end: NaiveDate,
}

impl DateRange {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start >= end {
      return Err(PortfolioError::invalid(format!(
        "date range start {start} must precede end {end}"
      )));
    }
    Ok(Self { start, end })
  }

  /// One calendar year ending at `end`.
  pub fn trailing_year(end: NaiveDate) -> Result<Self> {
    let start = end
      .checked_sub_months(Months::new(12))
      .ok_or_else(|| PortfolioError::invalid(format!("cannot go back one year from {end}")))?;
    Self::new(start, end)
  }

  pub fn start(&self) -> NaiveDate {
    self.start
  }

  pub fn end(&self) -> NaiveDate {
    self.end
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }
}

/// Market-data provider.
///
/// Returned assets carry adjusted close prices. Tickers the provider knows nothing
/// about may simply be missing from the result.
pub trait PriceSource {
  fn fetch(&self, tickers: &[String], range: &DateRange) -> anyhow::Result<Vec<Asset>>;
}
