//! # Return Series
//!
//! $$
//! R \in \mathbb{R}^{(T-1) \times N}, \quad R_{t,i} = \frac{P_{t+1,i}}{P_{t,i}} - 1
//! $$
//!
//! Simple period returns. Columns with no computable return are excluded; rows that
//! still contain a missing value afterwards are dropped.

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::Axis;

use super::panel::ExcludedAsset;
use super::panel::ExclusionReason;
use super::panel::PricePanel;
use crate::error::PortfolioError;
use crate::error::Result;

/// Complete (NaN-free) return matrix aligned with its tickers.
#[derive(Clone, Debug)]
pub struct ReturnSeries {
  tickers: Vec<String>,
  dates: Vec<NaiveDate>,
  values: Array2<f64>,
  excluded: Vec<ExcludedAsset>,
}

impl ReturnSeries {
  pub(crate) fn from_panel(panel: &PricePanel) -> Result<Self> {
    let t = panel.n_periods();
    if t < 2 {
      return Err(PortfolioError::invalid(format!(
        "at least two price observations are needed to compute returns, got {t}"
      )));
    }

    let prices = panel.prices();
    let raw = Array2::from_shape_fn((t - 1, panel.n_assets()), |(k, i)| {
      let p0 = prices[[k, i]];
      let p1 = prices[[k + 1, i]];
      if p0.is_finite() && p1.is_finite() {
        p1 / p0 - 1.0
      } else {
        f64::NAN
      }
    });

    let mut excluded = panel.excluded().to_vec();
    let mut keep_cols = Vec::with_capacity(panel.n_assets());
    for (i, column) in raw.axis_iter(Axis(1)).enumerate() {
      if column.iter().any(|r| r.is_finite()) {
        keep_cols.push(i);
      } else {
        excluded.push(ExcludedAsset::new(
          panel.tickers()[i].clone(),
          ExclusionReason::NoReturns,
        ));
      }
    }

    if keep_cols.is_empty() {
      return Err(PortfolioError::invalid("no asset has a computable return"));
    }

    let raw = raw.select(Axis(1), &keep_cols);
    let keep_rows: Vec<usize> = raw
      .axis_iter(Axis(0))
      .enumerate()
      .filter(|(_, row)| row.iter().all(|r| r.is_finite()))
      .map(|(k, _)| k)
      .collect();

    if keep_rows.is_empty() {
      return Err(PortfolioError::invalid(
        "no period has a return for every asset",
      ));
    }

    Ok(Self {
      tickers: keep_cols.iter().map(|&i| panel.tickers()[i].clone()).collect(),
      dates: keep_rows.iter().map(|&k| panel.dates()[k + 1]).collect(),
      values: raw.select(Axis(0), &keep_rows),
      excluded,
    })
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// End date of each return period.
  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  /// `observations x assets` return matrix.
  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  /// Number of return rows.
  pub fn n_observations(&self) -> usize {
    self.values.nrows()
  }

  /// Number of asset columns.
  pub fn n_assets(&self) -> usize {
    self.values.ncols()
  }

  /// Assets dropped while building the panel or the returns.
  pub fn excluded(&self) -> &[ExcludedAsset] {
    &self.excluded
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n).map(|k| start + chrono::Days::new(k as u64)).collect()
  }

  #[test]
  fn computes_simple_returns_and_drops_first_row() {
    let panel = PricePanel::from_columns(
      vec!["AAA".into(), "BBB".into()],
      dates(3),
      array![[100.0, 50.0], [110.0, 45.0], [99.0, 54.0]],
    )
    .unwrap();

    let returns = panel.returns().unwrap();
    assert_eq!(returns.n_observations(), 2);
    assert_eq!(returns.dates()[0], panel.dates()[1]);
    assert_abs_diff_eq!(returns.values()[[0, 0]], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(returns.values()[[0, 1]], -0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(returns.values()[[1, 0]], -0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(returns.values()[[1, 1]], 0.2, epsilon = 1e-12);
  }

  #[test]
  fn single_observation_is_invalid() {
    let panel = PricePanel::from_columns(
      vec!["AAA".into(), "BBB".into()],
      dates(1),
      array![[100.0, 50.0]],
    )
    .unwrap();

    assert!(matches!(panel.returns(), Err(PortfolioError::InvalidInput(_))));
  }

  #[test]
  fn rows_with_gaps_are_dropped() {
    let panel = PricePanel::from_columns(
      vec!["AAA".into(), "BBB".into()],
      dates(4),
      array![
        [100.0, 50.0],
        [101.0, f64::NAN],
        [102.0, 52.0],
        [103.0, 53.0]
      ],
    )
    .unwrap();

    let returns = panel.returns().unwrap();
    assert_eq!(returns.n_observations(), 1);
    assert_abs_diff_eq!(returns.values()[[0, 1]], 53.0 / 52.0 - 1.0, epsilon = 1e-12);
  }

  #[test]
  fn asset_with_isolated_prices_is_excluded() {
    let panel = PricePanel::from_columns(
      vec!["AAA".into(), "LONE".into()],
      dates(3),
      array![[100.0, 5.0], [101.0, f64::NAN], [102.0, f64::NAN]],
    )
    .unwrap();

    let returns = panel.returns().unwrap();
    assert_eq!(returns.tickers(), &["AAA".to_string()]);
    assert_eq!(returns.excluded().len(), 1);
    assert_eq!(returns.excluded()[0].reason, ExclusionReason::NoReturns);
  }
}
