//! # Price Panel
//!
//! $$
//! P \in \mathbb{R}^{T \times N}, \quad P_{t,i} = p_i(t_t)
//! $$
//!
//! Assets aligned on a common date index. Missing observations are stored as NaN.

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::fmt::Display;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::Axis;
use tracing::warn;

use super::returns::ReturnSeries;
use super::series::Asset;
use crate::error::PortfolioError;
use crate::error::Result;

/// How dates from different assets are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
  /// Keep only dates observed for every asset.
  #[default]
  Inner,
  /// Keep the union of dates; absent observations become NaN.
  Outer,
}

/// Why an asset was dropped before estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
  /// The price source returned nothing for the ticker.
  NoData,
  /// No finite price on the panel's dates.
  NoPrices,
  /// No period-over-period return could be computed.
  NoReturns,
}

impl Display for ExclusionReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ExclusionReason::NoData => write!(f, "no data returned"),
      ExclusionReason::NoPrices => write!(f, "no prices"),
      ExclusionReason::NoReturns => write!(f, "no computable returns"),
    }
  }
}

/// An asset removed from the panel, reported back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExcludedAsset {
  pub ticker: String,
  pub reason: ExclusionReason,
}

impl ExcludedAsset {
  pub(crate) fn new(ticker: impl Into<String>, reason: ExclusionReason) -> Self {
    let ticker = ticker.into();
    warn!(ticker = %ticker, reason = %reason, "excluding asset");
    Self { ticker, reason }
  }
}

/// Prices of several assets on a shared, strictly increasing date index.
#[derive(Clone, Debug)]
pub struct PricePanel {
  tickers: Vec<String>,
  dates: Vec<NaiveDate>,
  prices: Array2<f64>,
  excluded: Vec<ExcludedAsset>,
}

impl PricePanel {
  /// Align a set of assets on a common date index.
  ///
  /// Assets without a single finite price are excluded before alignment so they
  /// cannot empty an inner join.
  pub fn from_assets(assets: Vec<Asset>, alignment: Alignment) -> Result<Self> {
    if assets.is_empty() {
      return Err(PortfolioError::invalid("price panel is empty"));
    }
    ensure_unique(assets.iter().map(|a| a.ticker()))?;

    let mut excluded = Vec::new();
    let mut kept = Vec::with_capacity(assets.len());
    for asset in assets {
      if asset.has_prices() {
        kept.push(asset);
      } else {
        excluded.push(ExcludedAsset::new(asset.ticker(), ExclusionReason::NoPrices));
      }
    }

    if kept.is_empty() {
      return Err(PortfolioError::invalid("no asset has a price observation"));
    }

    let dates: Vec<NaiveDate> = match alignment {
      Alignment::Inner => {
        let mut common: BTreeSet<NaiveDate> = kept[0].prices().iter().map(|(d, _)| *d).collect();
        for asset in &kept[1..] {
          let own: BTreeSet<NaiveDate> = asset.prices().iter().map(|(d, _)| *d).collect();
          common = common.intersection(&own).copied().collect();
        }
        common.into_iter().collect()
      }
      Alignment::Outer => kept
        .iter()
        .flat_map(|a| a.prices().iter().map(|(d, _)| *d))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect(),
    };

    let mut prices = Array2::from_elem((dates.len(), kept.len()), f64::NAN);
    for (i, asset) in kept.iter().enumerate() {
      for (date, price) in asset.prices() {
        if let Ok(t) = dates.binary_search(date) {
          prices[[t, i]] = *price;
        }
      }
    }

    let tickers = kept.iter().map(|a| a.ticker().to_string()).collect();
    Self::assemble(tickers, dates, prices, excluded)
  }

  /// Build a panel from an already aligned `T x N` price matrix.
  pub fn from_columns(
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    prices: Array2<f64>,
  ) -> Result<Self> {
    if prices.nrows() != dates.len() || prices.ncols() != tickers.len() {
      return Err(PortfolioError::invalid(format!(
        "price matrix is {}x{} but {} dates and {} tickers were given",
        prices.nrows(),
        prices.ncols(),
        dates.len(),
        tickers.len()
      )));
    }
    if tickers.is_empty() {
      return Err(PortfolioError::invalid("price panel is empty"));
    }
    if tickers.iter().any(|t| t.trim().is_empty()) {
      return Err(PortfolioError::invalid("ticker must not be empty"));
    }
    ensure_unique(tickers.iter().map(String::as_str))?;
    if dates.windows(2).any(|w| w[1] <= w[0]) {
      return Err(PortfolioError::invalid(
        "panel dates must be strictly increasing",
      ));
    }
    if prices.iter().any(|p| p.is_finite() && *p <= 0.0) {
      return Err(PortfolioError::invalid("prices must be strictly positive"));
    }

    Self::assemble(tickers, dates, prices, Vec::new())
  }

  /// Drop all-missing columns (reported) and all-missing rows.
  fn assemble(
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    prices: Array2<f64>,
    mut excluded: Vec<ExcludedAsset>,
  ) -> Result<Self> {
    let mut keep_cols = Vec::with_capacity(tickers.len());
    for (i, column) in prices.axis_iter(Axis(1)).enumerate() {
      if column.iter().any(|p| p.is_finite()) {
        keep_cols.push(i);
      } else {
        excluded.push(ExcludedAsset::new(
          tickers[i].clone(),
          ExclusionReason::NoPrices,
        ));
      }
    }

    if keep_cols.is_empty() {
      return Err(PortfolioError::invalid(
        "assets share no dates with a price observation",
      ));
    }

    let prices = prices.select(Axis(1), &keep_cols);
    let keep_rows: Vec<usize> = prices
      .axis_iter(Axis(0))
      .enumerate()
      .filter(|(_, row)| row.iter().any(|p| p.is_finite()))
      .map(|(t, _)| t)
      .collect();

    let prices = prices.select(Axis(0), &keep_rows);
    let dates = keep_rows.iter().map(|&t| dates[t]).collect();
    let tickers = keep_cols.iter().map(|&i| tickers[i].clone()).collect();

    Ok(Self {
      tickers,
      dates,
      prices,
      excluded,
    })
  }

  /// Tickers in column order.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  /// `T x N` price matrix, rows ordered by date, columns by [`Self::tickers`].
  pub fn prices(&self) -> &Array2<f64> {
    &self.prices
  }

  /// Number of asset columns.
  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  /// Number of dated rows.
  pub fn n_periods(&self) -> usize {
    self.dates.len()
  }

  /// Assets dropped while the panel was built.
  pub fn excluded(&self) -> &[ExcludedAsset] {
    &self.excluded
  }

  pub(crate) fn push_excluded(&mut self, excluded: ExcludedAsset) {
    self.excluded.push(excluded);
  }

  /// Period-over-period simple returns.
  pub fn returns(&self) -> Result<ReturnSeries> {
    ReturnSeries::from_panel(self)
  }
}

fn ensure_unique<'a>(tickers: impl Iterator<Item = &'a str>) -> Result<()> {
  let mut seen = HashSet::new();
  for ticker in tickers {
    if !seen.insert(ticker) {
      return Err(PortfolioError::invalid(format!("duplicate ticker {ticker}")));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
  }

  fn asset(ticker: &str, obs: &[(u32, f64)]) -> Asset {
    Asset::new(ticker, obs.iter().map(|&(day, p)| (d(day), p)).collect()).unwrap()
  }

  #[test]
  fn inner_alignment_keeps_common_dates() {
    let panel = PricePanel::from_assets(
      vec![
        asset("AAA", &[(1, 10.0), (2, 11.0), (3, 12.0), (4, 13.0)]),
        asset("BBB", &[(2, 20.0), (3, 21.0), (4, 22.0), (5, 23.0)]),
      ],
      Alignment::Inner,
    )
    .unwrap();

    assert_eq!(panel.dates(), &[d(2), d(3), d(4)]);
    assert_eq!(panel.prices()[[0, 0]], 11.0);
    assert_eq!(panel.prices()[[2, 1]], 22.0);
    assert!(panel.excluded().is_empty());
  }

  #[test]
  fn outer_alignment_fills_missing_with_nan() {
    let panel = PricePanel::from_assets(
      vec![
        asset("AAA", &[(1, 10.0), (2, 11.0)]),
        asset("BBB", &[(2, 20.0), (3, 21.0)]),
      ],
      Alignment::Outer,
    )
    .unwrap();

    assert_eq!(panel.n_periods(), 3);
    assert!(panel.prices()[[0, 1]].is_nan());
    assert!(panel.prices()[[2, 0]].is_nan());
  }

  #[test]
  fn all_missing_assets_are_excluded_and_reported() {
    let panel = PricePanel::from_assets(
      vec![
        asset("AAA", &[(1, 10.0), (2, 11.0)]),
        asset("NAN", &[(1, f64::NAN), (2, f64::NAN)]),
        asset("BBB", &[(1, 20.0), (2, 21.0)]),
      ],
      Alignment::Inner,
    )
    .unwrap();

    assert_eq!(panel.tickers(), &["AAA".to_string(), "BBB".to_string()]);
    assert_eq!(
      panel.excluded(),
      &[ExcludedAsset {
        ticker: "NAN".into(),
        reason: ExclusionReason::NoPrices
      }]
    );
  }

  #[test]
  fn rows_missing_for_every_asset_are_dropped() {
    let prices = ndarray::array![[10.0, 20.0], [f64::NAN, f64::NAN], [11.0, 21.0]];
    let panel = PricePanel::from_columns(
      vec!["AAA".into(), "BBB".into()],
      vec![d(1), d(2), d(3)],
      prices,
    )
    .unwrap();

    assert_eq!(panel.dates(), &[d(1), d(3)]);
  }

  #[test]
  fn rejects_empty_duplicate_and_misshapen_input() {
    assert!(matches!(
      PricePanel::from_assets(vec![], Alignment::Inner),
      Err(PortfolioError::InvalidInput(_))
    ));

    let dup = PricePanel::from_assets(
      vec![asset("AAA", &[(1, 1.0)]), asset("AAA", &[(1, 2.0)])],
      Alignment::Inner,
    );
    assert!(matches!(dup, Err(PortfolioError::InvalidInput(_))));

    let shape = PricePanel::from_columns(
      vec!["AAA".into()],
      vec![d(1), d(2)],
      ndarray::array![[1.0, 2.0]],
    );
    assert!(matches!(shape, Err(PortfolioError::InvalidInput(_))));
  }

  #[test]
  fn disjoint_inner_join_is_invalid() {
    let panel = PricePanel::from_assets(
      vec![asset("AAA", &[(1, 10.0)]), asset("BBB", &[(2, 20.0)])],
      Alignment::Inner,
    );
    assert!(matches!(panel, Err(PortfolioError::InvalidInput(_))));
  }
}
