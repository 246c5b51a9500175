//! # Portfolio Engine
//!
//! $$
//! \mathbf{w}^\* = \operatorname{Optimize}(\hat\mu, \hat\Sigma, \ell, u, r_f)
//! $$
//!
//! High-level orchestration from prices to a cleaned allocation report.

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::debug;
use tracing::info;

use crate::data::Alignment;
use crate::data::Asset;
use crate::data::DateRange;
use crate::data::ExcludedAsset;
use crate::data::ExclusionReason;
use crate::data::PricePanel;
use crate::data::PriceSource;
use crate::data::TickerSelection;
use crate::error::PortfolioError;
use crate::error::PortfolioWarning;
use crate::error::Result;
use crate::estimate::EstimationSettings;
use crate::estimate::MarketEstimates;
use crate::optimizer::equal_weight;
use crate::optimizer::Allocation;
use crate::optimizer::EfficientFrontier;
use crate::optimizer::FrontierPoint;
use crate::optimizer::Objective;
use crate::optimizer::SolverSettings;
use crate::optimizer::WeightBounds;
use crate::optimizer::DEFAULT_RISK_FREE_RATE;
use crate::optimizer::DEFAULT_WEIGHT_CUTOFF;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug)]
pub struct PortfolioEngineConfig {
  /// Objective used by [`PortfolioEngine::optimize`].
  pub objective: Objective,
  /// Annual risk-free rate used in Sharpe computations.
  pub risk_free_rate: f64,
  /// Return/covariance estimators and annualization frequency.
  pub estimation: EstimationSettings,
  /// Per-asset weight bounds.
  pub bounds: WeightBounds,
  /// Weights below this magnitude are snapped to zero.
  pub weight_cutoff: f64,
  pub solver: SolverSettings,
  /// Date alignment for assets fetched through a [`PriceSource`].
  pub alignment: Alignment,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      objective: Objective::MaxSharpe,
      risk_free_rate: DEFAULT_RISK_FREE_RATE,
      estimation: EstimationSettings::default(),
      bounds: WeightBounds::default(),
      weight_cutoff: DEFAULT_WEIGHT_CUTOFF,
      solver: SolverSettings::default(),
      alignment: Alignment::Inner,
    }
  }
}

/// Output of one optimization request.
#[derive(Clone, Debug)]
pub struct OptimizationReport {
  /// Optimized, cleaned allocation.
  pub allocation: Allocation,
  /// Equal-weight portfolio over the same assets.
  pub baseline: Allocation,
  /// Assets dropped before estimation, with the reason.
  pub excluded: Vec<ExcludedAsset>,
  /// Estimation and solver warnings.
  pub warnings: Vec<PortfolioWarning>,
  /// Return observations behind the estimates.
  pub observations: usize,
  /// First and last price date, when the report came from a panel.
  pub period: Option<(NaiveDate, NaiveDate)>,
}

/// Single entry-point engine for portfolio optimization.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  /// Estimate from a price panel and optimize.
  pub fn optimize(&self, panel: &PricePanel) -> Result<OptimizationReport> {
    let returns = panel.returns()?;
    let estimates = MarketEstimates::from_returns(&returns, &self.config.estimation)?;

    let mut report = self.optimize_estimates(&estimates)?;
    report.excluded = returns.excluded().to_vec();
    report.period = panel
      .dates()
      .first()
      .zip(panel.dates().last())
      .map(|(start, end)| (*start, *end));

    info!(
      assets = estimates.n_assets(),
      excluded = report.excluded.len(),
      observations = report.observations,
      sharpe = report.allocation.performance().sharpe,
      "optimization complete"
    );
    Ok(report)
  }

  /// Optimize precomputed estimates.
  pub fn optimize_estimates(&self, estimates: &MarketEstimates) -> Result<OptimizationReport> {
    let allocation = self.frontier_for(estimates)?.optimize(self.config.objective)?;
    let baseline = equal_weight(estimates, self.config.risk_free_rate)?;

    let mut warnings = estimates.warnings().to_vec();
    warnings.extend(allocation.warnings().iter().cloned());

    Ok(OptimizationReport {
      allocation,
      baseline,
      excluded: Vec::new(),
      warnings,
      observations: estimates.observations(),
      period: None,
    })
  }

  /// Independent requests in parallel; results keep the input order.
  pub fn optimize_batch(&self, panels: &[PricePanel]) -> Vec<Result<OptimizationReport>> {
    panels.par_iter().map(|panel| self.optimize(panel)).collect()
  }

  /// Fetch the selected tickers over `range` and optimize them.
  ///
  /// Requested tickers the source returns nothing for are reported as excluded with
  /// [`ExclusionReason::NoData`].
  pub fn optimize_selection<S: PriceSource + ?Sized>(
    &self,
    source: &S,
    selection: &TickerSelection,
    range: &DateRange,
  ) -> Result<OptimizationReport> {
    if selection.is_empty() {
      return Err(PortfolioError::invalid("no tickers selected"));
    }

    let fetched = source.fetch(selection.tickers(), range)?;
    let mut assets = Vec::with_capacity(fetched.len());
    for asset in fetched {
      if !selection.contains(asset.ticker()) {
        debug!(ticker = asset.ticker(), "ignoring unrequested ticker from price source");
        continue;
      }
      let prices = asset
        .prices()
        .iter()
        .copied()
        .filter(|(date, _)| range.contains(*date))
        .collect();
      assets.push(Asset::new(asset.ticker(), prices)?);
    }

    let missing: Vec<String> = selection
      .tickers()
      .iter()
      .filter(|t| !assets.iter().any(|a| a.ticker().eq_ignore_ascii_case(t)))
      .cloned()
      .collect();

    if assets.is_empty() {
      return Err(PortfolioError::invalid(format!(
        "price source returned no data for {selection}"
      )));
    }

    let mut panel = PricePanel::from_assets(assets, self.config.alignment)?;
    for ticker in missing {
      panel.push_excluded(ExcludedAsset::new(ticker, ExclusionReason::NoData));
    }
    self.optimize(&panel)
  }

  /// Sample the efficient frontier under the configured bounds.
  pub fn frontier(&self, estimates: &MarketEstimates, points: usize) -> Result<Vec<FrontierPoint>> {
    self.frontier_for(estimates)?.frontier(points)
  }

  fn frontier_for<'a>(&self, estimates: &'a MarketEstimates) -> Result<EfficientFrontier<'a>> {
    Ok(
      EfficientFrontier::new(estimates, &self.config.bounds)?
        .with_risk_free_rate(self.config.risk_free_rate)
        .with_weight_cutoff(self.config.weight_cutoff)
        .with_solver_settings(self.config.solver),
    )
  }
}

#[cfg(test)]
mod tests {
  use anyhow::anyhow;
  use approx::assert_abs_diff_eq;
  use chrono::Days;
  use ndarray::Array2;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use rand_distr::Distribution;
  use rand_distr::Normal;
  use tracing_test::traced_test;

  use super::*;

  fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
  }

  fn dates(n: usize) -> Vec<NaiveDate> {
    (0..n).map(|k| start() + Days::new(k as u64)).collect()
  }

  /// Compound per-period returns (`T-1 x N`) into a price panel starting at 100.
  fn panel_from_returns(tickers: &[&str], returns: &Array2<f64>) -> PricePanel {
    let (t, n) = returns.dim();
    let mut prices = Array2::zeros((t + 1, n));
    prices.row_mut(0).fill(100.0);
    for k in 0..t {
      for i in 0..n {
        prices[[k + 1, i]] = prices[[k, i]] * (1.0 + returns[[k, i]]);
      }
    }
    PricePanel::from_columns(
      tickers.iter().map(|t| t.to_string()).collect(),
      dates(t + 1),
      prices,
    )
    .unwrap()
  }

  fn random_panel(seed: u64, assets: usize, periods: usize) -> PricePanel {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.005).unwrap();
    let mut returns = Array2::zeros((periods, assets));
    for k in 0..periods {
      for i in 0..assets {
        returns[[k, i]] = 0.0008 + 0.0002 * i as f64 + noise.sample(&mut rng);
      }
    }
    let names: Vec<String> = (0..assets).map(|i| format!("S{i}")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    panel_from_returns(&names, &returns)
  }

  struct MemorySource {
    assets: Vec<Asset>,
  }

  impl PriceSource for MemorySource {
    fn fetch(&self, tickers: &[String], _range: &DateRange) -> anyhow::Result<Vec<Asset>> {
      Ok(
        self
          .assets
          .iter()
          .filter(|a| tickers.iter().any(|t| t == a.ticker()))
          .cloned()
          .collect(),
      )
    }
  }

  struct FailingSource;

  impl PriceSource for FailingSource {
    fn fetch(&self, _tickers: &[String], _range: &DateRange) -> anyhow::Result<Vec<Asset>> {
      Err(anyhow!("quote service unavailable"))
    }
  }

  #[test]
  fn anti_correlated_pair_splits_evenly() {
    let mut returns = Array2::zeros((60, 2));
    for k in 0..60 {
      let swing = if k % 2 == 0 { 0.01 } else { -0.01 };
      returns[[k, 0]] = 0.001 + swing;
      returns[[k, 1]] = 0.001 - swing;
    }
    let panel = panel_from_returns(&["A", "B"], &returns);

    let report = PortfolioEngine::default().optimize(&panel).unwrap();
    let w = report.allocation.weights();
    assert_abs_diff_eq!(w[0], 0.5, epsilon = 1e-3);
    assert_abs_diff_eq!(w[1], 0.5, epsilon = 1e-3);
    assert!(report.allocation.performance().volatility < 1e-3);
  }

  #[test]
  fn better_asset_gets_more_weight() {
    // Orthogonal zero-mean patterns keep the sample correlation at exactly zero.
    let s = [1.0, -1.0, 1.0, -1.0];
    let u = [1.0, 1.0, -1.0, -1.0];
    let mut returns = Array2::zeros((80, 2));
    for k in 0..80 {
      returns[[k, 0]] = 0.002 + 0.005 * s[k % 4];
      returns[[k, 1]] = 0.001 + 0.010 * u[k % 4];
    }
    let panel = panel_from_returns(&["X", "Y"], &returns);

    let report = PortfolioEngine::default().optimize(&panel).unwrap();
    let alloc = &report.allocation;
    assert!(alloc.weight("X").unwrap() > alloc.weight("Y").unwrap());
    assert_abs_diff_eq!(alloc.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-6);
  }

  #[test]
  fn excessive_lower_bounds_are_infeasible() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      bounds: WeightBounds::new(0.3, 1.0),
      ..Default::default()
    });
    let err = engine.optimize(&random_panel(7, 4, 120));
    assert!(matches!(err, Err(PortfolioError::InfeasibleConstraints(_))));
  }

  #[test]
  fn single_observation_is_invalid() {
    let panel = PricePanel::from_columns(
      vec!["A".into(), "B".into()],
      dates(1),
      Array2::from_elem((1, 2), 100.0),
    )
    .unwrap();
    let err = PortfolioEngine::default().optimize(&panel);
    assert!(matches!(err, Err(PortfolioError::InvalidInput(_))));
  }

  #[test]
  fn weights_are_a_bounded_budget_on_random_panels() {
    for seed in 0..4 {
      let panel = random_panel(seed, 5, 250);
      for objective in [Objective::MaxSharpe, Objective::MinVolatility] {
        let engine = PortfolioEngine::new(PortfolioEngineConfig {
          objective,
          bounds: WeightBounds::cap(0.35),
          ..Default::default()
        });
        let report = engine.optimize(&panel).unwrap();
        let w = report.allocation.weights();

        assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(w.iter().all(|&v| (0.0..=0.35 + 1e-9).contains(&v)), "{w:?}");
        assert!(report.allocation.performance().sharpe.is_finite());
      }
    }
  }

  #[test]
  fn max_sharpe_dominates_baseline_and_min_vol_is_calmer() {
    let panel = random_panel(11, 4, 250);
    let tangency = PortfolioEngine::default().optimize(&panel).unwrap();
    let min_vol = PortfolioEngine::new(PortfolioEngineConfig {
      objective: Objective::MinVolatility,
      ..Default::default()
    })
    .optimize(&panel)
    .unwrap();

    let sharpe = tangency.allocation.performance().sharpe;
    assert!(sharpe >= tangency.baseline.performance().sharpe - 1e-6);
    assert!(
      min_vol.allocation.performance().volatility
        <= tangency.allocation.performance().volatility + 1e-9
    );
  }

  #[test]
  fn repeated_runs_are_identical() {
    let panel = random_panel(3, 4, 200);
    let engine = PortfolioEngine::default();
    let first = engine.optimize(&panel).unwrap();
    let second = engine.optimize(&panel).unwrap();
    assert_eq!(first.allocation, second.allocation);
  }

  #[test]
  fn batch_matches_sequential_order() {
    let panels: Vec<PricePanel> = (20..24).map(|s| random_panel(s, 3, 150)).collect();
    let engine = PortfolioEngine::default();
    let batch = engine.optimize_batch(&panels);

    assert_eq!(batch.len(), panels.len());
    for (panel, result) in panels.iter().zip(batch) {
      let expected = engine.optimize(panel).unwrap();
      assert_eq!(result.unwrap().allocation, expected.allocation);
    }
  }

  #[test]
  fn report_carries_period_and_baseline() {
    let panel = random_panel(5, 3, 100);
    let report = PortfolioEngine::default().optimize(&panel).unwrap();
    assert_eq!(report.period, Some((start(), start() + Days::new(100))));
    assert_eq!(report.observations, 100);
    assert_eq!(report.baseline.weights().len(), 3);
    assert!(report.excluded.is_empty());
  }

  #[test]
  #[traced_test]
  fn selection_reports_missing_tickers() {
    let panel = random_panel(9, 2, 120);
    let assets = panel
      .tickers()
      .iter()
      .enumerate()
      .map(|(i, t)| {
        let series = panel
          .dates()
          .iter()
          .copied()
          .zip(panel.prices().column(i).iter().copied())
          .collect();
        Asset::new(t, series).unwrap()
      })
      .collect();
    let source = MemorySource { assets };

    let selection = TickerSelection::parse("s0, s1, nope");
    let range = DateRange::new(start(), start() + Days::new(365)).unwrap();
    let report = PortfolioEngine::default()
      .optimize_selection(&source, &selection, &range)
      .unwrap();

    assert_eq!(report.allocation.tickers(), &["S0".to_string(), "S1".to_string()]);
    assert_eq!(report.excluded.len(), 1);
    assert_eq!(report.excluded[0].ticker, "NOPE");
    assert_eq!(report.excluded[0].reason, ExclusionReason::NoData);
    assert!(logs_contain("optimization complete"));
  }

  #[test]
  fn selection_range_filters_observations() {
    let panel = random_panel(9, 2, 120);
    let assets = panel
      .tickers()
      .iter()
      .enumerate()
      .map(|(i, t)| {
        let series = panel
          .dates()
          .iter()
          .copied()
          .zip(panel.prices().column(i).iter().copied())
          .collect();
        Asset::new(t, series).unwrap()
      })
      .collect();
    let source = MemorySource { assets };

    let range = DateRange::new(start(), start() + Days::new(60)).unwrap();
    let report = PortfolioEngine::default()
      .optimize_selection(&source, &TickerSelection::parse("S0,S1"), &range)
      .unwrap();
    assert_eq!(report.observations, 60);
  }

  #[test]
  fn selection_errors() {
    let engine = PortfolioEngine::default();
    let range = DateRange::trailing_year(start()).unwrap();

    let err = engine.optimize_selection(&FailingSource, &TickerSelection::default(), &range);
    assert!(matches!(err, Err(PortfolioError::Source(_))));

    let empty = MemorySource { assets: Vec::new() };
    let err = engine.optimize_selection(&empty, &TickerSelection::default(), &range);
    assert!(matches!(err, Err(PortfolioError::InvalidInput(_))));

    let err = engine.optimize_selection(&empty, &TickerSelection::new(), &range);
    assert!(matches!(err, Err(PortfolioError::InvalidInput(_))));
  }

  #[test]
  fn engine_frontier_uses_configured_bounds() {
    let panel = random_panel(2, 4, 200);
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      bounds: WeightBounds::cap(0.5),
      ..Default::default()
    });
    let returns = panel.returns().unwrap();
    let estimates = MarketEstimates::from_returns(&returns, &engine.config().estimation).unwrap();
    let points = engine.frontier(&estimates, 5).unwrap();
    assert_eq!(points.len(), 5);
    assert!(points[4].expected_return >= points[0].expected_return);
  }
}
