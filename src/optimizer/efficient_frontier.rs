//! # Efficient Frontier
//!
//! $$
//! \min_{\mathbf y,\kappa}\ \mathbf y^\top \Sigma \mathbf y
//! \quad\text{s.t.}\quad (\mu - r_f)^\top \mathbf y = 1,\;
//! \mathbf 1^\top \mathbf y = \kappa,\;
//! \ell\kappa \le \mathbf y \le u\kappa,\; \kappa \ge 0,
//! \qquad \mathbf w = \mathbf y / \kappa
//! $$
//!
//! Mean-variance objectives over a set of [`MarketEstimates`], solved as convex QPs.

use ndarray::Array2;
use tracing::debug;

use super::bounds::ResolvedBounds;
use super::bounds::WeightBounds;
use super::clean::clean_weights;
use super::qp::QuadraticProgram;
use super::qp::SolverSettings;
use super::types::Allocation;
use super::types::FrontierPoint;
use super::types::Objective;
use super::types::Performance;
use crate::error::PortfolioError;
use crate::error::PortfolioWarning;
use crate::error::Result;
use crate::estimate::MarketEstimates;

/// Default threshold below which a weight is snapped to zero.
pub const DEFAULT_WEIGHT_CUTOFF: f64 = 1e-4;

/// Default annual risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Smallest homogenization scale accepted from the max-Sharpe program.
const MIN_KAPPA: f64 = 1e-12;

/// Mean-variance optimizer bound to one set of estimates and constraints.
#[derive(Clone, Debug)]
pub struct EfficientFrontier<'a> {
  estimates: &'a MarketEstimates,
  bounds: ResolvedBounds,
  risk_free_rate: f64,
  weight_cutoff: f64,
  solver: SolverSettings,
}

impl<'a> EfficientFrontier<'a> {
  /// Resolve `bounds` against the estimated tickers.
  ///
  /// Infeasible bound sets are rejected here, before any solver is built.
  pub fn new(estimates: &'a MarketEstimates, bounds: &WeightBounds) -> Result<Self> {
    let bounds = bounds.resolve(estimates.tickers())?;
    Ok(Self {
      estimates,
      bounds,
      risk_free_rate: DEFAULT_RISK_FREE_RATE,
      weight_cutoff: DEFAULT_WEIGHT_CUTOFF,
      solver: SolverSettings::default(),
    })
  }

  /// Set the annual risk-free rate.
  pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
    self.risk_free_rate = risk_free_rate;
    self
  }

  /// Set the threshold below which weights are snapped to zero.
  pub fn with_weight_cutoff(mut self, weight_cutoff: f64) -> Self {
    self.weight_cutoff = weight_cutoff;
    self
  }

  /// Override the interior-point solver settings.
  pub fn with_solver_settings(mut self, solver: SolverSettings) -> Self {
    self.solver = solver;
    self
  }

  /// Borrow the resolved bounds.
  pub fn bounds(&self) -> &ResolvedBounds {
    &self.bounds
  }

  /// Annual risk-free rate in use.
  pub fn risk_free_rate(&self) -> f64 {
    self.risk_free_rate
  }

  /// Dispatch on `objective`.
  pub fn optimize(&self, objective: Objective) -> Result<Allocation> {
    match objective {
      Objective::MaxSharpe => self.max_sharpe(),
      Objective::MinVolatility => self.min_volatility(),
      Objective::EfficientReturn { target } => self.efficient_return(target),
    }
  }

  /// Tangency portfolio: maximum `(mu' w - r_f) / sqrt(w' S w)`.
  pub fn max_sharpe(&self) -> Result<Allocation> {
    self.validate()?;
    if let Some(single) = self.single_asset() {
      return Ok(single);
    }

    let mu = self.estimates.mu();
    let rf = self.risk_free_rate;
    if mu.iter().all(|&m| m <= rf) {
      return Err(PortfolioError::invalid(format!(
        "at least one asset must have an expected return above the risk-free rate ({rf})"
      )));
    }

    let n = self.estimates.n_assets();
    let mut p = Array2::zeros((n + 1, n + 1));
    p.slice_mut(ndarray::s![..n, ..n]).assign(self.estimates.cov());

    let mut qp = QuadraticProgram::new(p);

    let mut excess: Vec<f64> = mu.iter().map(|m| m - rf).collect();
    excess.push(0.0);
    qp.equality(excess, 1.0);

    let mut budget = vec![1.0; n + 1];
    budget[n] = -1.0;
    qp.equality(budget, 0.0);

    for i in 0..n {
      let mut row = vec![0.0; n + 1];
      row[i] = 1.0;
      row[n] = -self.bounds.upper()[i];
      qp.inequality(row, 0.0);

      let mut row = vec![0.0; n + 1];
      row[i] = -1.0;
      row[n] = self.bounds.lower()[i];
      qp.inequality(row, 0.0);
    }

    let mut scale = vec![0.0; n + 1];
    scale[n] = -1.0;
    qp.inequality(scale, 0.0);

    let solution = qp.solve(&self.solver)?;
    let kappa = solution.x[n];
    if !(kappa > MIN_KAPPA) {
      return Err(PortfolioError::SolverDidNotConverge {
        status: format!("degenerate homogenization scale {kappa:e}"),
      });
    }

    let raw: Vec<f64> = solution.x[..n].iter().map(|y| y / kappa).collect();
    self.finish(&raw, solution.warnings)
  }

  /// Global minimum-variance portfolio.
  pub fn min_volatility(&self) -> Result<Allocation> {
    self.validate()?;
    if let Some(single) = self.single_asset() {
      return Ok(single);
    }

    let qp = self.budget_program();
    let solution = qp.solve(&self.solver)?;
    self.finish(&solution.x, solution.warnings)
  }

  /// Minimum-variance portfolio with expected return of at least `target`.
  pub fn efficient_return(&self, target: f64) -> Result<Allocation> {
    self.validate()?;
    if !target.is_finite() {
      return Err(PortfolioError::invalid(format!(
        "target return must be finite, got {target}"
      )));
    }

    let best = self.max_return();
    if target > best + 1e-9 {
      return Err(PortfolioError::infeasible(format!(
        "target return {target:.4} exceeds the maximum attainable {best:.4}"
      )));
    }

    if let Some(single) = self.single_asset() {
      return Ok(single);
    }

    let mut qp = self.budget_program();
    qp.inequality(self.estimates.mu().iter().map(|m| -m).collect(), -target);
    let solution = qp.solve(&self.solver)?;
    self.finish(&solution.x, solution.warnings)
  }

  /// Sample `points` portfolios between the minimum-volatility return and the
  /// largest attainable return.
  pub fn frontier(&self, points: usize) -> Result<Vec<FrontierPoint>> {
    if points < 2 {
      return Err(PortfolioError::invalid(
        "an efficient frontier needs at least two points",
      ));
    }

    let min_vol = self.min_volatility()?;
    let low = min_vol.performance().expected_return;
    let high = self.max_return();

    let span = high - low;
    if span <= 1e-12 {
      let point = FrontierPoint {
        expected_return: low,
        volatility: min_vol.performance().volatility,
      };
      return Ok(vec![point; points]);
    }

    // Stay just inside the top of the range where the feasible set collapses to a point.
    let top = high - 1e-6 * span;
    let step = (top - low) / (points - 1) as f64;

    (0..points)
      .map(|k| {
        let allocation = if k == 0 {
          min_vol.clone()
        } else {
          self.efficient_return(low + step * k as f64)?
        };
        let perf = allocation.performance();
        Ok(FrontierPoint {
          expected_return: perf.expected_return,
          volatility: perf.volatility,
        })
      })
      .collect()
  }

  /// Model performance of arbitrary weights under these estimates.
  pub fn portfolio_performance(&self, weights: &[f64]) -> Result<Performance> {
    if weights.len() != self.estimates.n_assets() {
      return Err(PortfolioError::invalid(format!(
        "{} weights for {} assets",
        weights.len(),
        self.estimates.n_assets()
      )));
    }
    Ok(Performance::from_weights(
      weights,
      self.estimates.mu(),
      self.estimates.cov(),
      self.risk_free_rate,
    ))
  }

  fn validate(&self) -> Result<()> {
    if !self.risk_free_rate.is_finite() {
      return Err(PortfolioError::invalid("risk-free rate must be finite"));
    }
    if !(0.0..1.0).contains(&self.weight_cutoff) {
      return Err(PortfolioError::invalid(format!(
        "weight cutoff must lie in [0, 1), got {}",
        self.weight_cutoff
      )));
    }
    Ok(())
  }

  fn max_return(&self) -> f64 {
    self
      .bounds
      .max_attainable_return(&self.estimates.mu().to_vec())
  }

  /// `N = 1` needs no solver; bounds were already checked to admit `w = [1]`.
  fn single_asset(&self) -> Option<Allocation> {
    (self.estimates.n_assets() == 1).then(|| {
      let weights = vec![1.0];
      let performance = Performance::from_weights(
        &weights,
        self.estimates.mu(),
        self.estimates.cov(),
        self.risk_free_rate,
      );
      Allocation::new(
        self.estimates.tickers().to_vec(),
        weights,
        performance,
        Vec::new(),
      )
    })
  }

  /// `min w' S w` subject to `sum(w) = 1` and the box bounds.
  fn budget_program(&self) -> QuadraticProgram {
    let n = self.estimates.n_assets();
    let mut qp = QuadraticProgram::new(self.estimates.cov().clone());
    qp.equality(vec![1.0; n], 1.0)
      .boxed(self.bounds.lower(), self.bounds.upper());
    qp
  }

  fn finish(&self, raw: &[f64], warnings: Vec<PortfolioWarning>) -> Result<Allocation> {
    let weights = clean_weights(raw, &self.bounds, self.weight_cutoff)?;
    let performance = Performance::from_weights(
      &weights,
      self.estimates.mu(),
      self.estimates.cov(),
      self.risk_free_rate,
    );
    debug!(
      expected_return = performance.expected_return,
      volatility = performance.volatility,
      sharpe = performance.sharpe,
      "allocation cleaned"
    );

    Ok(Allocation::new(
      self.estimates.tickers().to_vec(),
      weights,
      performance,
      warnings,
    ))
  }
}
