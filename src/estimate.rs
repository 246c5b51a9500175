//! # Estimation
//!
//! $$
//! (R_{t,i}) \mapsto (\hat\mu, \hat\Sigma)
//! $$
//!
//! Annualized expected returns and covariance, checked for conditioning before they
//! reach the solver.

pub mod expected_returns;
pub mod risk_models;

use ndarray::Array1;
use ndarray::Array2;
use tracing::debug;
use tracing::warn;

pub use expected_returns::ReturnEstimator;
pub use expected_returns::TRADING_DAYS_PER_YEAR;
pub use risk_models::Conditioning;
pub use risk_models::CovarianceEstimator;

use crate::data::ReturnSeries;
use crate::error::PortfolioError;
use crate::error::PortfolioWarning;
use crate::error::Result;

/// Smallest annualized variance accepted for an asset.
const MIN_VARIANCE: f64 = 1e-14;

/// Estimator selection and annualization.
#[derive(Clone, Copy, Debug)]
pub struct EstimationSettings {
  /// Periods per year of the sampled data (252 for daily trading data).
  pub frequency: usize,
  pub returns: ReturnEstimator,
  pub covariance: CovarianceEstimator,
}

impl Default for EstimationSettings {
  fn default() -> Self {
    Self {
      frequency: TRADING_DAYS_PER_YEAR,
      returns: ReturnEstimator::Arithmetic,
      covariance: CovarianceEstimator::Sample,
    }
  }
}

/// Expected returns and covariance sharing one asset ordering.
#[derive(Clone, Debug)]
pub struct MarketEstimates {
  tickers: Vec<String>,
  mu: Array1<f64>,
  cov: Array2<f64>,
  observations: usize,
  warnings: Vec<PortfolioWarning>,
}

impl MarketEstimates {
  /// Wrap externally produced estimates.
  ///
  /// Fails with `InvalidInput` when the dimensions disagree and with
  /// `IllConditionedInput` on non-finite entries or a non-positive variance.
  pub fn new(tickers: Vec<String>, mu: Array1<f64>, cov: Array2<f64>) -> Result<Self> {
    let n = tickers.len();
    if n == 0 {
      return Err(PortfolioError::invalid("no assets to optimize"));
    }
    if mu.len() != n || cov.nrows() != n || cov.ncols() != n {
      return Err(PortfolioError::invalid(format!(
        "asset ordering mismatch: {n} tickers, {} expected returns, {}x{} covariance",
        mu.len(),
        cov.nrows(),
        cov.ncols()
      )));
    }

    if let Some(i) = mu.iter().position(|v| !v.is_finite()) {
      return Err(PortfolioError::ill_conditioned(format!(
        "expected return of {} is not finite",
        tickers[i]
      )));
    }
    if cov.iter().any(|v| !v.is_finite()) {
      return Err(PortfolioError::ill_conditioned(
        "covariance matrix has non-finite entries",
      ));
    }
    if let Some(i) = cov.diag().iter().position(|&v| v <= MIN_VARIANCE) {
      return Err(PortfolioError::ill_conditioned(format!(
        "{} has zero variance; drop it or enable covariance shrinkage",
        tickers[i]
      )));
    }

    Ok(Self {
      tickers,
      mu,
      cov,
      observations: 0,
      warnings: Vec::new(),
    })
  }

  /// Estimate `mu` and `S` from a return series.
  pub fn from_returns(returns: &ReturnSeries, settings: &EstimationSettings) -> Result<Self> {
    if settings.frequency == 0 {
      return Err(PortfolioError::invalid("annualization frequency must be positive"));
    }

    let values = returns.values();
    let (observations, assets) = values.dim();
    let mu = settings.returns.estimate(values, settings.frequency)?;
    let cov = settings.covariance.estimate(values, settings.frequency)?;

    if cov.iter().any(|v| !v.is_finite()) {
      return Err(PortfolioError::ill_conditioned(
        "covariance matrix has non-finite entries",
      ));
    }

    let mut warnings = Vec::new();
    if observations < assets {
      warnings.push(PortfolioWarning::RankDeficient {
        observations,
        assets,
      });
    }

    let (cov, repaired) = risk_models::fix_nonpositive_semidefinite(&cov);
    if let Some(min_eigenvalue) = repaired {
      warnings.push(PortfolioWarning::CovarianceRepaired { min_eigenvalue });
    }

    let conditioning = risk_models::conditioning(&cov);
    debug!(
      observations,
      assets,
      rank = conditioning.rank,
      condition_number = conditioning.condition_number(),
      "estimated covariance"
    );
    if conditioning.rank < assets && observations >= assets {
      warnings.push(PortfolioWarning::SingularCovariance {
        rank: conditioning.rank,
        assets,
      });
    }

    for warning in &warnings {
      warn!(%warning, "estimation");
    }

    let mut estimates = Self::new(returns.tickers().to_vec(), mu, cov)?;
    estimates.observations = observations;
    estimates.warnings = warnings;
    Ok(estimates)
  }

  /// Asset ordering shared by `mu` and `cov`.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Annualized expected returns.
  pub fn mu(&self) -> &Array1<f64> {
    &self.mu
  }

  /// Annualized covariance matrix.
  pub fn cov(&self) -> &Array2<f64> {
    &self.cov
  }

  /// Number of assets.
  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  /// Return observations behind the estimates, zero if supplied externally.
  pub fn observations(&self) -> usize {
    self.observations
  }

  /// Warnings raised while estimating.
  pub fn warnings(&self) -> &[PortfolioWarning] {
    &self.warnings
  }
}
