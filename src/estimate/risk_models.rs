//! # Risk Models
//!
//! $$
//! \hat\Sigma = \frac{f}{n-1}\sum_{t=1}^{n}(r_t-\bar r)(r_t-\bar r)^\top,
//! \qquad
//! \hat\Sigma_{\text{LW}} = (1-\delta)\,S + \delta\,\bar\sigma^2 I
//! $$
//!
//! Annualized covariance estimators, positive-semidefinite repair and conditioning
//! diagnostics.

use nalgebra::DMatrix;
use nalgebra::SymmetricEigen;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;

use crate::error::PortfolioError;
use crate::error::Result;

/// Relative eigenvalue threshold below which a direction counts as degenerate.
const RANK_TOL: f64 = 1e-10;

/// Covariance estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CovarianceEstimator {
  /// Annualized sample covariance.
  #[default]
  Sample,
  /// Sample covariance plus `lambda * mean(diag)` on the diagonal.
  DiagonalLoading { lambda: f64 },
  /// Ledoit-Wolf shrinkage toward a constant-variance target.
  LedoitWolf,
}

impl CovarianceEstimator {
  pub fn estimate(&self, returns: &Array2<f64>, frequency: usize) -> Result<Array2<f64>> {
    match *self {
      CovarianceEstimator::Sample => sample_covariance(returns, frequency),
      CovarianceEstimator::DiagonalLoading { lambda } => {
        if !lambda.is_finite() || lambda < 0.0 {
          return Err(PortfolioError::invalid(format!(
            "diagonal loading must be finite and non-negative, got {lambda}"
          )));
        }
        Ok(diagonal_loading(&sample_covariance(returns, frequency)?, lambda))
      }
      CovarianceEstimator::LedoitWolf => ledoit_wolf(returns, frequency).map(|(cov, _)| cov),
    }
  }
}

/// Annualized sample covariance (ddof = 1) of an `observations x assets` matrix.
pub fn sample_covariance(returns: &Array2<f64>, frequency: usize) -> Result<Array2<f64>> {
  let n = returns.nrows();
  if n < 2 {
    return Err(PortfolioError::invalid(format!(
      "at least two return observations are needed to estimate covariance, got {n}"
    )));
  }

  let cov = returns
    .t()
    .cov(1.0)
    .map_err(|_| PortfolioError::invalid("cannot estimate covariance from an empty sample"))?;

  Ok(symmetrize(&cov) * frequency as f64)
}

/// Add `lambda` times the average variance to every diagonal entry.
pub fn diagonal_loading(cov: &Array2<f64>, lambda: f64) -> Array2<f64> {
  let n = cov.nrows();
  if n == 0 {
    return cov.clone();
  }

  let avg_var = cov.diag().sum() / n as f64;
  let mut loaded = cov.clone();
  loaded.diag_mut().mapv_inplace(|v| v + lambda * avg_var);
  loaded
}

/// Ledoit-Wolf shrunk covariance and the shrinkage intensity in `[0, 1]`.
pub fn ledoit_wolf(returns: &Array2<f64>, frequency: usize) -> Result<(Array2<f64>, f64)> {
  let (n, p) = returns.dim();
  if n < 2 {
    return Err(PortfolioError::invalid(format!(
      "at least two return observations are needed to estimate covariance, got {n}"
    )));
  }

  let mean = returns
    .mean_axis(Axis(0))
    .ok_or_else(|| PortfolioError::invalid("cannot estimate covariance from an empty sample"))?;
  let x = returns - &mean;
  let nf = n as f64;
  let pf = p as f64;

  let emp_cov = x.t().dot(&x) / nf;
  let x2 = x.mapv(|v| v * v);
  let var_sum = x2.sum() / nf;
  let mu = var_sum / pf;

  let beta_raw = x2.t().dot(&x2).sum();
  let delta_raw = emp_cov.mapv(|v| v * v).sum();
  let beta = (beta_raw / nf - delta_raw) / (pf * nf);
  let delta = (delta_raw - 2.0 * mu * var_sum + pf * mu * mu) / pf;

  let shrinkage = if delta <= 0.0 {
    0.0
  } else {
    (beta.min(delta) / delta).clamp(0.0, 1.0)
  };

  let mut shrunk = emp_cov * (1.0 - shrinkage);
  shrunk.diag_mut().mapv_inplace(|v| v + shrinkage * mu);

  Ok((symmetrize(&shrunk) * frequency as f64, shrinkage))
}

/// Clip negative eigenvalues to zero.
///
/// Returns the repaired matrix and the most negative eigenvalue found, if any was
/// below tolerance.
pub fn fix_nonpositive_semidefinite(cov: &Array2<f64>) -> (Array2<f64>, Option<f64>) {
  let eigen = SymmetricEigen::new(to_dmatrix(cov));
  let max_abs = eigen.eigenvalues.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
  let min = eigen.eigenvalues.min();

  if min >= -RANK_TOL * max_abs.max(1.0) {
    return (cov.clone(), None);
  }

  let clipped = eigen.eigenvalues.map(|v| v.max(0.0));
  let rebuilt = &eigen.eigenvectors * DMatrix::from_diagonal(&clipped) * eigen.eigenvectors.transpose();
  let repaired = Array2::from_shape_fn(cov.dim(), |(i, j)| rebuilt[(i, j)]);

  (symmetrize(&repaired), Some(min))
}

/// Spectral summary of a symmetric matrix.
#[derive(Clone, Copy, Debug)]
pub struct Conditioning {
  /// Number of eigenvalues above `RANK_TOL * max_eigenvalue`.
  pub rank: usize,
  pub min_eigenvalue: f64,
  pub max_eigenvalue: f64,
}

impl Conditioning {
  /// `max / min` eigenvalue ratio, infinite for singular matrices.
  pub fn condition_number(&self) -> f64 {
    if self.min_eigenvalue <= 0.0 {
      f64::INFINITY
    } else {
      self.max_eigenvalue / self.min_eigenvalue
    }
  }
}

pub fn conditioning(cov: &Array2<f64>) -> Conditioning {
  let eigenvalues = SymmetricEigen::new(to_dmatrix(cov)).eigenvalues;
  let max_eigenvalue = eigenvalues.max();
  let min_eigenvalue = eigenvalues.min();
  let threshold = RANK_TOL * max_eigenvalue.max(0.0);
  let rank = eigenvalues.iter().filter(|&&v| v > threshold).count();

  Conditioning {
    rank,
    min_eigenvalue,
    max_eigenvalue,
  }
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
  DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn symmetrize(a: &Array2<f64>) -> Array2<f64> {
  (a + &a.t()) * 0.5
}
