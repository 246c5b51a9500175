//! # Errors
//!
//! $$
//! \text{optimize} : (\text{panel}, \text{bounds}, r_f) \to \mathbf{w} \mid \text{PortfolioError}
//! $$
//!
//! Error taxonomy shared by estimation, the QP binding and the engine, plus the
//! non-fatal warnings reported alongside a successful allocation.

use std::fmt::Display;

use thiserror::Error;

/// Error type for portfolio estimation and optimization.
#[derive(Debug, Error)]
pub enum PortfolioError {
  /// Empty or too-small panel, mismatched asset ordering, or an invalid parameter.
  #[error("Invalid input: {0}")]
  InvalidInput(String),

  /// The weight constraints admit no portfolio.
  #[error("Infeasible constraints: {0}")]
  InfeasibleConstraints(String),

  /// Singular, non-finite or otherwise unusable estimates.
  #[error("Ill-conditioned input: {0}")]
  IllConditionedInput(String),

  /// The QP solver stopped without an optimal point.
  #[error("Solver did not converge (status: {status})")]
  SolverDidNotConverge { status: String },

  /// The price source failed to deliver data.
  #[error("Price source error: {0}")]
  Source(#[from] anyhow::Error),
}

/// Result type for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;

impl PortfolioError {
  pub(crate) fn invalid(msg: impl Into<String>) -> Self {
    Self::InvalidInput(msg.into())
  }

  pub(crate) fn infeasible(msg: impl Into<String>) -> Self {
    Self::InfeasibleConstraints(msg.into())
  }

  pub(crate) fn ill_conditioned(msg: impl Into<String>) -> Self {
    Self::IllConditionedInput(msg.into())
  }
}

/// Non-fatal condition surfaced next to a result.
#[derive(Clone, Debug, PartialEq)]
pub enum PortfolioWarning {
  /// Fewer return observations than assets; the sample covariance is rank-deficient.
  RankDeficient { observations: usize, assets: usize },
  /// The covariance matrix has numerical rank below the number of assets.
  SingularCovariance { rank: usize, assets: usize },
  /// Negative eigenvalues were clipped to make the covariance positive semidefinite.
  CovarianceRepaired { min_eigenvalue: f64 },
  /// The solver stopped at a point within relaxed tolerances.
  ReducedAccuracy { status: String },
}

impl Display for PortfolioWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PortfolioWarning::RankDeficient {
        observations,
        assets,
      } => write!(
        f,
        "only {observations} return observations for {assets} assets; covariance is rank-deficient and the allocation may be unstable"
      ),
      PortfolioWarning::SingularCovariance { rank, assets } => {
        write!(f, "covariance matrix has rank {rank} for {assets} assets")
      }
      PortfolioWarning::CovarianceRepaired { min_eigenvalue } => write!(
        f,
        "covariance matrix was not positive semidefinite (min eigenvalue {min_eigenvalue:e}) and was repaired"
      ),
      PortfolioWarning::ReducedAccuracy { status } => {
        write!(f, "solver finished with reduced accuracy ({status})")
      }
    }
  }
}
