//! # Quadratic Program
//!
//! $$
//! \min_x \tfrac12 x^\top P x + q^\top x
//! \quad\text{s.t.}\quad A_{\text{eq}}x = b_{\text{eq}},\; A_{\text{in}}x \le b_{\text{in}}
//! $$
//!
//! Dense QP assembly and the Clarabel interior-point binding.

use clarabel::algebra::CscMatrix;
use clarabel::solver::DefaultSettingsBuilder;
use clarabel::solver::DefaultSolver;
use clarabel::solver::IPSolver;
use clarabel::solver::SolverStatus;
use clarabel::solver::SupportedConeT;
use ndarray::Array2;
use tracing::debug;

use crate::error::PortfolioError;
use crate::error::PortfolioWarning;
use crate::error::Result;

/// Interior-point solver settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
  /// Maximum interior-point iterations.
  pub max_iter: u32,
  /// Wall-clock limit in seconds.
  pub time_limit: f64,
  /// Absolute duality-gap tolerance.
  pub tol_gap_abs: f64,
  /// Relative duality-gap tolerance.
  pub tol_gap_rel: f64,
  /// Feasibility tolerance.
  pub tol_feas: f64,
  /// Print solver progress.
  pub verbose: bool,
}

impl Default for SolverSettings {
  fn default() -> Self {
    Self {
      max_iter: 200,
      time_limit: f64::INFINITY,
      tol_gap_abs: 1e-8,
      tol_gap_rel: 1e-8,
      tol_feas: 1e-8,
      verbose: false,
    }
  }
}

/// Optimal point of a solved program.
#[derive(Clone, Debug)]
pub(crate) struct QpSolution {
  pub x: Vec<f64>,
  pub warnings: Vec<PortfolioWarning>,
}

/// Convex QP with a dense positive-semidefinite `P` and dense constraint rows.
pub(crate) struct QuadraticProgram {
  p: Array2<f64>,
  q: Vec<f64>,
  eq: Vec<(Vec<f64>, f64)>,
  ineq: Vec<(Vec<f64>, f64)>,
}

impl QuadraticProgram {
  pub fn new(p: Array2<f64>) -> Self {
    let n = p.nrows();
    Self {
      p,
      q: vec![0.0; n],
      eq: Vec::new(),
      ineq: Vec::new(),
    }
  }

  pub fn n_vars(&self) -> usize {
    self.q.len()
  }

  /// Add `a' x = b`.
  pub fn equality(&mut self, a: Vec<f64>, b: f64) -> &mut Self {
    debug_assert_eq!(a.len(), self.n_vars());
    self.eq.push((a, b));
    self
  }

  /// Add `a' x <= b`.
  pub fn inequality(&mut self, a: Vec<f64>, b: f64) -> &mut Self {
    debug_assert_eq!(a.len(), self.n_vars());
    self.ineq.push((a, b));
    self
  }

  /// Add `lower_i <= x_i <= upper_i` for the first `lower.len()` variables.
  pub fn boxed(&mut self, lower: &[f64], upper: &[f64]) -> &mut Self {
    let n = self.n_vars();
    for (i, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
      let mut row = vec![0.0; n];
      row[i] = 1.0;
      self.inequality(row, hi);

      let mut row = vec![0.0; n];
      row[i] = -1.0;
      self.inequality(row, -lo);
    }
    self
  }

  pub fn solve(&self, settings: &SolverSettings) -> Result<QpSolution> {
    let n = self.n_vars();
    let p = upper_triangle_csc(&self.p);

    let rows: Vec<&Vec<f64>> = self
      .eq
      .iter()
      .chain(self.ineq.iter())
      .map(|(a, _)| a)
      .collect();
    let b: Vec<f64> = self
      .eq
      .iter()
      .chain(self.ineq.iter())
      .map(|(_, b)| *b)
      .collect();
    let a = rows_csc(&rows, n);

    let mut cones = Vec::with_capacity(2);
    if !self.eq.is_empty() {
      cones.push(SupportedConeT::ZeroConeT(self.eq.len()));
    }
    if !self.ineq.is_empty() {
      cones.push(SupportedConeT::NonnegativeConeT(self.ineq.len()));
    }

    let clarabel_settings = DefaultSettingsBuilder::default()
      .verbose(settings.verbose)
      .max_iter(settings.max_iter)
      .time_limit(settings.time_limit)
      .tol_gap_abs(settings.tol_gap_abs)
      .tol_gap_rel(settings.tol_gap_rel)
      .tol_feas(settings.tol_feas)
      .build()
      .map_err(|e| PortfolioError::invalid(format!("solver settings: {e}")))?;

    let mut solver = DefaultSolver::new(&p, &self.q, &a, &b, &cones, clarabel_settings);
    solver.solve();

    let status = solver.solution.status;
    debug!(
      status = ?status,
      iterations = solver.info.iterations,
      solve_time = solver.solution.solve_time,
      "clarabel finished"
    );

    let warnings = classify_status(status)?.into_iter().collect();

    let x = solver.solution.x.clone();
    if x.iter().any(|v| !v.is_finite()) {
      return Err(PortfolioError::SolverDidNotConverge {
        status: "non-finite solution".into(),
      });
    }

    Ok(QpSolution { x, warnings })
  }
}

/// Map a terminal solver status to success, a warning or an error.
fn classify_status(status: SolverStatus) -> Result<Option<PortfolioWarning>> {
  match status {
    SolverStatus::Solved => Ok(None),
    SolverStatus::AlmostSolved => Ok(Some(PortfolioWarning::ReducedAccuracy {
      status: format!("{status:?}"),
    })),
    SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => Err(
      PortfolioError::infeasible("no portfolio satisfies the weight constraints"),
    ),
    SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
      Err(PortfolioError::ill_conditioned(
        "objective is unbounded; the covariance matrix is likely singular, consider shrinkage",
      ))
    }
    other => Err(PortfolioError::SolverDidNotConverge {
      status: format!("{other:?}"),
    }),
  }
}

/// Upper triangle of a dense square matrix in CSC form, as Clarabel expects for `P`.
fn upper_triangle_csc(m: &Array2<f64>) -> CscMatrix<f64> {
  let n = m.nrows();
  let mut colptr = Vec::with_capacity(n + 1);
  let mut rowval = Vec::new();
  let mut nzval = Vec::new();

  colptr.push(0);
  for j in 0..n {
    for i in 0..=j {
      let v = m[[i, j]];
      if v != 0.0 {
        rowval.push(i);
        nzval.push(v);
      }
    }
    colptr.push(nzval.len());
  }

  CscMatrix::new(n, n, colptr, rowval, nzval)
}

/// Stack dense rows into an `m x n` CSC matrix.
fn rows_csc(rows: &[&Vec<f64>], n: usize) -> CscMatrix<f64> {
  let mut colptr = Vec::with_capacity(n + 1);
  let mut rowval = Vec::new();
  let mut nzval = Vec::new();

  colptr.push(0);
  for j in 0..n {
    for (i, row) in rows.iter().enumerate() {
      let v = row[j];
      if v != 0.0 {
        rowval.push(i);
        nzval.push(v);
      }
    }
    colptr.push(nzval.len());
  }

  CscMatrix::new(rows.len(), n, colptr, rowval, nzval)
}
