//! # Weight Cleaning
//!
//! $$
//! \tilde w_i = \begin{cases}0 & |w_i| < c\\ w_i & \text{otherwise}\end{cases},
//! \qquad \sum_i \tilde w_i = 1
//! $$
//!
//! Snap solver dust to zero and restore a unit budget inside the bounds.

use super::bounds::ResolvedBounds;
use crate::error::PortfolioError;
use crate::error::Result;

const BOUND_TOL: f64 = 1e-9;

/// Clean raw solver weights.
///
/// Weights are clamped into their bounds, entries below `cutoff` are zeroed (when zero
/// is allowed), and the vector is rescaled to sum to one. If rescaling would breach a
/// bound, the residual is spread over the surviving assets in proportion to their
/// slack instead.
pub fn clean_weights(raw: &[f64], bounds: &ResolvedBounds, cutoff: f64) -> Result<Vec<f64>> {
  if raw.len() != bounds.len() {
    return Err(PortfolioError::invalid(format!(
      "{} weights for {} bounds",
      raw.len(),
      bounds.len()
    )));
  }
  if raw.iter().any(|w| !w.is_finite()) {
    return Err(PortfolioError::SolverDidNotConverge {
      status: "non-finite weights".into(),
    });
  }

  let lower = bounds.lower();
  let upper = bounds.upper();
  let mut w: Vec<f64> = raw
    .iter()
    .zip(lower.iter().zip(upper.iter()))
    .map(|(w, (lo, hi))| w.clamp(*lo, *hi))
    .collect();

  let mut kept = vec![true; w.len()];
  for i in 0..w.len() {
    if w[i].abs() < cutoff && lower[i] <= 0.0 {
      w[i] = 0.0;
      kept[i] = false;
    }
  }

  let sum: f64 = w.iter().sum();
  if sum <= 0.0 {
    return Err(PortfolioError::SolverDidNotConverge {
      status: "all weights vanished after cleaning".into(),
    });
  }

  let scaled: Vec<f64> = w.iter().map(|v| v / sum).collect();
  if bounds.contains(&scaled, BOUND_TOL) {
    return Ok(scaled);
  }

  if !redistribute(&mut w, &kept, lower, upper) {
    let all = vec![true; w.len()];
    if !redistribute(&mut w, &all, lower, upper) {
      return Err(PortfolioError::infeasible(
        "cleaned weights cannot be brought back to a unit budget within bounds",
      ));
    }
  }

  Ok(w)
}

/// Spread `1 - sum(w)` over eligible assets by slack. Returns false if slack runs out.
fn redistribute(w: &mut [f64], eligible: &[bool], lower: &[f64], upper: &[f64]) -> bool {
  let residual = 1.0 - w.iter().sum::<f64>();
  let slack: Vec<f64> = (0..w.len())
    .map(|i| {
      if !eligible[i] {
        0.0
      } else if residual > 0.0 {
        upper[i] - w[i]
      } else {
        w[i] - lower[i]
      }
    })
    .collect();

  let total: f64 = slack.iter().sum();
  if total + BOUND_TOL < residual.abs() {
    return false;
  }
  if total <= 0.0 {
    return residual.abs() <= BOUND_TOL;
  }

  for i in 0..w.len() {
    w[i] = (w[i] + residual * slack[i] / total).clamp(lower[i], upper[i]);
  }
  true
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::optimizer::bounds::WeightBounds;

  fn bounds(n: usize, cap: f64) -> ResolvedBounds {
    let tickers: Vec<String> = (0..n).map(|i| format!("T{i}")).collect();
    WeightBounds::cap(cap).resolve(&tickers).unwrap()
  }

  #[test]
  fn snaps_dust_and_renormalizes() {
    let w = clean_weights(&[0.59996, 0.4, 0.00004], &bounds(3, 1.0), 1e-4).unwrap();
    assert_eq!(w[2], 0.0);
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(w[0] / w[1], 0.59996 / 0.4, epsilon = 1e-9);
  }

  #[test]
  fn clamps_slightly_negative_solver_output() {
    let w = clean_weights(&[-1e-9, 0.5, 0.5], &bounds(3, 1.0), 1e-4).unwrap();
    assert!(w.iter().all(|&v| v >= 0.0));
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
  }

  #[test]
  fn renormalization_respects_cap() {
    let raw = [0.3, 0.3, 0.3, 0.09995, 0.00005];
    let b = bounds(5, 0.3);
    let w = clean_weights(&raw, &b, 1e-4).unwrap();

    assert_eq!(w[4], 0.0);
    assert!(b.contains(&w, 1e-12));
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(w[3], 0.1, epsilon = 1e-9);
  }

  #[test]
  fn rejects_non_finite_weights() {
    let err = clean_weights(&[f64::NAN, 1.0], &bounds(2, 1.0), 1e-4);
    assert!(matches!(err, Err(PortfolioError::SolverDidNotConverge { .. })));
  }
}
