//! # Report
//!
//! $$
//! a_i = w_i \cdot V
//! $$
//!
//! Investment breakdown and a plain-text summary of an optimization report.

use prettytable::row;
use prettytable::Table;

use crate::engine::OptimizationReport;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::optimizer::Allocation;

/// Capital assigned to one ticker.
#[derive(Clone, Debug, PartialEq)]
pub struct Holding {
  pub ticker: String,
  pub weight: f64,
  pub amount: f64,
}

impl Allocation {
  /// Split `investment` across the allocation by weight.
  pub fn breakdown(&self, investment: f64) -> Result<Vec<Holding>> {
    if !investment.is_finite() || investment < 0.0 {
      return Err(PortfolioError::invalid(format!(
        "investment must be a finite non-negative amount, got {investment}"
      )));
    }

    Ok(
      self
        .iter()
        .map(|(ticker, weight)| Holding {
          ticker: ticker.to_string(),
          weight,
          amount: weight * investment,
        })
        .collect(),
    )
  }
}

/// `0.1234` as `"12.34%"`.
pub fn format_percent(value: f64) -> String {
  format!("{:.2}%", value * 100.0)
}

/// Weights of the optimized and equal-weight portfolios, then their performance.
pub fn summary_table(report: &OptimizationReport) -> Table {
  let mut table = Table::new();
  table.set_titles(row!["Ticker", "Optimized", "Equal weight"]);

  for (ticker, weight) in report.allocation.iter() {
    let baseline = report.baseline.weight(ticker).unwrap_or(0.0);
    table.add_row(row![ticker, format_percent(weight), format_percent(baseline)]);
  }

  let opt = report.allocation.performance();
  let eq = report.baseline.performance();
  table.add_row(row![
    "Expected annual return",
    format_percent(opt.expected_return),
    format_percent(eq.expected_return)
  ]);
  table.add_row(row![
    "Annual volatility",
    format_percent(opt.volatility),
    format_percent(eq.volatility)
  ]);
  table.add_row(row![
    "Sharpe ratio",
    format!("{:.2}", opt.sharpe),
    format!("{:.2}", eq.sharpe)
  ]);

  for excluded in &report.excluded {
    table.add_row(row![excluded.ticker, "excluded", excluded.reason.to_string()]);
  }

  table
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::data::ExcludedAsset;
  use crate::data::ExclusionReason;
  use crate::optimizer::Performance;

  fn allocation(weights: Vec<f64>, performance: Performance) -> Allocation {
    let tickers = ["AAPL", "MSFT", "TSLA"][..weights.len()]
      .iter()
      .map(|t| t.to_string())
      .collect();
    Allocation::new(tickers, weights, performance, Vec::new())
  }

  #[test]
  fn breakdown_splits_investment() {
    let alloc = allocation(vec![0.5, 0.3, 0.2], Performance::default());
    let holdings = alloc.breakdown(10_000.0).unwrap();

    assert_eq!(holdings.len(), 3);
    assert_eq!(holdings[1].ticker, "MSFT");
    assert_abs_diff_eq!(holdings[1].amount, 3_000.0, epsilon = 1e-9);
    assert_abs_diff_eq!(
      holdings.iter().map(|h| h.amount).sum::<f64>(),
      10_000.0,
      epsilon = 1e-9
    );
  }

  #[test]
  fn breakdown_rejects_bad_amounts() {
    let alloc = allocation(vec![1.0], Performance::default());
    assert!(alloc.breakdown(-1.0).is_err());
    assert!(alloc.breakdown(f64::INFINITY).is_err());
    assert!(alloc.breakdown(0.0).is_ok());
  }

  #[test]
  fn percent_formatting() {
    assert_eq!(format_percent(0.1234), "12.34%");
    assert_eq!(format_percent(1.0), "100.00%");
    assert_eq!(format_percent(0.0), "0.00%");
  }

  #[test]
  fn summary_lists_weights_performance_and_exclusions() {
    let perf = Performance {
      expected_return: 0.18,
      volatility: 0.22,
      sharpe: 0.7272,
    };
    let report = OptimizationReport {
      allocation: allocation(vec![0.6, 0.4], perf),
      baseline: allocation(vec![0.5, 0.5], Performance::default()),
      excluded: vec![ExcludedAsset::new("TSLA", ExclusionReason::NoData)],
      warnings: Vec::new(),
      observations: 250,
      period: None,
    };

    let text = summary_table(&report).to_string();
    assert!(text.contains("AAPL"));
    assert!(text.contains("60.00%"));
    assert!(text.contains("50.00%"));
    assert!(text.contains("18.00%"));
    assert!(text.contains("0.73"));
    assert!(text.contains("TSLA"));
  }
}
