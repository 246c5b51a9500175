//! # efficient-frontier
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\hat\mu^\top\mathbf w-r_f}{\sqrt{\mathbf w^\top\hat\Sigma\mathbf w}}
//! \quad\text{s.t.}\quad \mathbf 1^\top\mathbf w=1,\ \ell\le\mathbf w\le u
//! $$
//!
//! Mean-variance portfolio optimization over historical price panels.
//!
//! Prices are aligned into a [`data::PricePanel`], turned into simple returns and
//! annualized estimates ([`estimate::MarketEstimates`]), and optimized with the
//! Clarabel interior-point solver. [`engine::PortfolioEngine`] runs the whole pipeline
//! and reports the cleaned allocation next to an equal-weight baseline.

pub mod data;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod optimizer;
pub mod report;

pub use engine::OptimizationReport;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use error::PortfolioError;
pub use error::PortfolioWarning;
pub use error::Result;

pub mod prelude {
  pub use crate::data::Alignment;
  pub use crate::data::Asset;
  pub use crate::data::DateRange;
  pub use crate::data::PricePanel;
  pub use crate::data::PriceSource;
  pub use crate::data::TickerSelection;
  pub use crate::engine::OptimizationReport;
  pub use crate::engine::PortfolioEngine;
  pub use crate::engine::PortfolioEngineConfig;
  pub use crate::error::PortfolioError;
  pub use crate::error::PortfolioWarning;
  pub use crate::estimate::CovarianceEstimator;
  pub use crate::estimate::EstimationSettings;
  pub use crate::estimate::MarketEstimates;
  pub use crate::estimate::ReturnEstimator;
  pub use crate::optimizer::Allocation;
  pub use crate::optimizer::EfficientFrontier;
  pub use crate::optimizer::Objective;
  pub use crate::optimizer::Performance;
  pub use crate::optimizer::SolverSettings;
  pub use crate::optimizer::WeightBounds;
  pub use crate::report::summary_table;
  pub use crate::report::Holding;
}
