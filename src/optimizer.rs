//! # Optimizer
//!
//! $$
//! \min_{\mathbf w}\ \mathbf w^\top \Sigma \mathbf w
//! \quad\text{s.t.}\quad \mathbf 1^\top \mathbf w = 1,\; \ell \le \mathbf w \le u
//! $$
//!
//! Long-only mean-variance optimization on top of the Clarabel QP solver.

pub mod baseline;
pub mod bounds;
pub mod clean;
pub mod efficient_frontier;
pub(crate) mod qp;
pub mod types;

pub use baseline::equal_weight;
pub use bounds::ResolvedBounds;
pub use bounds::WeightBounds;
pub use clean::clean_weights;
pub use efficient_frontier::EfficientFrontier;
pub use efficient_frontier::DEFAULT_RISK_FREE_RATE;
pub use efficient_frontier::DEFAULT_WEIGHT_CUTOFF;
pub use qp::SolverSettings;
pub use types::Allocation;
pub use types::FrontierPoint;
pub use types::Objective;
pub use types::Performance;
