//! # Market Data
//!
//! $$
//! r_{t,i} = \frac{p_{t,i} - p_{t-1,i}}{p_{t-1,i}}
//! $$
//!
//! Price series, aligned price panels, simple return series and the caller-owned
//! ticker selection handed to a [`PriceSource`].

pub mod panel;
pub mod returns;
pub mod selection;
pub mod series;
pub mod source;

pub use panel::Alignment;
pub use panel::ExcludedAsset;
pub use panel::ExclusionReason;
pub use panel::PricePanel;
pub use returns::ReturnSeries;
pub use selection::TickerSelection;
pub use series::Asset;
pub use source::DateRange;
pub use source::PriceSource;
