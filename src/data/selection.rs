//! # Ticker Selection
//!
//! $$
//! \mathcal{S} = \{s_1, \dots, s_N\}, \quad s_i \ne s_j
//! $$
//!
//! Caller-owned set of tickers to optimize over, kept in insertion order.

use std::fmt::Display;

/// Ordered, de-duplicated, upper-case ticker list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickerSelection {
  tickers: Vec<String>,
}

impl Default for TickerSelection {
  fn default() -> Self {
    Self::parse("AAPL, MSFT, TSLA")
  }
}

impl TickerSelection {
  pub fn new() -> Self {
    Self {
      tickers: Vec::new(),
    }
  }

  /// Parse comma-separated user input such as `"aapl, MSFT ,tsla"`.
  pub fn parse(input: &str) -> Self {
    let mut selection = Self::new();
    for ticker in input.split(',') {
      selection.add(ticker);
    }
    selection
  }

  /// Add a ticker; blanks and duplicates are ignored. Returns whether it was added.
  pub fn add(&mut self, ticker: &str) -> bool {
    let ticker = normalize(ticker);
    if ticker.is_empty() || self.contains(&ticker) {
      return false;
    }
    self.tickers.push(ticker);
    true
  }

  /// Remove a ticker. Returns whether it was present.
  pub fn remove(&mut self, ticker: &str) -> bool {
    let ticker = normalize(ticker);
    let before = self.tickers.len();
    self.tickers.retain(|t| *t != ticker);
    self.tickers.len() != before
  }

  pub fn contains(&self, ticker: &str) -> bool {
    let ticker = normalize(ticker);
    self.tickers.iter().any(|t| *t == ticker)
  }

  pub fn clear(&mut self) {
    self.tickers.clear();
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn len(&self) -> usize {
    self.tickers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tickers.is_empty()
  }
}

impl Display for TickerSelection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.tickers.join(", "))
  }
}

fn normalize(ticker: &str) -> String {
  ticker.trim().to_uppercase()
}
