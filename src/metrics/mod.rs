//! Performance metrics over a trade history.

mod calculator;

pub use calculator::StatisticsAggregator;
