//! Data models for trades, trade input, and performance statistics.

mod draft;
mod statistics;
mod trade;

pub use draft::{FieldError, TradeDraft};
pub use statistics::TradeStatistics;
pub use trade::{Trade, TradeSentiment, TradeStatus, TradeType};

#[cfg(test)]
pub(crate) use trade::tests::make_trade;
