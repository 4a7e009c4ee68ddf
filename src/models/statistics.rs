//! Aggregate performance figures over a trade history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Summary of realized performance across closed trades.
///
/// Values are unrounded; formatting is left to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeStatistics {
    /// Closed trades with a realized P&L
    pub total_trades: u32,

    /// Trades with P&L above zero
    pub winning_trades: u32,

    /// Trades with P&L below zero
    pub losing_trades: u32,

    /// Trades still open in the input set
    pub open_trades: u32,

    /// Win rate (0 to 100)
    pub win_rate: f64,

    pub total_profit_loss: Decimal,

    pub average_profit_loss: Decimal,

    /// Best single trade, zero when there are no winners
    pub largest_win: Decimal,

    /// Worst single trade, zero when there are no losers
    pub largest_loss: Decimal,

    /// Mean risk percentage over closed trades that recorded one
    pub average_risk_percentage: f64,
}

impl TradeStatistics {
    /// Empty summary with every count and sum at zero.
    pub fn empty() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            open_trades: 0,
            win_rate: 0.0,
            total_profit_loss: Decimal::ZERO,
            average_profit_loss: Decimal::ZERO,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            average_risk_percentage: 0.0,
        }
    }

    /// Trades closed at exactly break-even.
    pub fn breakeven_trades(&self) -> u32 {
        self.total_trades - self.winning_trades - self.losing_trades
    }
}

impl Default for TradeStatistics {
    fn default() -> Self {
        Self::empty()
    }
}
