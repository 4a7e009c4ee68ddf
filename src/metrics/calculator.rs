//! Aggregator turning a trade history into win/loss and risk statistics.

use rust_decimal::Decimal;
use statrs::statistics::Statistics;

use crate::models::{Trade, TradeStatistics, TradeStatus};

/// Computes summary statistics over a snapshot of trades.
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    /// Calculate statistics from a trade history.
    ///
    /// Only closed trades with a realized P&L count toward the totals; a
    /// break-even trade is neither a win nor a loss.
    pub fn compute(trades: &[Trade]) -> TradeStatistics {
        let mut stats = TradeStatistics::empty();
        stats.open_trades = trades
            .iter()
            .filter(|t| t.status == TradeStatus::Open)
            .count() as u32;

        let closed: Vec<(&Trade, Decimal)> = trades
            .iter()
            .filter(|t| t.is_closed())
            .filter_map(|t| t.profit_loss.map(|pnl| (t, pnl)))
            .collect();

        if closed.is_empty() {
            return stats;
        }

        let pnls: Vec<Decimal> = closed.iter().map(|(_, pnl)| *pnl).collect();
        Self::calculate_pnl_metrics(&mut stats, &pnls);
        Self::calculate_risk_metrics(&mut stats, &closed);

        stats
    }

    /// Win/loss counts, totals and extremes.
    fn calculate_pnl_metrics(stats: &mut TradeStatistics, pnls: &[Decimal]) {
        let wins: Vec<Decimal> = pnls.iter().copied().filter(|p| *p > Decimal::ZERO).collect();
        let losses: Vec<Decimal> = pnls.iter().copied().filter(|p| *p < Decimal::ZERO).collect();

        stats.total_trades = pnls.len() as u32;
        stats.winning_trades = wins.len() as u32;
        stats.losing_trades = losses.len() as u32;
        stats.total_profit_loss = pnls
            .iter()
            .fold(Decimal::ZERO, |acc, pnl| acc.saturating_add(*pnl));

        stats.win_rate = wins.len() as f64 / pnls.len() as f64 * 100.0;
        stats.average_profit_loss = stats.total_profit_loss / Decimal::from(stats.total_trades);

        stats.largest_win = wins.iter().copied().max().unwrap_or(Decimal::ZERO);
        stats.largest_loss = losses.iter().copied().min().unwrap_or(Decimal::ZERO);
    }

    /// Mean risk percentage across closed trades that recorded one.
    fn calculate_risk_metrics(stats: &mut TradeStatistics, closed: &[(&Trade, Decimal)]) {
        let risks: Vec<f64> = closed
            .iter()
            .filter_map(|(t, _)| t.risk_percentage)
            .collect();

        if risks.is_empty() {
            return;
        }

        stats.average_risk_percentage = risks.mean();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{make_trade, TradeType};
    use rust_decimal_macros::dec;

    fn closed(pnl: Decimal, risk: Option<f64>) -> Trade {
        let mut trade = make_trade(TradeType::Buy, dec!(10), dec!(1));
        trade.status = TradeStatus::Closed;
        trade.profit_loss = Some(pnl);
        trade.risk_percentage = risk;
        trade
    }

    fn open() -> Trade {
        make_trade(TradeType::Buy, dec!(10), dec!(1))
    }

    #[test]
    fn test_empty_history_is_all_zero() {
        let stats = StatisticsAggregator::compute(&[]);

        assert_eq!(stats, TradeStatistics::empty());
        assert_eq!(stats.win_rate, 0.0);
        assert!(!stats.win_rate.is_nan());
    }

    #[test]
    fn test_only_open_trades_is_all_zero() {
        let stats = StatisticsAggregator::compute(&[open(), open()]);

        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.open_trades, 2);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.average_profit_loss, Decimal::ZERO);
    }

    #[test]
    fn test_mixed_history() {
        let trades = vec![closed(dec!(100), None), closed(dec!(-50), None), open()];
        let stats = StatisticsAggregator::compute(&trades);

        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.open_trades, 1);
        assert!((stats.win_rate - 50.0).abs() < 1e-9);
        assert_eq!(stats.total_profit_loss, dec!(50));
        assert_eq!(stats.average_profit_loss, dec!(25));
        assert_eq!(stats.largest_win, dec!(100));
        assert_eq!(stats.largest_loss, dec!(-50));
    }

    #[test]
    fn test_breakeven_counts_toward_neither() {
        let trades = vec![closed(dec!(0), None), closed(dec!(30), None), closed(dec!(0), None)];
        let stats = StatisticsAggregator::compute(&trades);

        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 0);
        assert_eq!(stats.breakeven_trades(), 2);
        assert!(stats.winning_trades + stats.losing_trades <= stats.total_trades);
        assert!((stats.win_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_extremes_are_signed_correctly() {
        let all_losses = vec![closed(dec!(-10), None), closed(dec!(-80), None)];
        let stats = StatisticsAggregator::compute(&all_losses);
        assert_eq!(stats.largest_win, Decimal::ZERO);
        assert_eq!(stats.largest_loss, dec!(-80));

        let all_wins = vec![closed(dec!(10), None), closed(dec!(80), None)];
        let stats = StatisticsAggregator::compute(&all_wins);
        assert_eq!(stats.largest_win, dec!(80));
        assert_eq!(stats.largest_loss, Decimal::ZERO);
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let trades = vec![closed(Decimal::MAX, None), closed(Decimal::MAX, None)];
        let stats = StatisticsAggregator::compute(&trades);

        assert_eq!(stats.total_profit_loss, Decimal::MAX);
        assert_eq!(stats.winning_trades, 2);
    }

    #[test]
    fn test_closed_without_pnl_is_ignored() {
        let mut unpriced = open();
        unpriced.status = TradeStatus::Closed;

        let stats = StatisticsAggregator::compute(&[unpriced, closed(dec!(5), None)]);
        assert_eq!(stats.total_trades, 1);
    }

    #[test]
    fn test_average_risk_uses_recorded_values_only() {
        let mut open_risky = open();
        open_risky.risk_percentage = Some(50.0);

        let trades = vec![
            closed(dec!(10), Some(1.0)),
            closed(dec!(-10), Some(3.0)),
            closed(dec!(20), None),
            open_risky,
        ];
        let stats = StatisticsAggregator::compute(&trades);

        assert!((stats.average_risk_percentage - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_risk_zero_without_data() {
        let stats = StatisticsAggregator::compute(&[closed(dec!(10), None)]);
        assert_eq!(stats.average_risk_percentage, 0.0);
    }
}
