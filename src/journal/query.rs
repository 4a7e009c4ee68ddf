//! Search, filter and sort options for listing trades.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::{Trade, TradeStatus, TradeType};

/// Ordering applied to a trade listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    DateAsc,
    #[default]
    DateDesc,
    SymbolAsc,
    SymbolDesc,
    ProfitDesc,
    ProfitAsc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "dateasc" | "oldest" => Ok(Self::DateAsc),
            "datedesc" | "newest" => Ok(Self::DateDesc),
            "symbolasc" | "symbol" => Ok(Self::SymbolAsc),
            "symboldesc" => Ok(Self::SymbolDesc),
            "profitdesc" | "pnldesc" | "best" => Ok(Self::ProfitDesc),
            "profitasc" | "pnlasc" | "worst" => Ok(Self::ProfitAsc),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Listing criteria. The default matches every trade, newest first.
#[derive(Debug, Clone, Default)]
pub struct TradeQuery {
    pub search: Option<String>,
    pub status: Option<TradeStatus>,
    pub trade_type: Option<TradeType>,
    pub sort: SortOrder,
}

impl TradeQuery {
    fn matches(&self, trade: &Trade) -> bool {
        if let Some(term) = self.search.as_deref().filter(|s| !s.is_empty()) {
            if !trade.matches_search(term) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != trade.status) {
            return false;
        }
        if self.trade_type.is_some_and(|t| t != trade.trade_type) {
            return false;
        }
        true
    }

    /// Filter and sort a trade snapshot.
    pub fn apply(&self, trades: Vec<Trade>) -> Vec<Trade> {
        let mut result: Vec<Trade> = trades.into_iter().filter(|t| self.matches(t)).collect();

        let pnl = |t: &Trade| t.profit_loss.unwrap_or(Decimal::ZERO);
        let by_symbol = |a: &Trade, b: &Trade| a.symbol.to_lowercase().cmp(&b.symbol.to_lowercase());

        result.sort_by(|a, b| -> Ordering {
            match self.sort {
                SortOrder::DateAsc => a.date.cmp(&b.date),
                SortOrder::DateDesc => b.date.cmp(&a.date),
                SortOrder::SymbolAsc => by_symbol(a, b),
                SortOrder::SymbolDesc => by_symbol(b, a),
                SortOrder::ProfitDesc => pnl(b).cmp(&pnl(a)),
                SortOrder::ProfitAsc => pnl(a).cmp(&pnl(b)),
            }
        });

        result
    }
}
