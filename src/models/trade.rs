//! Trade model representing a single journal entry.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of order that opened the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Buy,
    Sell,
    BuyToCover,
    SellShort,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
            TradeType::BuyToCover => "buy_to_cover",
            TradeType::SellShort => "sell_short",
        }
    }

    /// Long positions profit when the exit is above the entry.
    pub fn is_long(&self) -> bool {
        matches!(self, TradeType::Buy | TradeType::BuyToCover)
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            "buy_to_cover" => Ok(Self::BuyToCover),
            "sell_short" => Ok(Self::SellShort),
            other => Err(format!("unknown trade type: {}", other)),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Lifecycle status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown trade status: {}", other)),
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Market outlook recorded with the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl TradeSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSentiment::Bullish => "bullish",
            TradeSentiment::Bearish => "bearish",
            TradeSentiment::Neutral => "neutral",
        }
    }
}

impl FromStr for TradeSentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bullish" => Ok(Self::Bullish),
            "bearish" => Ok(Self::Bearish),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown sentiment: {}", other)),
        }
    }
}

impl fmt::Display for TradeSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Journal record of a single position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Unique identifier, assigned once at creation
    pub id: String,

    /// Ticker symbol
    pub symbol: String,

    /// Entry date
    pub date: NaiveDate,

    /// Order type that opened the position
    #[serde(rename = "type")]
    pub trade_type: TradeType,

    /// Entry price per unit
    pub price: Decimal,

    /// Number of units
    pub quantity: Decimal,

    pub status: TradeStatus,

    pub sentiment: TradeSentiment,

    /// Exit price, only for closed trades
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDate>,

    /// Realized P&L in account currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<Decimal>,

    /// Realized P&L as a percentage of entry value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_loss_percentage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Decimal>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Image references (URLs or encoded data); stored as given
    #[serde(default)]
    pub images: Vec<String>,

    /// Account balance at entry, for risk sizing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_balance: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,

    /// Capital at risk as a percentage of account balance, fixed at entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_percentage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_management_feedback: Option<String>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Cost of the position at entry. Saturates at `Decimal::MAX`; drafts
    /// that large are rejected by validation.
    pub fn entry_value(&self) -> Decimal {
        self.price.saturating_mul(self.quantity)
    }

    /// Calculate P&L if the position were closed at the given price.
    pub fn calculate_pnl(&self, exit_price: Decimal) -> Decimal {
        let exit_value = exit_price.saturating_mul(self.quantity);
        if self.trade_type.is_long() {
            exit_value.saturating_sub(self.entry_value())
        } else {
            self.entry_value().saturating_sub(exit_value)
        }
    }

    /// Express a P&L amount relative to entry value.
    pub fn pnl_percentage(&self, pnl: Decimal) -> f64 {
        let entry = self.entry_value();
        if entry.is_zero() {
            return 0.0;
        }
        match pnl.checked_div(entry) {
            Some(ratio) => ratio.to_f64().unwrap_or(0.0) * 100.0,
            // Ratio beyond Decimal range
            None => pnl.to_f64().unwrap_or(0.0) / entry.to_f64().unwrap_or(1.0) * 100.0,
        }
    }

    /// Recompute the realized P&L fields from the current exit terms.
    ///
    /// P&L exists only for a closed trade with an exit price; every other
    /// state clears it.
    pub fn refresh_profit_loss(&mut self) {
        match (self.status, self.exit_price) {
            (TradeStatus::Closed, Some(exit)) => {
                let pnl = self.calculate_pnl(exit);
                self.profit_loss_percentage = Some(self.pnl_percentage(pnl));
                self.profit_loss = Some(pnl);
            }
            _ => {
                self.profit_loss = None;
                self.profit_loss_percentage = None;
            }
        }
    }

    /// Whether the trade matches a case-insensitive search term over symbol,
    /// notes, strategy and tags.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        let contains = |s: &str| s.to_lowercase().contains(&needle);

        contains(&self.symbol)
            || self.notes.as_deref().is_some_and(contains)
            || self.strategy.as_deref().is_some_and(contains)
            || self.tags.iter().any(|t| contains(t))
    }
}
