//! Unvalidated trade input as captured from the user.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::risk::RiskAssessor;

use super::{Trade, TradeSentiment, TradeStatus, TradeType};

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Trade fields supplied on entry or edit, before derived values exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDraft {
    pub symbol: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub price: Decimal,
    pub quantity: Decimal,
    pub status: TradeStatus,
    pub sentiment: TradeSentiment,
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    #[serde(default)]
    pub exit_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub setup: Option<String>,
    #[serde(default)]
    pub risk: Option<Decimal>,
    #[serde(default)]
    pub reward: Option<Decimal>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub account_balance: Option<Decimal>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
}

impl TradeDraft {
    /// Minimal draft with the required fields; everything optional is empty.
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        trade_type: TradeType,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            trade_type,
            price,
            quantity,
            status: TradeStatus::Open,
            sentiment: TradeSentiment::Neutral,
            exit_price: None,
            exit_date: None,
            notes: None,
            strategy: None,
            setup: None,
            risk: None,
            reward: None,
            tags: Vec::new(),
            images: Vec::new(),
            account_balance: None,
            stop_loss: None,
        }
    }

    /// Check every field and report all problems at once.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.symbol.trim().is_empty() {
            errors.push(FieldError::new("symbol", "Symbol is required"));
        }
        if self.price <= Decimal::ZERO {
            errors.push(FieldError::new("price", "Price must be positive"));
        }
        if self.quantity <= Decimal::ZERO {
            errors.push(FieldError::new("quantity", "Quantity must be positive"));
        }
        if matches!(self.exit_price, Some(p) if p <= Decimal::ZERO) {
            errors.push(FieldError::new("exitPrice", "Exit price must be positive"));
        }
        if matches!(self.exit_date, Some(d) if d < self.date) {
            errors.push(FieldError::new(
                "exitDate",
                "Exit date cannot be before the trade date",
            ));
        }
        if matches!(self.account_balance, Some(b) if b <= Decimal::ZERO) {
            errors.push(FieldError::new(
                "accountBalance",
                "Account balance must be positive",
            ));
        }
        if matches!(self.stop_loss, Some(s) if s < Decimal::ZERO) {
            errors.push(FieldError::new("stopLoss", "Stop loss cannot be negative"));
        }
        if errors.is_empty() {
            self.check_position_size(&mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reject positions whose value or risk falls outside decimal range.
    fn check_position_size(&self, errors: &mut Vec<FieldError>) {
        let too_large = |price: Decimal| price.checked_mul(self.quantity).is_none();

        if too_large(self.price) {
            errors.push(FieldError::new("quantity", "Position size is too large"));
        }
        if self.exit_price.is_some_and(too_large) {
            errors.push(FieldError::new("exitPrice", "Exit value is too large"));
        }
        if RiskAssessor::has_risk_inputs(self.stop_loss, self.account_balance)
            && RiskAssessor::risk_percentage(
                self.price,
                self.quantity,
                self.stop_loss,
                self.account_balance,
            )
            .is_none()
        {
            errors.push(FieldError::new(
                "accountBalance",
                "Risk is too large to size against this account balance",
            ));
        }
    }

    /// Build a trade record under the given id.
    ///
    /// Exit terms are kept only for closed trades, and realized P&L is
    /// derived from them. Risk fields are left for the caller to fill.
    pub fn into_trade(self, id: String) -> Trade {
        let closed = self.status == TradeStatus::Closed;
        let mut trade = Trade {
            id,
            symbol: self.symbol.trim().to_string(),
            date: self.date,
            trade_type: self.trade_type,
            price: self.price,
            quantity: self.quantity,
            status: self.status,
            sentiment: self.sentiment,
            exit_price: self.exit_price.filter(|_| closed),
            exit_date: self.exit_date.filter(|_| closed),
            profit_loss: None,
            profit_loss_percentage: None,
            notes: non_empty(self.notes),
            strategy: non_empty(self.strategy),
            setup: non_empty(self.setup),
            risk: self.risk,
            reward: self.reward,
            tags: self.tags,
            images: self.images,
            account_balance: self.account_balance,
            stop_loss: self.stop_loss,
            risk_percentage: None,
            risk_management_feedback: None,
        };
        trade.refresh_profit_loss();
        trade
    }
}

impl From<&Trade> for TradeDraft {
    fn from(trade: &Trade) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            date: trade.date,
            trade_type: trade.trade_type,
            price: trade.price,
            quantity: trade.quantity,
            status: trade.status,
            sentiment: trade.sentiment,
            exit_price: trade.exit_price,
            exit_date: trade.exit_date,
            notes: trade.notes.clone(),
            strategy: trade.strategy.clone(),
            setup: trade.setup.clone(),
            risk: trade.risk,
            reward: trade.reward,
            tags: trade.tags.clone(),
            images: trade.images.clone(),
            account_balance: trade.account_balance,
            stop_loss: trade.stop_loss,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
