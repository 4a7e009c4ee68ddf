//! SQLite persistence for journal trades.
//!
//! Money values are stored as TEXT to keep exact decimals; tags and image
//! references are stored as JSON arrays.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::debug;

use crate::models::{Trade, TradeSentiment, TradeStatus, TradeType};
use crate::store::{StoreError, StoreResult, TradeStore};

/// Database connection pool holding the trade journal.
pub struct Database {
    pool: SqlitePool,
}

/// Trade row as stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredTrade {
    pub id: String,
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub trade_type: String,
    pub price: String,
    pub quantity: String,
    pub status: String,
    pub sentiment: String,
    pub exit_price: Option<String>,
    pub exit_date: Option<NaiveDate>,
    pub profit_loss: Option<String>,
    pub profit_loss_percentage: Option<f64>,
    pub notes: Option<String>,
    pub strategy: Option<String>,
    pub setup: Option<String>,
    pub risk: Option<String>,
    pub reward: Option<String>,
    pub tags: String,
    pub images: String,
    pub account_balance: Option<String>,
    pub stop_loss: Option<String>,
    pub risk_percentage: Option<f64>,
    pub risk_management_feedback: Option<String>,
}

impl StoredTrade {
    fn from_trade(trade: &Trade) -> Self {
        Self {
            id: trade.id.clone(),
            symbol: trade.symbol.clone(),
            trade_date: trade.date,
            trade_type: trade.trade_type.as_str().to_string(),
            price: trade.price.to_string(),
            quantity: trade.quantity.to_string(),
            status: trade.status.as_str().to_string(),
            sentiment: trade.sentiment.as_str().to_string(),
            exit_price: trade.exit_price.map(|d| d.to_string()),
            exit_date: trade.exit_date,
            profit_loss: trade.profit_loss.map(|d| d.to_string()),
            profit_loss_percentage: trade.profit_loss_percentage,
            notes: trade.notes.clone(),
            strategy: trade.strategy.clone(),
            setup: trade.setup.clone(),
            risk: trade.risk.map(|d| d.to_string()),
            reward: trade.reward.map(|d| d.to_string()),
            tags: encode_list(&trade.tags),
            images: encode_list(&trade.images),
            account_balance: trade.account_balance.map(|d| d.to_string()),
            stop_loss: trade.stop_loss.map(|d| d.to_string()),
            risk_percentage: trade.risk_percentage,
            risk_management_feedback: trade.risk_management_feedback.clone(),
        }
    }

    fn into_trade(self) -> StoreResult<Trade> {
        let id = self.id;
        let corrupt = |reason: String| StoreError::Corrupt {
            id: id.clone(),
            reason,
        };

        let decimal = |field: &str, raw: &str| {
            Decimal::from_str(raw).map_err(|e| corrupt(format!("{}: {}", field, e)))
        };
        let opt_decimal = |field: &str, raw: Option<String>| {
            raw.map(|r| decimal(field, &r)).transpose()
        };
        let list = |field: &str, raw: &str| {
            serde_json::from_str::<Vec<String>>(raw).map_err(|e| corrupt(format!("{}: {}", field, e)))
        };

        Ok(Trade {
            symbol: self.symbol,
            date: self.trade_date,
            trade_type: self.trade_type.parse::<TradeType>().map_err(corrupt)?,
            price: decimal("price", &self.price)?,
            quantity: decimal("quantity", &self.quantity)?,
            status: self.status.parse::<TradeStatus>().map_err(corrupt)?,
            sentiment: self.sentiment.parse::<TradeSentiment>().map_err(corrupt)?,
            exit_price: opt_decimal("exit_price", self.exit_price)?,
            exit_date: self.exit_date,
            profit_loss: opt_decimal("profit_loss", self.profit_loss)?,
            profit_loss_percentage: self.profit_loss_percentage,
            notes: self.notes,
            strategy: self.strategy,
            setup: self.setup,
            risk: opt_decimal("risk", self.risk)?,
            reward: opt_decimal("reward", self.reward)?,
            tags: list("tags", &self.tags)?,
            images: list("images", &self.images)?,
            account_balance: opt_decimal("account_balance", self.account_balance)?,
            stop_loss: opt_decimal("stop_loss", self.stop_loss)?,
            risk_percentage: self.risk_percentage,
            risk_management_feedback: self.risk_management_feedback,
            id: id.clone(),
        })
    }
}

fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

impl Database {
    /// Create a new database connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        // Each connection to an in-memory database is a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run all database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                trade_date TEXT NOT NULL,
                trade_type TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity TEXT NOT NULL,
                status TEXT NOT NULL,
                sentiment TEXT NOT NULL,
                exit_price TEXT,
                exit_date TEXT,
                profit_loss TEXT,
                profit_loss_percentage REAL,
                notes TEXT,
                strategy TEXT,
                setup TEXT,
                risk TEXT,
                reward TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                images TEXT NOT NULL DEFAULT '[]',
                account_balance TEXT,
                stop_loss TEXT,
                risk_percentage REAL,
                risk_management_feedback TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create trades table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_date ON trades(trade_date)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_status ON trades(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

const SELECT_TRADE: &str = r#"
    SELECT id, symbol, trade_date, trade_type, price, quantity, status, sentiment,
           exit_price, exit_date, profit_loss, profit_loss_percentage,
           notes, strategy, setup, risk, reward, tags, images,
           account_balance, stop_loss, risk_percentage, risk_management_feedback
    FROM trades
"#;

#[async_trait]
impl TradeStore for Database {
    async fn get_all(&self) -> StoreResult<Vec<Trade>> {
        let rows = sqlx::query_as::<_, StoredTrade>(&format!(
            "{} ORDER BY trade_date DESC, created_at DESC",
            SELECT_TRADE
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded trades");
        rows.into_iter().map(StoredTrade::into_trade).collect()
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Trade>> {
        let row = sqlx::query_as::<_, StoredTrade>(&format!("{} WHERE id = ?", SELECT_TRADE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(StoredTrade::into_trade).transpose()
    }

    async fn insert(&self, trade: &Trade) -> StoreResult<()> {
        let row = StoredTrade::from_trade(trade);

        let result = sqlx::query(
            r#"
            INSERT INTO trades (
                id, symbol, trade_date, trade_type, price, quantity, status, sentiment,
                exit_price, exit_date, profit_loss, profit_loss_percentage,
                notes, strategy, setup, risk, reward, tags, images,
                account_balance, stop_loss, risk_percentage, risk_management_feedback
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&row.id)
        .bind(&row.symbol)
        .bind(row.trade_date)
        .bind(&row.trade_type)
        .bind(&row.price)
        .bind(&row.quantity)
        .bind(&row.status)
        .bind(&row.sentiment)
        .bind(&row.exit_price)
        .bind(row.exit_date)
        .bind(&row.profit_loss)
        .bind(row.profit_loss_percentage)
        .bind(&row.notes)
        .bind(&row.strategy)
        .bind(&row.setup)
        .bind(&row.risk)
        .bind(&row.reward)
        .bind(&row.tags)
        .bind(&row.images)
        .bind(&row.account_balance)
        .bind(&row.stop_loss)
        .bind(row.risk_percentage)
        .bind(&row.risk_management_feedback)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(trade.id.clone()));
        }

        Ok(())
    }

    async fn update(&self, trade: &Trade) -> StoreResult<()> {
        let row = StoredTrade::from_trade(trade);

        let result = sqlx::query(
            r#"
            UPDATE trades SET
                symbol = ?,
                trade_date = ?,
                trade_type = ?,
                price = ?,
                quantity = ?,
                status = ?,
                sentiment = ?,
                exit_price = ?,
                exit_date = ?,
                profit_loss = ?,
                profit_loss_percentage = ?,
                notes = ?,
                strategy = ?,
                setup = ?,
                risk = ?,
                reward = ?,
                tags = ?,
                images = ?,
                account_balance = ?,
                stop_loss = ?,
                risk_percentage = ?,
                risk_management_feedback = ?,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(&row.symbol)
        .bind(row.trade_date)
        .bind(&row.trade_type)
        .bind(&row.price)
        .bind(&row.quantity)
        .bind(&row.status)
        .bind(&row.sentiment)
        .bind(&row.exit_price)
        .bind(row.exit_date)
        .bind(&row.profit_loss)
        .bind(row.profit_loss_percentage)
        .bind(&row.notes)
        .bind(&row.strategy)
        .bind(&row.setup)
        .bind(&row.risk)
        .bind(&row.reward)
        .bind(&row.tags)
        .bind(&row.images)
        .bind(&row.account_balance)
        .bind(&row.stop_loss)
        .bind(row.risk_percentage)
        .bind(&row.risk_management_feedback)
        .bind(&row.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(trade.id.clone()));
        }

        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM trades WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
