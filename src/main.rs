//! Trade Journal
//!
//! Records trades with their entry, exit and risk terms, and reports
//! win/loss statistics and per-trade risk feedback.

mod api;
mod config;
mod db;
mod journal;
mod metrics;
mod models;
mod risk;
mod store;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{AdvisorConfig, CredentialStore};
use crate::db::Database;
use crate::journal::{JournalError, JournalResult, SortOrder, TradeJournal, TradeQuery};
use crate::models::{Trade, TradeDraft, TradeSentiment, TradeStatus, TradeType};
use crate::risk::RiskAssessor;
use crate::store::{MemoryStore, StoreError, TradeStore};

/// Personal trading journal CLI.
#[derive(Parser)]
#[command(name = "tradejournal")]
#[command(about = "Record trades and review your performance", long_about = None)]
struct Cli {
    /// Trade database URL (defaults to the stored credential, then ./tradejournal.db)
    #[arg(short, long, env = "TRADEJOURNAL_DATABASE")]
    database: Option<String>,

    /// Credentials file holding API keys
    #[arg(long, env = "TRADEJOURNAL_CREDENTIALS", default_value = config::DEFAULT_CREDENTIALS_PATH)]
    credentials: PathBuf,

    /// Never call the text-generation service; use built-in risk feedback
    #[arg(long, env = "TRADEJOURNAL_OFFLINE")]
    offline: bool,

    /// Keep trades in memory only (nothing is saved)
    #[arg(long)]
    ephemeral: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new trade
    Add(TradeArgs),

    /// List trades with optional search, filters and sorting
    List {
        /// Search symbol, notes, strategy and tags
        #[arg(short, long)]
        search: Option<String>,

        /// Only trades with this status (open, closed)
        #[arg(long)]
        status: Option<TradeStatus>,

        /// Only trades of this type (buy, sell, buy_to_cover, sell_short)
        #[arg(long = "type")]
        trade_type: Option<TradeType>,

        /// Sort order (date-desc, date-asc, symbol-asc, symbol-desc, profit-desc, profit-asc)
        #[arg(long, default_value = "date-desc")]
        sort: SortOrder,
    },

    /// Show all details of a trade
    Show {
        id: String,
    },

    /// Replace fields of an existing trade
    Edit(EditArgs),

    /// Close an open trade
    Close {
        id: String,

        /// Exit price per unit
        #[arg(long)]
        exit_price: Decimal,

        /// Exit date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        exit_date: Option<NaiveDate>,
    },

    /// Delete a trade
    Delete {
        id: String,
    },

    /// Show performance statistics
    Stats,

    /// Assess the risk of a planned trade without recording it
    Risk {
        #[arg(long, default_value = "-")]
        symbol: String,

        #[arg(long = "type", default_value = "buy")]
        trade_type: TradeType,

        #[arg(long)]
        price: Decimal,

        #[arg(long)]
        quantity: Decimal,

        #[arg(long)]
        stop_loss: Option<Decimal>,

        #[arg(long)]
        account_balance: Option<Decimal>,

        #[arg(long)]
        strategy: Option<String>,
    },

    /// Export all trades as JSON
    Export {
        /// Output file (stdout if omitted)
        path: Option<PathBuf>,
    },

    /// Import trades from a JSON export
    Import {
        path: PathBuf,
    },

    /// Manage stored credentials
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store a credential (e.g. openai_api_key, database_url)
    Set { name: String, value: String },

    /// Remove a credential
    Remove { name: String },

    /// List stored credentials (values masked)
    List,
}

/// Fields for a new trade.
#[derive(Args)]
struct TradeArgs {
    /// Ticker symbol
    symbol: String,

    /// Entry price per unit
    #[arg(short, long)]
    price: Decimal,

    /// Number of units
    #[arg(short, long)]
    quantity: Decimal,

    /// Trade type (buy, sell, buy_to_cover, sell_short)
    #[arg(long = "type", default_value = "buy")]
    trade_type: TradeType,

    /// Entry date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Status (open, closed)
    #[arg(long, default_value = "open")]
    status: TradeStatus,

    /// Sentiment (bullish, bearish, neutral)
    #[arg(long, default_value = "neutral")]
    sentiment: TradeSentiment,

    #[command(flatten)]
    details: TradeDetails,
}

/// Optional trade fields shared by add and edit.
#[derive(Args)]
struct TradeDetails {
    #[arg(long)]
    exit_price: Option<Decimal>,

    /// Exit date (YYYY-MM-DD, defaults to today for closed trades)
    #[arg(long)]
    exit_date: Option<NaiveDate>,

    #[arg(long)]
    strategy: Option<String>,

    #[arg(long)]
    setup: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    /// Planned risk amount
    #[arg(long)]
    risk: Option<Decimal>,

    /// Planned reward amount
    #[arg(long)]
    reward: Option<Decimal>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Image URL or path (repeatable)
    #[arg(long = "image")]
    images: Vec<String>,

    /// Account balance, for risk sizing
    #[arg(long)]
    account_balance: Option<Decimal>,

    /// Stop-loss price, for risk sizing
    #[arg(long)]
    stop_loss: Option<Decimal>,
}

/// Fields to change on an existing trade; anything omitted is kept.
#[derive(Args)]
struct EditArgs {
    id: String,

    #[arg(long)]
    symbol: Option<String>,

    #[arg(short, long)]
    price: Option<Decimal>,

    #[arg(short, long)]
    quantity: Option<Decimal>,

    #[arg(long = "type")]
    trade_type: Option<TradeType>,

    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long)]
    status: Option<TradeStatus>,

    #[arg(long)]
    sentiment: Option<TradeSentiment>,

    #[command(flatten)]
    details: TradeDetails,
}

impl TradeDetails {
    /// Overlay the given fields onto a draft.
    fn apply(self, draft: &mut TradeDraft) {
        if self.exit_price.is_some() {
            draft.exit_price = self.exit_price;
        }
        if self.exit_date.is_some() {
            draft.exit_date = self.exit_date;
        }
        if self.strategy.is_some() {
            draft.strategy = self.strategy;
        }
        if self.setup.is_some() {
            draft.setup = self.setup;
        }
        if self.notes.is_some() {
            draft.notes = self.notes;
        }
        if self.risk.is_some() {
            draft.risk = self.risk;
        }
        if self.reward.is_some() {
            draft.reward = self.reward;
        }
        if !self.tags.is_empty() {
            draft.tags = self.tags;
        }
        if !self.images.is_empty() {
            draft.images = self.images;
        }
        if self.account_balance.is_some() {
            draft.account_balance = self.account_balance;
        }
        if self.stop_loss.is_some() {
            draft.stop_loss = self.stop_loss;
        }
    }
}

impl TradeArgs {
    fn into_draft(self) -> TradeDraft {
        let today = Local::now().date_naive();
        let mut draft = TradeDraft::new(
            self.symbol,
            self.date.unwrap_or(today),
            self.trade_type,
            self.price,
            self.quantity,
        );
        draft.status = self.status;
        draft.sentiment = self.sentiment;
        self.details.apply(&mut draft);

        if draft.status == TradeStatus::Closed && draft.exit_date.is_none() {
            draft.exit_date = Some(today.max(draft.date));
        }
        draft
    }
}

impl EditArgs {
    fn apply(self, draft: &mut TradeDraft) {
        if let Some(symbol) = self.symbol {
            draft.symbol = symbol;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(quantity) = self.quantity {
            draft.quantity = quantity;
        }
        if let Some(trade_type) = self.trade_type {
            draft.trade_type = trade_type;
        }
        if let Some(date) = self.date {
            draft.date = date;
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(sentiment) = self.sentiment {
            draft.sentiment = sentiment;
        }
        self.details.apply(draft);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut credentials = CredentialStore::open(&cli.credentials)?;

    // Credential commands must not require a working trade store
    let command = match cli.command {
        Commands::Key { action } => {
            run_key_command(&mut credentials, action)?;
            return Ok(ExitCode::SUCCESS);
        }
        command => command,
    };

    let database_url = cli
        .database
        .clone()
        .or_else(|| credentials.get(config::DATABASE_URL).map(str::to_string))
        .unwrap_or_else(|| config::DEFAULT_DATABASE_URL.to_string());

    let store: Arc<dyn TradeStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(Database::new(&database_url).await?)
    };

    let advisor_config = AdvisorConfig::from_env();
    let advisor = config::select_advisor(
        advisor_config.clone(),
        config::resolve_api_key(&credentials),
        cli.offline,
    );
    let journal = TradeJournal::new(store, RiskAssessor::new(advisor));

    let outcome = match command {
        Commands::Add(args) => {
            let draft = args.into_draft();
            info!(symbol = %draft.symbol, "Recording trade");

            journal.record(draft).await.map(|trade| {
                println!("Added {} trade {}", trade.symbol, trade.id);
                print_trade(&trade);
            })
        }

        Commands::List {
            search,
            status,
            trade_type,
            sort,
        } => {
            let query = TradeQuery {
                search,
                status,
                trade_type,
                sort,
            };
            match journal.list(&query).await {
                Ok(trades) => {
                    let total = journal.all().await.map(|t| t.len()).unwrap_or(trades.len());
                    print_trade_table(&trades);
                    println!("\nShowing {} of {} trades", trades.len(), total);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }

        Commands::Show { id } => match journal.get(&id).await {
            Ok(Some(trade)) => {
                print_trade(&trade);
                Ok(())
            }
            Ok(None) => Err(StoreError::NotFound(id).into()),
            Err(e) => Err(e),
        },

        Commands::Edit(args) => {
            let id = args.id.clone();
            match journal.get(&id).await {
                Ok(Some(existing)) => {
                    let mut draft = TradeDraft::from(&existing);
                    args.apply(&mut draft);
                    journal.replace(&id, draft).await.map(|trade| {
                        println!("Updated {} trade {}", trade.symbol, trade.id);
                        print_trade(&trade);
                    })
                }
                Ok(None) => Err(StoreError::NotFound(id).into()),
                Err(e) => Err(e),
            }
        }

        Commands::Close {
            id,
            exit_price,
            exit_date,
        } => journal.close(&id, exit_price, exit_date).await.map(|trade| {
            println!("Closed {} trade {}", trade.symbol, trade.id);
            print_trade(&trade);
        }),

        Commands::Delete { id } => journal.remove(&id).await.map(|()| {
            println!("Deleted trade {}", id);
        }),

        Commands::Stats => journal.statistics().await.map(|stats| {
            println!("\n=== Performance ===");
            println!("Total P&L:        {}", money(stats.total_profit_loss));
            println!("Average P&L:      {}", money(stats.average_profit_loss));
            println!(
                "Win Rate:         {:.1}% ({} winning / {} total)",
                stats.win_rate, stats.winning_trades, stats.total_trades
            );
            println!("Losing Trades:    {}", stats.losing_trades);
            println!("Break-even:       {}", stats.breakeven_trades());
            println!("Open Trades:      {}", stats.open_trades);

            println!("\n--- Extremes ---");
            println!("Largest Win:      {}", money(stats.largest_win));
            println!("Largest Loss:     {}", money(stats.largest_loss.abs()));

            println!("\n--- Risk ---");
            println!("Avg Risk/Trade:   {:.2}%", stats.average_risk_percentage);
        }),

        Commands::Risk {
            symbol,
            trade_type,
            price,
            quantity,
            stop_loss,
            account_balance,
            strategy,
        } => {
            let risk = RiskAssessor::risk_percentage(price, quantity, stop_loss, account_balance);
            let feedback = journal
                .assessor()
                .generate_feedback(&symbol, risk, trade_type, strategy.as_deref())
                .await;

            match risk {
                Some(pct) => println!("Risk:     {:.2}% of account balance", pct),
                None => println!("Risk:     n/a"),
            }
            println!("Feedback: {}", feedback);
            Ok(())
        }

        Commands::Export { path } => match journal.all().await {
            Ok(trades) => {
                let json = serde_json::to_string_pretty(&trades)?;
                match path {
                    Some(path) => {
                        std::fs::write(&path, json)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Exported {} trades to {}", trades.len(), path.display());
                    }
                    None => println!("{}", json),
                }
                Ok(())
            }
            Err(e) => Err(e),
        },

        Commands::Import { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let trades: Vec<Trade> =
                serde_json::from_str(&raw).context("File is not a trade export")?;

            journal.import(trades).await.map(|summary| {
                println!(
                    "Imported {} trades ({} already present)",
                    summary.imported, summary.skipped
                );
            })
        }

        Commands::Config => {
            println!("\n=== Storage ===");
            if cli.ephemeral {
                println!("Trade Store:      in-memory");
            } else {
                println!("Trade Store:      {}", database_url);
            }
            println!("Credentials:      {}", credentials.path().display());

            println!("\n=== Risk Feedback ===");
            println!("Advisor:          {}", journal.assessor().advisor_name());
            println!("Model:            {}", advisor_config.model);
            println!("Endpoint:         {}", advisor_config.base_url);
            println!("Max Tokens:       {}", advisor_config.max_tokens);
            println!("Temperature:      {}", advisor_config.temperature);
            println!("Timeout:          {}s", advisor_config.timeout_secs);
            Ok(())
        }

        Commands::Key { .. } => Ok(()),
    };

    if report(outcome) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Print recoverable journal failures for the user instead of aborting.
/// Returns whether the command succeeded.
fn report(outcome: JournalResult<()>) -> bool {
    match outcome {
        Ok(()) => return true,
        Err(JournalError::Validation(fields)) => {
            eprintln!("Trade not saved:");
            for field in fields {
                eprintln!("  {}", field);
            }
        }
        Err(JournalError::InvalidImport { id, errors }) => {
            eprintln!("Nothing imported; trade {} is invalid:", id);
            for field in errors {
                eprintln!("  {}", field);
            }
        }
        Err(JournalError::Store(StoreError::NotFound(id))) => {
            eprintln!("No trade with id {}", id);
        }
        Err(e) => {
            tracing::error!(error = %e, "Journal operation failed");
            eprintln!("Error: {}. Please try again.", e);
        }
    }
    false
}

fn run_key_command(credentials: &mut CredentialStore, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { name, value } => {
            credentials.set(&name, &value)?;
            println!("Saved {}", name);
        }
        KeyAction::Remove { name } => {
            if credentials.remove(&name)? {
                println!("Removed {}", name);
            } else {
                println!("No credential named {}", name);
            }
        }
        KeyAction::List => {
            let keys: Vec<&str> = credentials.keys().collect();
            if keys.is_empty() {
                println!("No credentials stored in {}", credentials.path().display());
                return Ok(());
            }
            for key in keys {
                let value = credentials.get(key).unwrap_or_default();
                println!("{:<20} {}", key, config::mask(value));
            }
        }
    }
    Ok(())
}

fn print_trade_table(trades: &[Trade]) {
    if trades.is_empty() {
        println!("No trades match. Use 'tradejournal add' to record one.");
        return;
    }

    println!(
        "\n{:<36} {:<10} {:<8} {:<12} {:<6} {:>10} {:>10} {:>12}",
        "ID", "DATE", "SYMBOL", "TYPE", "STATUS", "PRICE", "QTY", "P&L"
    );
    println!("{}", "-".repeat(110));

    for trade in trades {
        let pnl = trade.profit_loss.map(money).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36} {:<10} {:<8} {:<12} {:<6} {:>10.2} {:>10} {:>12}",
            trade.id,
            trade.date,
            truncate(&trade.symbol, 8),
            trade.trade_type,
            trade.status,
            trade.price,
            trade.quantity,
            pnl
        );
    }
}

fn print_trade(trade: &Trade) {
    println!("\n=== {} ({}) ===", trade.symbol, trade.id);
    println!("Date:       {}", trade.date);
    println!("Type:       {}", trade.trade_type);
    println!("Status:     {}", trade.status);
    println!("Sentiment:  {}", trade.sentiment);
    println!("Price:      {}", money(trade.price));
    println!("Quantity:   {}", trade.quantity);

    if let Some(exit) = trade.exit_price {
        println!("Exit Price: {}", money(exit));
    }
    if let Some(date) = trade.exit_date {
        println!("Exit Date:  {}", date);
    }
    if let Some(pnl) = trade.profit_loss {
        println!(
            "P&L:        {} ({:.2}%)",
            money(pnl),
            trade.profit_loss_percentage.unwrap_or(0.0)
        );
    }

    if trade.account_balance.is_some() || trade.stop_loss.is_some() {
        println!("\n--- Risk ---");
        if let Some(balance) = trade.account_balance {
            println!("Balance:    {}", money(balance));
        }
        if let Some(stop) = trade.stop_loss {
            println!("Stop Loss:  {}", money(stop));
        }
        if let Some(pct) = trade.risk_percentage {
            println!("At Risk:    {:.2}%", pct);
        }
    }
    if let Some(feedback) = &trade.risk_management_feedback {
        println!("Feedback:   {}", feedback);
    }

    if let Some(strategy) = &trade.strategy {
        println!("\nStrategy:   {}", strategy);
    }
    if let Some(setup) = &trade.setup {
        println!("Setup:      {}", setup);
    }
    if let (Some(risk), Some(reward)) = (trade.risk, trade.reward) {
        println!("Risk/Reward: {} / {}", risk, reward);
    }
    if !trade.tags.is_empty() {
        println!("Tags:       {}", trade.tags.join(", "));
    }
    if !trade.images.is_empty() {
        println!("Images:     {}", trade.images.len());
    }
    if let Some(notes) = &trade.notes {
        println!("Notes:      {}", notes);
    }
}

/// Format an amount as dollars with the sign in front.
fn money(value: Decimal) -> String {
    if value < Decimal::ZERO {
        format!("-${:.2}", value.abs())
    } else {
        format!("${:.2}", value)
    }
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
