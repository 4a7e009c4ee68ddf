//! Trade journal: the entry pipeline and queries over the trade store.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::metrics::StatisticsAggregator;
use crate::models::{FieldError, Trade, TradeDraft, TradeStatistics, TradeStatus};
use crate::risk::RiskAssessor;
use crate::store::{StoreError, TradeStore};

use super::TradeQuery;

/// Journal operation failures.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("invalid trade: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("trade {id} cannot be imported: {}", format_fields(.errors))]
    InvalidImport { id: String, errors: Vec<FieldError> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type JournalResult<T> = Result<T, JournalError>;

/// Outcome of importing a batch of trades.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Journal service over an injected trade store and risk assessor.
pub struct TradeJournal {
    store: Arc<dyn TradeStore>,
    assessor: RiskAssessor,
}

impl TradeJournal {
    pub fn new(store: Arc<dyn TradeStore>, assessor: RiskAssessor) -> Self {
        Self { store, assessor }
    }

    pub fn assessor(&self) -> &RiskAssessor {
        &self.assessor
    }

    /// Record a new trade.
    ///
    /// Derived P&L, risk percentage and feedback are computed here, once.
    pub async fn record(&self, draft: TradeDraft) -> JournalResult<Trade> {
        draft.validate().map_err(JournalError::Validation)?;

        let mut trade = draft.into_trade(Uuid::new_v4().to_string());
        self.assess(&mut trade).await;

        self.store.insert(&trade).await?;
        info!(id = %trade.id, symbol = %trade.symbol, status = %trade.status, "Trade recorded");

        Ok(trade)
    }

    /// Replace a trade wholesale, keeping its id.
    ///
    /// P&L follows the new terms. The risk percentage and feedback recorded
    /// at entry are kept while price, quantity, stop loss and balance are
    /// unchanged; otherwise they are assessed again.
    pub async fn replace(&self, id: &str, draft: TradeDraft) -> JournalResult<Trade> {
        draft.validate().map_err(JournalError::Validation)?;

        let existing = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut trade = draft.into_trade(existing.id.clone());
        if !keep_risk_snapshot(&existing, &mut trade) {
            debug!(id = %trade.id, "Risk inputs changed, reassessing");
            self.assess(&mut trade).await;
        }

        self.store.update(&trade).await?;
        info!(id = %trade.id, symbol = %trade.symbol, "Trade updated");

        Ok(trade)
    }

    /// Close an open trade at the given exit price.
    pub async fn close(
        &self,
        id: &str,
        exit_price: Decimal,
        exit_date: Option<NaiveDate>,
    ) -> JournalResult<Trade> {
        let existing = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut draft = TradeDraft::from(&existing);
        draft.status = TradeStatus::Closed;
        draft.exit_price = Some(exit_price);
        draft.exit_date = Some(exit_date.unwrap_or_else(|| Local::now().date_naive()));

        self.replace(id, draft).await
    }

    pub async fn remove(&self, id: &str) -> JournalResult<()> {
        self.store.delete_by_id(id).await?;
        info!(id = %id, "Trade deleted");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> JournalResult<Option<Trade>> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// All trades, newest first.
    pub async fn all(&self) -> JournalResult<Vec<Trade>> {
        Ok(self.store.get_all().await?)
    }

    pub async fn list(&self, query: &TradeQuery) -> JournalResult<Vec<Trade>> {
        let trades = self.store.get_all().await?;
        let total = trades.len();
        let result = query.apply(trades);
        debug!(total = total, shown = result.len(), "Listed trades");
        Ok(result)
    }

    /// Summary statistics over the full history.
    pub async fn statistics(&self) -> JournalResult<TradeStatistics> {
        let trades = self.store.get_all().await?;
        Ok(StatisticsAggregator::compute(&trades))
    }

    /// Import previously exported trades, keeping their ids.
    ///
    /// The whole batch is validated before anything is written. Trades are
    /// normalized like fresh entries: exit terms only on closed trades and
    /// P&L re-derived. Recorded risk fields are kept when they match the
    /// trade's risk inputs and assessed again otherwise. Trades whose id
    /// already exists are skipped.
    pub async fn import(&self, trades: Vec<Trade>) -> JournalResult<ImportSummary> {
        for trade in &trades {
            TradeDraft::from(trade)
                .validate()
                .map_err(|errors| JournalError::InvalidImport {
                    id: trade.id.clone(),
                    errors,
                })?;
        }

        let mut summary = ImportSummary::default();

        for recorded in trades {
            let mut trade = TradeDraft::from(&recorded).into_trade(recorded.id.clone());
            if !keep_risk_snapshot(&recorded, &mut trade) {
                self.assess(&mut trade).await;
            }

            match self.store.insert(&trade).await {
                Ok(()) => summary.imported += 1,
                Err(StoreError::Duplicate(id)) => {
                    debug!(id = %id, "Skipping existing trade");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(imported = summary.imported, skipped = summary.skipped, "Import finished");
        Ok(summary)
    }

    /// Fill risk percentage and feedback from the trade's own inputs.
    async fn assess(&self, trade: &mut Trade) {
        trade.risk_percentage = RiskAssessor::risk_percentage(
            trade.price,
            trade.quantity,
            trade.stop_loss,
            trade.account_balance,
        );

        let feedback = self
            .assessor
            .generate_feedback(
                &trade.symbol,
                trade.risk_percentage,
                trade.trade_type,
                trade.strategy.as_deref(),
            )
            .await;
        trade.risk_management_feedback = Some(feedback);
    }
}

/// Carry the recorded risk fields of `source` onto `target` when they still
/// describe `target`'s sizing inputs. Returns false when they must be
/// assessed again.
fn keep_risk_snapshot(source: &Trade, target: &mut Trade) -> bool {
    let same_inputs = source.price == target.price
        && source.quantity == target.quantity
        && source.stop_loss == target.stop_loss
        && source.account_balance == target.account_balance;
    let consistent = source.risk_percentage.is_some()
        == RiskAssessor::has_risk_inputs(target.stop_loss, target.account_balance);

    if !(same_inputs && consistent) {
        return false;
    }

    target.risk_percentage = source.risk_percentage;
    target.risk_management_feedback = source.risk_management_feedback.clone();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeType;
    use crate::risk::MISSING_INPUTS_FEEDBACK;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn journal() -> TradeJournal {
        TradeJournal::new(Arc::new(MemoryStore::new()), RiskAssessor::offline())
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn draft(price: Decimal, quantity: Decimal) -> TradeDraft {
        TradeDraft::new("AAPL", date(1), TradeType::Buy, price, quantity)
    }

    #[tokio::test]
    async fn test_record_computes_risk_and_feedback() {
        let journal = journal();
        let mut d = draft(dec!(100), dec!(10));
        d.stop_loss = Some(dec!(95));
        d.account_balance = Some(dec!(10000));

        let trade = journal.record(d).await.unwrap();

        assert!((trade.risk_percentage.unwrap() - 0.5).abs() < 1e-9);
        assert!(trade
            .risk_management_feedback
            .as_deref()
            .unwrap()
            .contains("conservative"));
        assert!(journal.get(&trade.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_without_risk_inputs() {
        let journal = journal();
        let trade = journal.record(draft(dec!(100), dec!(10))).await.unwrap();

        assert_eq!(trade.risk_percentage, None);
        assert_eq!(trade.risk_management_feedback.as_deref(), Some(MISSING_INPUTS_FEEDBACK));
    }

    #[tokio::test]
    async fn test_record_rejects_invalid_draft() {
        let journal = journal();
        let mut d = draft(dec!(0), dec!(10));
        d.symbol = String::new();

        let err = journal.record(d).await.unwrap_err();
        match err {
            JournalError::Validation(fields) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(journal.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let journal = journal();
        let a = journal.record(draft(dec!(1), dec!(1))).await.unwrap();
        let b = journal.record(draft(dec!(1), dec!(1))).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_replace_keeps_risk_snapshot() {
        let journal = journal();
        let mut d = draft(dec!(50), dec!(20));
        d.stop_loss = Some(dec!(40));
        d.account_balance = Some(dec!(2000));
        let original = journal.record(d.clone()).await.unwrap();

        d.notes = Some("moved entry note".to_string());
        d.strategy = Some("Pullback".to_string());
        let updated = journal.replace(&original.id, d.clone()).await.unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.notes.as_deref(), Some("moved entry note"));
        assert_eq!(updated.risk_percentage, original.risk_percentage);
        assert_eq!(updated.risk_management_feedback, original.risk_management_feedback);

        d.stop_loss = Some(dec!(49));
        d.quantity = dec!(1);
        let resized = journal.replace(&original.id, d).await.unwrap();
        assert!((resized.risk_percentage.unwrap() - 0.05).abs() < 1e-9);
        assert!(resized
            .risk_management_feedback
            .as_deref()
            .unwrap()
            .contains("conservative"));
    }

    #[tokio::test]
    async fn test_replace_adding_risk_inputs_assesses() {
        let journal = journal();
        let original = journal.record(draft(dec!(50), dec!(20))).await.unwrap();
        assert_eq!(original.risk_percentage, None);

        let mut d = draft(dec!(50), dec!(20));
        d.stop_loss = Some(dec!(40));
        d.account_balance = Some(dec!(2000));
        let updated = journal.replace(&original.id, d).await.unwrap();

        assert!((updated.risk_percentage.unwrap() - 10.0).abs() < 1e-9);
        assert!(updated
            .risk_management_feedback
            .as_deref()
            .unwrap()
            .contains("relatively high"));
    }

    #[tokio::test]
    async fn test_replace_removing_risk_inputs_clears_risk() {
        let journal = journal();
        let mut d = draft(dec!(50), dec!(20));
        d.stop_loss = Some(dec!(40));
        d.account_balance = Some(dec!(2000));
        let original = journal.record(d).await.unwrap();
        assert!(original.risk_percentage.is_some());

        let updated = journal
            .replace(&original.id, draft(dec!(50), dec!(20)))
            .await
            .unwrap();

        assert_eq!(updated.stop_loss, None);
        assert_eq!(updated.risk_percentage, None);
        assert_eq!(updated.risk_management_feedback.as_deref(), Some(MISSING_INPUTS_FEEDBACK));
    }

    #[tokio::test]
    async fn test_close_keeps_risk_snapshot() {
        let journal = journal();
        let mut d = draft(dec!(100), dec!(10));
        d.stop_loss = Some(dec!(95));
        d.account_balance = Some(dec!(10000));
        let open = journal.record(d).await.unwrap();

        let closed = journal.close(&open.id, dec!(110), Some(date(2))).await.unwrap();
        assert_eq!(closed.risk_percentage, open.risk_percentage);
        assert_eq!(closed.risk_management_feedback, open.risk_management_feedback);
    }

    #[tokio::test]
    async fn test_replace_missing_is_not_found() {
        let journal = journal();
        let err = journal.replace("nope", draft(dec!(1), dec!(1))).await.unwrap_err();
        assert!(matches!(err, JournalError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_close_derives_pnl() {
        let journal = journal();
        let mut d = draft(dec!(50), dec!(20));
        d.trade_type = TradeType::SellShort;
        let open = journal.record(d).await.unwrap();
        assert_eq!(open.profit_loss, None);

        let closed = journal.close(&open.id, dec!(40), Some(date(9))).await.unwrap();

        assert_eq!(closed.status, TradeStatus::Closed);
        assert_eq!(closed.exit_date, Some(date(9)));
        assert_eq!(closed.profit_loss, Some(dec!(200)));
        assert!((closed.profit_loss_percentage.unwrap() - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_statistics_over_store() {
        let journal = journal();

        let mut win = draft(dec!(10), dec!(10));
        win.status = TradeStatus::Closed;
        win.exit_price = Some(dec!(20));
        let mut loss = draft(dec!(10), dec!(10));
        loss.status = TradeStatus::Closed;
        loss.exit_price = Some(dec!(5));

        journal.record(win).await.unwrap();
        journal.record(loss).await.unwrap();
        journal.record(draft(dec!(10), dec!(1))).await.unwrap();

        let stats = journal.statistics().await.unwrap();
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.open_trades, 1);
        assert_eq!(stats.total_profit_loss, dec!(50));
        assert_eq!(stats.largest_win, dec!(100));
        assert_eq!(stats.largest_loss, dec!(-50));
    }

    #[tokio::test]
    async fn test_remove() {
        let journal = journal();
        let trade = journal.record(draft(dec!(1), dec!(1))).await.unwrap();

        journal.remove(&trade.id).await.unwrap();
        assert!(matches!(
            journal.remove(&trade.id).await,
            Err(JournalError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_import_skips_existing() {
        let journal = journal();
        let existing = journal.record(draft(dec!(1), dec!(1))).await.unwrap();

        let mut fresh = existing.clone();
        fresh.id = "imported-1".to_string();

        let summary = journal.import(vec![existing, fresh]).await.unwrap();
        assert_eq!(summary, ImportSummary { imported: 1, skipped: 1 });
        assert_eq!(journal.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_invalid_batch_writes_nothing() {
        let journal = journal();
        let good = TradeDraft::new("AAPL", date(1), TradeType::Buy, dec!(10), dec!(1))
            .into_trade("good".to_string());
        let mut bad = good.clone();
        bad.id = "bad".to_string();
        bad.quantity = dec!(0);

        let err = journal.import(vec![good, bad]).await.unwrap_err();
        match err {
            JournalError::InvalidImport { id, errors } => {
                assert_eq!(id, "bad");
                assert_eq!(errors[0].field, "quantity");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(journal.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_normalizes_derived_fields() {
        let journal = journal();

        let mut open = TradeDraft::new("AAPL", date(1), TradeType::Buy, dec!(10), dec!(1))
            .into_trade("open".to_string());
        open.exit_price = Some(dec!(12));
        open.exit_date = Some(date(3));
        open.profit_loss = Some(dec!(2));
        open.risk_percentage = Some(4.0);
        open.risk_management_feedback = Some("stale".to_string());

        let mut sized = TradeDraft::new("MSFT", date(2), TradeType::Buy, dec!(100), dec!(10))
            .into_trade("sized".to_string());
        sized.stop_loss = Some(dec!(95));
        sized.account_balance = Some(dec!(10000));
        sized.risk_percentage = Some(0.5);
        sized.risk_management_feedback = Some("Recorded advice.".to_string());

        let summary = journal.import(vec![open, sized]).await.unwrap();
        assert_eq!(summary.imported, 2);

        let open = journal.get("open").await.unwrap().unwrap();
        assert_eq!(open.exit_price, None);
        assert_eq!(open.exit_date, None);
        assert_eq!(open.profit_loss, None);
        assert_eq!(open.risk_percentage, None);
        assert_eq!(open.risk_management_feedback.as_deref(), Some(MISSING_INPUTS_FEEDBACK));

        let sized = journal.get("sized").await.unwrap().unwrap();
        assert_eq!(sized.risk_percentage, Some(0.5));
        assert_eq!(sized.risk_management_feedback.as_deref(), Some("Recorded advice."));
    }
}
