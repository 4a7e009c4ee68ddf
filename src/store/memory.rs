//! Process-local trade store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::Trade;

use super::{StoreError, StoreResult, TradeStore};

/// Trade store held in memory; contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    trades: RwLock<HashMap<String, Trade>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn get_all(&self) -> StoreResult<Vec<Trade>> {
        let mut trades: Vec<Trade> = self.trades.read().await.values().cloned().collect();
        trades.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(trades)
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Trade>> {
        Ok(self.trades.read().await.get(id).cloned())
    }

    async fn insert(&self, trade: &Trade) -> StoreResult<()> {
        let mut trades = self.trades.write().await;
        if trades.contains_key(&trade.id) {
            return Err(StoreError::Duplicate(trade.id.clone()));
        }
        trades.insert(trade.id.clone(), trade.clone());
        Ok(())
    }

    async fn update(&self, trade: &Trade) -> StoreResult<()> {
        let mut trades = self.trades.write().await;
        match trades.get_mut(&trade.id) {
            Some(existing) => {
                *existing = trade.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(trade.id.clone())),
        }
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<()> {
        self.trades
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
