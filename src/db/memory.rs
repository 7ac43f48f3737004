//! In-process store used when no database is configured, and by tests

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{CandleStore, CursorStore, ScreenStore, SignalStore, TrackingStore};
use crate::error::PersistenceError;
use crate::models::candle::Candle;
use crate::models::indicators::IndicatorSnapshot;
use crate::models::screen::{ScreenEntry, Tracking};

#[derive(Default)]
pub struct MemoryStore {
    candles: RwLock<BTreeMap<String, Vec<Candle>>>,
    signals: RwLock<HashMap<String, Vec<IndicatorSnapshot>>>,
    screens: RwLock<Vec<ScreenEntry>>,
    trackings: RwLock<BTreeMap<String, Tracking>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register securities with no candles yet
    pub async fn with_securities<I, S>(self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut candles = self.candles.write().await;
            for id in identifiers {
                candles.entry(id.into()).or_default();
            }
        }
        self
    }

    /// Every stored snapshot of `identifier`, oldest first
    pub async fn signals(&self, identifier: &str) -> Vec<IndicatorSnapshot> {
        self.signals
            .read()
            .await
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn securities(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.candles.read().await.keys().cloned().collect())
    }

    async fn last_candle(&self, identifier: &str) -> Result<Option<Candle>, PersistenceError> {
        Ok(self
            .candles
            .read()
            .await
            .get(identifier)
            .and_then(|c| c.last().cloned()))
    }

    async fn register(&self, identifier: &str) -> Result<bool, PersistenceError> {
        let mut candles = self.candles.write().await;
        if candles.contains_key(identifier) {
            return Ok(false);
        }
        candles.insert(identifier.to_string(), Vec::new());
        Ok(true)
    }

    async fn unregister(&self, identifier: &str) -> Result<bool, PersistenceError> {
        let known = self.candles.write().await.remove(identifier).is_some();
        self.signals.write().await.remove(identifier);
        self.screens
            .write()
            .await
            .retain(|entry| entry.identifier != identifier);
        Ok(known)
    }
}

#[async_trait]
impl CandleStore for MemoryStore {
    async fn append(&self, identifier: &str, candles: &[Candle]) -> Result<(), PersistenceError> {
        let mut all = self.candles.write().await;
        let series = all.entry(identifier.to_string()).or_default();
        for candle in candles {
            if series.last().map_or(true, |last| candle.date > last.date) {
                series.push(candle.clone());
            }
        }
        Ok(())
    }

    async fn history(&self, identifier: &str) -> Result<Vec<Candle>, PersistenceError> {
        Ok(self
            .candles
            .read()
            .await
            .get(identifier)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn last_signal(
        &self,
        identifier: &str,
    ) -> Result<Option<IndicatorSnapshot>, PersistenceError> {
        Ok(self
            .signals
            .read()
            .await
            .get(identifier)
            .and_then(|s| s.last().cloned()))
    }

    async fn append_signals(
        &self,
        identifier: &str,
        snapshots: &[IndicatorSnapshot],
    ) -> Result<(), PersistenceError> {
        let mut all = self.signals.write().await;
        let series = all.entry(identifier.to_string()).or_default();
        for snapshot in snapshots {
            if series.last().map_or(true, |last| snapshot.date > last.date) {
                series.push(snapshot.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ScreenStore for MemoryStore {
    async fn replace_all(&self, entries: &[ScreenEntry]) -> Result<(), PersistenceError> {
        let mut screens = self.screens.write().await;
        *screens = entries.to_vec();
        screens.sort_by(|a, b| a.kdj_j.total_cmp(&b.kdj_j));
        Ok(())
    }

    async fn screens(&self) -> Result<Vec<ScreenEntry>, PersistenceError> {
        Ok(self.screens.read().await.clone())
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn trackings(&self) -> Result<Vec<Tracking>, PersistenceError> {
        Ok(self.trackings.read().await.values().cloned().collect())
    }

    async fn track(&self, tracking: &Tracking) -> Result<(), PersistenceError> {
        self.trackings
            .write()
            .await
            .insert(tracking.identifier.clone(), tracking.clone());
        Ok(())
    }

    async fn untrack(&self, identifier: &str) -> Result<bool, PersistenceError> {
        Ok(self.trackings.write().await.remove(identifier).is_some())
    }
}
