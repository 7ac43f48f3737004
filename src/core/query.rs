//! Read models for screens and tracked securities

use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{CandleStore, CursorStore, ScreenStore, Store, TrackingStore};
use crate::error::PersistenceError;
use crate::models::candle::Candle;
use crate::models::screen::{ScreenView, Tracking, TrackingView};

pub struct ScreenQuery {
    store: Arc<dyn Store>,
    kdj_threshold: f64,
}

impl ScreenQuery {
    pub fn new(store: Arc<dyn Store>, kdj_threshold: f64) -> Self {
        Self {
            store,
            kdj_threshold,
        }
    }

    /// Current screen set at or below the threshold, KDJ J ascending, with
    /// tracking state and the latest bar of each security.
    pub async fn screens(&self) -> Result<Vec<ScreenView>, PersistenceError> {
        let tracked: HashSet<String> = self
            .store
            .trackings()
            .await?
            .into_iter()
            .map(|t| t.identifier)
            .collect();

        let mut entries = self.store.screens().await?;
        entries.retain(|e| e.kdj_j <= self.kdj_threshold);
        entries.sort_by(|a, b| a.kdj_j.total_cmp(&b.kdj_j));

        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            let history = self.store.history(&entry.identifier).await?;
            let latest = history.last();

            views.push(ScreenView {
                tracked: tracked.contains(&entry.identifier),
                latest_date: latest.map(|c| c.date),
                latest_close: latest.map(|c| c.close),
                daily_value: latest.map(|c| c.value),
                identifier: entry.identifier,
                kdj_j: entry.kdj_j,
            });
        }

        Ok(views)
    }

    /// Every tracking with its close change since it started
    pub async fn trackings(&self) -> Result<Vec<TrackingView>, PersistenceError> {
        let trackings = self.store.trackings().await?;

        let mut views = Vec::with_capacity(trackings.len());
        for tracking in trackings {
            let history = self.store.history(&tracking.identifier).await?;
            views.push(tracking_view(tracking, &history));
        }

        Ok(views)
    }

    /// Start tracking. Returns false when the security is not registered.
    pub async fn track(&self, tracking: Tracking) -> Result<bool, PersistenceError> {
        if !self.is_registered(&tracking.identifier).await? {
            return Ok(false);
        }
        self.store.track(&tracking).await?;
        Ok(true)
    }

    pub async fn untrack(&self, identifier: &str) -> Result<bool, PersistenceError> {
        self.store.untrack(identifier).await
    }

    pub async fn securities(&self) -> Result<Vec<String>, PersistenceError> {
        self.store.securities().await
    }

    async fn is_registered(&self, identifier: &str) -> Result<bool, PersistenceError> {
        Ok(self.store.securities().await?.iter().any(|s| s == identifier))
    }

    /// Returns false if the security was already registered
    pub async fn register_security(&self, identifier: &str) -> Result<bool, PersistenceError> {
        self.store.register(identifier).await
    }

    /// Remove a security along with its tracking
    pub async fn unregister_security(&self, identifier: &str) -> Result<bool, PersistenceError> {
        let removed = self.store.unregister(identifier).await?;
        if removed {
            self.store.untrack(identifier).await?;
        }
        Ok(removed)
    }
}

/// Change is `(last - first) / first` over candles on or after `started`.
pub fn tracking_view(tracking: Tracking, history: &[Candle]) -> TrackingView {
    let since: Vec<&Candle> = history.iter().filter(|c| c.date >= tracking.started).collect();

    let change = match (since.first(), since.last()) {
        (Some(first), Some(last)) if first.close != 0.0 => (last.close - first.close) / first.close,
        _ => 0.0,
    };

    TrackingView {
        latest_close: history.last().map(|c| c.close),
        change,
        identifier: tracking.identifier,
        name: tracking.name,
        started: tracking.started,
    }
}
