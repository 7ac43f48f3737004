//! Storage contracts and their implementations.
//!
//! The pipeline only talks to these traits. Candles and snapshots are
//! append-only; the screen set is replaced wholesale each run.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::models::candle::Candle;
use crate::models::indicators::IndicatorSnapshot;
use crate::models::screen::{ScreenEntry, Tracking};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Every security in the universe
    async fn securities(&self) -> Result<Vec<String>, PersistenceError>;

    /// Newest stored candle of `identifier`
    async fn last_candle(&self, identifier: &str) -> Result<Option<Candle>, PersistenceError>;

    /// Add `identifier` to the universe. Returns false if it was already known.
    async fn register(&self, identifier: &str) -> Result<bool, PersistenceError>;

    /// Drop `identifier` with its candles, snapshots and screen entry.
    /// Returns false if it was not known.
    async fn unregister(&self, identifier: &str) -> Result<bool, PersistenceError>;
}

#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Append candles. Dates already stored for `identifier` are ignored.
    async fn append(&self, identifier: &str, candles: &[Candle]) -> Result<(), PersistenceError>;

    /// Full history, oldest first
    async fn history(&self, identifier: &str) -> Result<Vec<Candle>, PersistenceError>;
}

#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn last_signal(
        &self,
        identifier: &str,
    ) -> Result<Option<IndicatorSnapshot>, PersistenceError>;

    async fn append_signals(
        &self,
        identifier: &str,
        snapshots: &[IndicatorSnapshot],
    ) -> Result<(), PersistenceError>;
}

#[async_trait]
pub trait ScreenStore: Send + Sync {
    async fn replace_all(&self, entries: &[ScreenEntry]) -> Result<(), PersistenceError>;

    /// Current screen set, KDJ J ascending
    async fn screens(&self) -> Result<Vec<ScreenEntry>, PersistenceError>;
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn trackings(&self) -> Result<Vec<Tracking>, PersistenceError>;

    async fn track(&self, tracking: &Tracking) -> Result<(), PersistenceError>;

    /// Returns whether a tracking was removed
    async fn untrack(&self, identifier: &str) -> Result<bool, PersistenceError>;
}

/// Every storage role in one object
pub trait Store: CursorStore + CandleStore + SignalStore + ScreenStore + TrackingStore {}

impl<T> Store for T where T: CursorStore + CandleStore + SignalStore + ScreenStore + TrackingStore {}
