//! PostgreSQL storage for candles, indicator snapshots, screens and trackings

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info};

use super::{CandleStore, CursorStore, ScreenStore, SignalStore, TrackingStore};
use crate::error::PersistenceError;
use crate::models::candle::{Candle, DailyStats};
use crate::models::indicators::{IndicatorSnapshot, KdjState, MacdState, RsiState, SmaSet};
use crate::models::screen::{ScreenEntry, Tracking};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS securities (
        identifier TEXT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS candles (
        identifier TEXT NOT NULL,
        date DATE NOT NULL,
        open DOUBLE PRECISION NOT NULL,
        high DOUBLE PRECISION NOT NULL,
        low DOUBLE PRECISION NOT NULL,
        close DOUBLE PRECISION NOT NULL,
        volume DOUBLE PRECISION NOT NULL,
        value DOUBLE PRECISION NOT NULL,
        amplitude DOUBLE PRECISION,
        pct_change DOUBLE PRECISION,
        change DOUBLE PRECISION,
        turnover_rate DOUBLE PRECISION,
        PRIMARY KEY (identifier, date)
    )",
    "CREATE TABLE IF NOT EXISTS signals (
        identifier TEXT NOT NULL,
        date DATE NOT NULL,
        sma5 DOUBLE PRECISION,
        sma10 DOUBLE PRECISION,
        sma20 DOUBLE PRECISION,
        sma30 DOUBLE PRECISION,
        sma90 DOUBLE PRECISION,
        sma120 DOUBLE PRECISION,
        ema12 DOUBLE PRECISION NOT NULL,
        ema26 DOUBLE PRECISION NOT NULL,
        diff DOUBLE PRECISION NOT NULL,
        dea DOUBLE PRECISION NOT NULL,
        hist DOUBLE PRECISION NOT NULL,
        rsi DOUBLE PRECISION NOT NULL,
        rs_gain DOUBLE PRECISION NOT NULL,
        rs_loss DOUBLE PRECISION NOT NULL,
        rsv DOUBLE PRECISION NOT NULL,
        k DOUBLE PRECISION NOT NULL,
        d DOUBLE PRECISION NOT NULL,
        j DOUBLE PRECISION NOT NULL,
        PRIMARY KEY (identifier, date)
    )",
    "CREATE TABLE IF NOT EXISTS screens (
        identifier TEXT PRIMARY KEY,
        kdj_j DOUBLE PRECISION NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS trackings (
        identifier TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        started DATE NOT NULL
    )",
];

const CANDLE_COLUMNS: &str =
    "date, open, high, low, close, volume, value, amplitude, pct_change, change, turnover_rate";

const SIGNAL_COLUMNS: &str = "date, sma5, sma10, sma20, sma30, sma90, sma120, \
     ema12, ema26, diff, dea, hist, rsi, rs_gain, rs_loss, rsv, k, d, j";

pub struct PostgresStore {
    client: Mutex<Client>,
}

impl PostgresStore {
    /// Connect and make sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        let store = Self {
            client: Mutex::new(client),
        };
        store.init_schema().await?;
        info!("PostgreSQL store ready");

        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PersistenceError> {
        let client = self.client.lock().await;
        for statement in SCHEMA {
            client.execute(*statement, &[]).await?;
        }
        Ok(())
    }
}

fn candle_from_row(row: &Row) -> Candle {
    let amplitude: Option<f64> = row.get(7);
    let pct_change: Option<f64> = row.get(8);
    let change: Option<f64> = row.get(9);
    let turnover_rate: Option<f64> = row.get(10);

    let mut candle = Candle::new(row.get(0), row.get(1), row.get(2), row.get(3), row.get(4))
        .with_volume(row.get(5), row.get(6));

    if amplitude.is_some() || pct_change.is_some() || change.is_some() || turnover_rate.is_some() {
        candle = candle.with_stats(DailyStats {
            amplitude: amplitude.unwrap_or(0.0),
            pct_change: pct_change.unwrap_or(0.0),
            change: change.unwrap_or(0.0),
            turnover_rate: turnover_rate.unwrap_or(0.0),
        });
    }

    candle
}

fn snapshot_from_row(row: &Row) -> IndicatorSnapshot {
    IndicatorSnapshot {
        date: row.get(0),
        sma: SmaSet {
            sma5: row.get(1),
            sma10: row.get(2),
            sma20: row.get(3),
            sma30: row.get(4),
            sma90: row.get(5),
            sma120: row.get(6),
        },
        macd: MacdState {
            ema12: row.get(7),
            ema26: row.get(8),
            diff: row.get(9),
            dea: row.get(10),
            hist: row.get(11),
        },
        rsi: RsiState {
            rsi: row.get(12),
            rs_gain: row.get(13),
            rs_loss: row.get(14),
        },
        kdj: KdjState {
            rsv: row.get(15),
            k: row.get(16),
            d: row.get(17),
            j: row.get(18),
        },
    }
}

#[async_trait]
impl CursorStore for PostgresStore {
    async fn securities(&self) -> Result<Vec<String>, PersistenceError> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT identifier FROM securities
                 UNION
                 SELECT DISTINCT identifier FROM candles
                 ORDER BY identifier",
                &[],
            )
            .await?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn last_candle(&self, identifier: &str) -> Result<Option<Candle>, PersistenceError> {
        let client = self.client.lock().await;
        let query = format!(
            "SELECT {} FROM candles WHERE identifier = $1 ORDER BY date DESC LIMIT 1",
            CANDLE_COLUMNS
        );
        let row = client.query_opt(&query, &[&identifier]).await?;
        Ok(row.as_ref().map(candle_from_row))
    }

    async fn register(&self, identifier: &str) -> Result<bool, PersistenceError> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let inserted = tx
            .execute(
                "INSERT INTO securities (identifier) VALUES ($1) ON CONFLICT DO NOTHING",
                &[&identifier],
            )
            .await?;
        // securities known only through their candles count as registered
        let has_candles = tx
            .query_opt(
                "SELECT 1 FROM candles WHERE identifier = $1 LIMIT 1",
                &[&identifier],
            )
            .await?
            .is_some();
        tx.commit().await?;
        Ok(inserted > 0 && !has_candles)
    }

    async fn unregister(&self, identifier: &str) -> Result<bool, PersistenceError> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let mut removed = 0;
        for table in ["securities", "candles"] {
            removed += tx
                .execute(
                    &format!("DELETE FROM {} WHERE identifier = $1", table),
                    &[&identifier],
                )
                .await?;
        }
        for table in ["signals", "screens"] {
            tx.execute(
                &format!("DELETE FROM {} WHERE identifier = $1", table),
                &[&identifier],
            )
            .await?;
        }
        tx.commit().await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl CandleStore for PostgresStore {
    async fn append(&self, identifier: &str, candles: &[Candle]) -> Result<(), PersistenceError> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let statement = tx
            .prepare(
                "INSERT INTO candles (identifier, date, open, high, low, close, volume, value,
                     amplitude, pct_change, change, turnover_rate)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                 ON CONFLICT (identifier, date) DO NOTHING",
            )
            .await?;

        for candle in candles {
            let stats = candle.stats.as_ref();
            tx.execute(
                &statement,
                &[
                    &identifier,
                    &candle.date,
                    &candle.open,
                    &candle.high,
                    &candle.low,
                    &candle.close,
                    &candle.volume,
                    &candle.value,
                    &stats.map(|s| s.amplitude),
                    &stats.map(|s| s.pct_change),
                    &stats.map(|s| s.change),
                    &stats.map(|s| s.turnover_rate),
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, identifier: &str) -> Result<Vec<Candle>, PersistenceError> {
        let client = self.client.lock().await;
        let query = format!(
            "SELECT {} FROM candles WHERE identifier = $1 ORDER BY date ASC",
            CANDLE_COLUMNS
        );
        let rows = client.query(&query, &[&identifier]).await?;
        Ok(rows.iter().map(candle_from_row).collect())
    }
}

#[async_trait]
impl SignalStore for PostgresStore {
    async fn last_signal(
        &self,
        identifier: &str,
    ) -> Result<Option<IndicatorSnapshot>, PersistenceError> {
        let client = self.client.lock().await;
        let query = format!(
            "SELECT {} FROM signals WHERE identifier = $1 ORDER BY date DESC LIMIT 1",
            SIGNAL_COLUMNS
        );
        let row = client.query_opt(&query, &[&identifier]).await?;
        Ok(row.as_ref().map(snapshot_from_row))
    }

    async fn append_signals(
        &self,
        identifier: &str,
        snapshots: &[IndicatorSnapshot],
    ) -> Result<(), PersistenceError> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let statement = tx
            .prepare(&format!(
                "INSERT INTO signals (identifier, {})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                         $16, $17, $18, $19, $20)
                 ON CONFLICT (identifier, date) DO NOTHING",
                SIGNAL_COLUMNS
            ))
            .await?;

        for s in snapshots {
            tx.execute(
                &statement,
                &[
                    &identifier,
                    &s.date,
                    &s.sma.sma5,
                    &s.sma.sma10,
                    &s.sma.sma20,
                    &s.sma.sma30,
                    &s.sma.sma90,
                    &s.sma.sma120,
                    &s.macd.ema12,
                    &s.macd.ema26,
                    &s.macd.diff,
                    &s.macd.dea,
                    &s.macd.hist,
                    &s.rsi.rsi,
                    &s.rsi.rs_gain,
                    &s.rsi.rs_loss,
                    &s.kdj.rsv,
                    &s.kdj.k,
                    &s.kdj.d,
                    &s.kdj.j,
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ScreenStore for PostgresStore {
    async fn replace_all(&self, entries: &[ScreenEntry]) -> Result<(), PersistenceError> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        tx.execute("DELETE FROM screens", &[]).await?;
        for entry in entries {
            tx.execute(
                "INSERT INTO screens (identifier, kdj_j) VALUES ($1, $2)
                 ON CONFLICT (identifier) DO UPDATE SET kdj_j = EXCLUDED.kdj_j",
                &[&entry.identifier, &entry.kdj_j],
            )
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn screens(&self) -> Result<Vec<ScreenEntry>, PersistenceError> {
        let client = self.client.lock().await;
        let rows = client
            .query("SELECT identifier, kdj_j FROM screens ORDER BY kdj_j ASC", &[])
            .await?;
        Ok(rows
            .iter()
            .map(|r| ScreenEntry {
                identifier: r.get(0),
                kdj_j: r.get(1),
            })
            .collect())
    }
}

#[async_trait]
impl TrackingStore for PostgresStore {
    async fn trackings(&self) -> Result<Vec<Tracking>, PersistenceError> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT identifier, name, started FROM trackings ORDER BY identifier",
                &[],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|r| Tracking {
                identifier: r.get(0),
                name: r.get(1),
                started: r.get(2),
            })
            .collect())
    }

    async fn track(&self, tracking: &Tracking) -> Result<(), PersistenceError> {
        let client = self.client.lock().await;
        client
            .execute(
                "INSERT INTO trackings (identifier, name, started) VALUES ($1, $2, $3)
                 ON CONFLICT (identifier) DO UPDATE SET name = EXCLUDED.name, started = EXCLUDED.started",
                &[&tracking.identifier, &tracking.name, &tracking.started],
            )
            .await?;
        Ok(())
    }

    async fn untrack(&self, identifier: &str) -> Result<bool, PersistenceError> {
        let client = self.client.lock().await;
        let removed = client
            .execute("DELETE FROM trackings WHERE identifier = $1", &[&identifier])
            .await?;
        Ok(removed > 0)
    }
}
