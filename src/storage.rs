//! SQLite storage for glucose samples

use chrono::{TimeZone, Utc};
use log::warn;
use rusqlite::{params, Connection, Result};
use std::path::Path;

use crate::history::History;
use crate::sample::Sample;
use crate::trend::Trend;

/// SQLite database for storing samples
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Create or open a database at the given path (`:memory:` for tests)
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY,
                epoch INTEGER NOT NULL UNIQUE,
                value REAL NOT NULL,
                trend TEXT NOT NULL,
                imported_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_samples_epoch
                ON samples(epoch);"
        )?;

        Ok(Self { conn })
    }

    /// Insert a sample, ignoring duplicates based on epoch timestamp
    pub fn insert_sample(&self, sample: &Sample) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO samples (epoch, value, trend) VALUES (?1, ?2, ?3)",
            params![sample.epoch(), sample.value, sample.trend.text_key()],
        )?;
        Ok(inserted > 0)
    }

    /// Bulk import samples in one transaction, returns count of new entries
    pub fn import_samples(&mut self, samples: &[Sample]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO samples (epoch, value, trend) VALUES (?1, ?2, ?3)",
            )?;
            for sample in samples {
                count += stmt.execute(params![sample.epoch(), sample.value, sample.trend.text_key()])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Load every stored sample
    pub fn load_history(&self) -> Result<History> {
        self.load_since(i64::MIN)
    }

    /// Load samples taken at or after `start_epoch`
    pub fn load_since(&self, start_epoch: i64) -> Result<History> {
        let mut stmt = self.conn.prepare(
            "SELECT epoch, value, trend FROM samples WHERE epoch >= ?1 ORDER BY epoch DESC"
        )?;
        let rows = stmt
            .query_map(params![start_epoch], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>>>()?;

        let samples = rows
            .into_iter()
            .filter_map(|(epoch, value, trend)| {
                let timestamp = Utc.timestamp_opt(epoch, 0).single()?;
                match Sample::new(value, timestamp, Trend::from_text(&trend)) {
                    Ok(sample) => Some(sample),
                    Err(e) => {
                        warn!("Skipping stored row: {}", e);
                        None
                    }
                }
            })
            .collect();

        Ok(History::new(samples))
    }

    /// Get total sample count
    pub fn count(&self) -> Result<i64> {
        self.conn.query_row("SELECT COUNT(*) FROM samples", [], |row| row.get(0))
    }
}
