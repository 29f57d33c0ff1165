use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use crate::error::{PaywallError, Result};

pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// SQLite integers are signed; reject values that would wrap.
pub(crate) fn sql_amount(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| PaywallError::Validation(format!("{} out of range: {}", field, value)))
}

/// Pool size for file-backed databases. In-memory databases use a single
/// connection, otherwise every pooled connection would see its own empty db.
const FILE_POOL_SIZE: u32 = 8;

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(database_url: &str) -> Result<Self> {
        let pool = if database_url == ":memory:" {
            let manager = SqliteConnectionManager::memory()
                .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
            Pool::builder()
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
                .build(manager)?
        } else {
            // Create parent directory if it doesn't exist
            if let Some(parent) = Path::new(database_url).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        log::error!("Failed to create database directory {}: {}", parent.display(), e);
                        PaywallError::Io(e)
                    })?;
                }
            }

            let manager = SqliteConnectionManager::file(database_url).with_init(|c| {
                c.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;",
                )
            });
            Pool::builder().max_size(FILE_POOL_SIZE).build(manager)?
        };

        let db = Self { pool };
        db.init()?;
        Ok(db)
    }

    /// Check a connection out of the pool.
    pub fn conn(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn()?;

        // Articles table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                author_payment_address TEXT NOT NULL,
                subject TEXT NOT NULL,
                word_count INTEGER NOT NULL CHECK (word_count >= 0),
                price INTEGER NOT NULL CHECK (price >= 0),
                preview TEXT NOT NULL,
                full_content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Purchases table - txid uniqueness is the only guard against
        // duplicate rows from concurrent verify calls
        conn.execute(
            "CREATE TABLE IF NOT EXISTS purchases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                txid TEXT NOT NULL UNIQUE,
                article_id TEXT NOT NULL REFERENCES articles(id),
                buyer_identity TEXT NOT NULL,
                satoshis_paid INTEGER NOT NULL CHECK (satoshis_paid >= 0),
                verified INTEGER NOT NULL DEFAULT 0,
                purchased_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_purchases_buyer_article
             ON purchases (buyer_identity, article_id)",
            [],
        )?;

        Ok(())
    }
}

/// Parse an RFC 3339 column into a UTC timestamp.
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("paywall.db");
        let path = path.to_str().unwrap();

        Database::new(path).unwrap();
        let db = Database::new(path).unwrap();
        assert_eq!(db.count_articles().unwrap(), 0);
    }

    #[test]
    fn test_unusable_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("paywall.db");

        match Database::new(path.to_str().unwrap()) {
            Err(PaywallError::Io(_)) => {}
            Err(other) => panic!("expected Io error, got {:?}", other),
            Ok(_) => panic!("expected Io error, got a database"),
        }
    }

    #[test]
    fn test_sql_amount_rejects_wrapping_values() {
        assert_eq!(sql_amount(5, "price").unwrap(), 5);
        assert!(matches!(
            sql_amount(1 << 63, "price"),
            Err(PaywallError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp(0, "2024-01-01T00:00:00+00:00").is_ok());
        assert!(parse_timestamp(0, "yesterday").is_err());
    }
}
