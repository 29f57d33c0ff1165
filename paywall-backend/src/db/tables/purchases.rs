//! Database methods for the purchases table

use chrono::Utc;
use rusqlite::{OptionalExtension, Row};

use crate::db::Database;
use crate::db::sqlite::{parse_timestamp, sql_amount};
use crate::error::Result;
use crate::models::{NewPurchase, Purchase};

const PURCHASE_COLUMNS: &str =
    "id, txid, article_id, buyer_identity, satoshis_paid, verified, purchased_at";

fn purchase_from_row(row: &Row<'_>) -> rusqlite::Result<Purchase> {
    let purchased_at: String = row.get(6)?;
    Ok(Purchase {
        id: row.get(0)?,
        txid: row.get(1)?,
        article_id: row.get(2)?,
        buyer_identity: row.get(3)?,
        satoshis_paid: row.get::<_, i64>(4)? as u64,
        verified: row.get::<_, i64>(5)? != 0,
        purchased_at: parse_timestamp(6, &purchased_at)?,
    })
}

impl Database {
    /// Atomically insert a purchase unless its txid is already recorded.
    ///
    /// Returns true when this call created the row. Losing a concurrent race
    /// returns false rather than an error.
    pub fn insert_purchase_if_absent(&self, purchase: &NewPurchase) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "INSERT INTO purchases (txid, article_id, buyer_identity, satoshis_paid, verified, purchased_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(txid) DO NOTHING",
            rusqlite::params![
                purchase.txid.trim(),
                purchase.article_id,
                purchase.buyer_identity.trim(),
                sql_amount(purchase.satoshis_paid, "satoshisPaid")?,
                purchase.verified as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn get_purchase_by_txid(&self, txid: &str) -> Result<Option<Purchase>> {
        let conn = self.conn()?;
        let purchase = conn
            .query_row(
                &format!("SELECT {} FROM purchases WHERE txid = ?1", PURCHASE_COLUMNS),
                [txid.trim()],
                purchase_from_row,
            )
            .optional()?;
        Ok(purchase)
    }

    /// Best verified purchase of an article by a buyer (largest payment wins).
    pub fn find_verified_purchase(
        &self,
        article_id: &str,
        buyer_identity: &str,
    ) -> Result<Option<Purchase>> {
        let conn = self.conn()?;
        let purchase = conn
            .query_row(
                &format!(
                    "SELECT {} FROM purchases
                     WHERE article_id = ?1 AND buyer_identity = ?2 AND verified = 1
                     ORDER BY satoshis_paid DESC, id ASC
                     LIMIT 1",
                    PURCHASE_COLUMNS
                ),
                [article_id, buyer_identity.trim()],
                purchase_from_row,
            )
            .optional()?;
        Ok(purchase)
    }

    /// All purchases recorded for a buyer identity, newest first.
    pub fn list_purchases_for(&self, buyer_identity: &str) -> Result<Vec<Purchase>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM purchases WHERE buyer_identity = ?1
             ORDER BY purchased_at DESC, id DESC",
            PURCHASE_COLUMNS
        ))?;
        let purchases = stmt
            .query_map([buyer_identity.trim()], purchase_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(purchases)
    }

    pub fn count_purchases(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM purchases", [], |row| row.get(0))?)
    }
}
