//! Database methods for the articles table

use chrono::Utc;
use rusqlite::{OptionalExtension, Row};

use crate::db::Database;
use crate::db::sqlite::{parse_timestamp, sql_amount};
use crate::error::Result;
use crate::models::Article;

const ARTICLE_COLUMNS: &str = "id, title, author, author_payment_address, subject, word_count,
     price, preview, full_content, created_at, updated_at";

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        author_payment_address: row.get(3)?,
        subject: row.get(4)?,
        word_count: row.get::<_, i64>(5)? as u64,
        price: row.get::<_, i64>(6)? as u64,
        preview: row.get(7)?,
        full_content: row.get(8)?,
        created_at: parse_timestamp(9, &created_at)?,
        updated_at: parse_timestamp(10, &updated_at)?,
    })
}

impl Database {
    /// Insert an article unless one with the same id exists.
    /// Returns true when a row was written.
    pub fn insert_article_if_absent(&self, article: &Article) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "INSERT INTO articles (id, title, author, author_payment_address, subject, word_count,
                                   price, preview, full_content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![
                article.id,
                article.title.trim(),
                article.author.trim(),
                article.author_payment_address.trim(),
                article.subject.trim(),
                sql_amount(article.word_count, "wordCount")?,
                sql_amount(article.price, "price")?,
                article.preview,
                article.full_content,
                article.created_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let conn = self.conn()?;
        let article = conn
            .query_row(
                &format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS),
                [id],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    /// All articles, newest first.
    pub fn list_articles(&self) -> Result<Vec<Article>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles ORDER BY created_at DESC, id ASC",
            ARTICLE_COLUMNS
        ))?;
        let articles = stmt
            .query_map([], article_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(articles)
    }

    pub fn count_articles(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?)
    }
}
