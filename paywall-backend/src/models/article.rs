use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A purchasable article as stored in the database.
///
/// `full_content` never leaves the server except through [`ArticleContent`],
/// which is only built for a granted access check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: String,
    /// P2PKH address receiving the article payment
    pub author_payment_address: String,
    pub subject: String,
    pub word_count: u64,
    /// Price in satoshis
    pub price: u64,
    pub preview: String,
    pub full_content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Public view of an article - everything except the gated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub word_count: u64,
    pub price: u64,
    pub preview: String,
    pub author_payment_address: String,
    /// Always false from the server; clients flip it after matching their purchases
    #[serde(default)]
    pub is_purchased: bool,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            author: article.author.clone(),
            subject: article.subject.clone(),
            word_count: article.word_count,
            price: article.price,
            preview: article.preview.clone(),
            author_payment_address: article.author_payment_address.clone(),
            is_purchased: false,
        }
    }
}

/// Full article returned after a successful access check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub id: String,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub word_count: u64,
    pub price: u64,
    pub preview: String,
    pub full_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_content_html: Option<String>,
    pub txid: String,
    pub is_purchased: bool,
}

impl ArticleContent {
    pub fn new(article: Article, txid: String) -> Self {
        Self {
            id: article.id,
            title: article.title,
            author: article.author,
            subject: article.subject,
            word_count: article.word_count,
            price: article.price,
            preview: article.preview,
            full_content: article.full_content,
            full_content_html: None,
            txid,
            is_purchased: true,
        }
    }

    /// Attach an HTML rendering of the Markdown body.
    pub fn with_html(mut self) -> Self {
        self.full_content_html = Some(crate::markdown::markdown_to_html(&self.full_content));
        self
    }
}
