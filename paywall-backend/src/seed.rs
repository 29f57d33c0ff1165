//! Article catalogue seeding.
//!
//! Articles come from the built-in demo catalogue or a JSON file. Each entry
//! names its payment destination either directly (`authorPaymentAddress`) or
//! through the author's public key (`authorIdentityKey`), from which the P2PKH
//! address is derived.

use chrono::Utc;
use serde::Deserialize;
use std::path::Path;

use crate::db::Database;
use crate::error::{PaywallError, Result};
use crate::models::Article;
use crate::script::{self, Network};

/// Identity key of the demo catalogue's author
const DEMO_AUTHOR_IDENTITY_KEY: &str =
    "02ec9b58db65002d0971c3abe2eef3403d23602d8de2af51445d84e1b64c11a646";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedArticle {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub author_payment_address: Option<String>,
    #[serde(default)]
    pub author_identity_key: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub word_count: u64,
    pub price: u64,
    pub preview: String,
    pub full_content: String,
}

impl SeedArticle {
    /// Resolve the payment address and stamp timestamps.
    pub fn into_article(self) -> Result<Article> {
        if self.price > script::MAX_SATOSHIS {
            return Err(PaywallError::Validation(format!(
                "article {}: price {} exceeds {} sats",
                self.id,
                self.price,
                script::MAX_SATOSHIS
            )));
        }

        let address = match (self.author_payment_address, self.author_identity_key) {
            (Some(address), _) => {
                script::decode_p2pkh_address(&address)
                    .map_err(|e| PaywallError::Validation(format!("article {}: {}", self.id, e)))?;
                address
            }
            (None, Some(key)) => {
                let bytes = hex::decode(key.trim()).map_err(|e| {
                    PaywallError::Validation(format!("article {}: bad identity key: {}", self.id, e))
                })?;
                script::address_from_public_key(&bytes, Network::Main)
                    .map_err(|e| PaywallError::Validation(format!("article {}: {}", self.id, e)))?
            }
            (None, None) => {
                return Err(PaywallError::Validation(format!(
                    "article {}: needs authorPaymentAddress or authorIdentityKey",
                    self.id
                )));
            }
        };

        let now = Utc::now();
        Ok(Article {
            id: self.id,
            title: self.title,
            author: self.author,
            author_payment_address: address,
            subject: self.subject,
            word_count: self.word_count,
            price: self.price,
            preview: self.preview,
            full_content: self.full_content,
            created_at: now,
            updated_at: now,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn demo(
    id: &str,
    title: &str,
    author: &str,
    subject: &str,
    word_count: u64,
    price: u64,
    preview: &str,
    full_content: &str,
) -> SeedArticle {
    SeedArticle {
        id: id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        author_payment_address: None,
        author_identity_key: Some(DEMO_AUTHOR_IDENTITY_KEY.to_string()),
        subject: subject.to_string(),
        word_count,
        price,
        preview: preview.to_string(),
        full_content: full_content.to_string(),
    }
}

/// The built-in demo catalogue.
pub fn demo_articles() -> Vec<SeedArticle> {
    vec![
        demo(
            "1",
            "Understanding Bitcoin Micropayments",
            "Satoshi Writer",
            "Blockchain Technology",
            850,
            100,
            "Micropayments have been a long-standing promise of the internet. In this article, \
             we explore how Bitcoin SV makes true micropayments possible for the first time...",
            "Micropayments have been a long-standing promise of the internet.\n\n\
             ## The Problem with Traditional Payment Systems\n\n\
             Card networks charge fixed fees that make a one cent payment cost more to \
             process than it is worth.\n\n\
             ## Real-World Applications\n\n\
             - Pay-per-article journalism without subscriptions\n\
             - Micro-licensing for software features\n\
             - Real-time payment for API calls\n\n\
             ## The Future\n\n\
             Micropayments can become the default way to pay for digital content.",
        ),
        demo(
            "2",
            "The Future of Content Monetization",
            "Jane Blockchain",
            "Digital Economy",
            1200,
            150,
            "Traditional content monetization models are broken. Subscriptions are too \
             expensive, and ads are intrusive. Discover how micropayments can revolutionize...",
            "The digital content industry is at a crossroads.\n\n\
             ## The Subscription Fatigue Problem\n\n\
             Readers are asked to subscribe to every outlet they visit once.\n\n\
             ## Paying per Article\n\n\
             Paying a few satoshis for exactly what you read aligns the incentives of \
             writers and readers.",
        ),
        demo(
            "3",
            "BRC-100: A New Standard for Payments",
            "Tech Innovator",
            "Web3 Protocols",
            950,
            120,
            "BRC-100 introduces a standardized way for applications to interact with BSV \
             wallets. This protocol enables seamless payment flows...",
            "BRC-100 standardizes how applications request payments from user wallets.\n\n\
             ## The Problem BRC-100 Solves\n\n\
             Before BRC-100 every wallet had its own payment API.\n\n\
             ## How It Works\n\n\
             An application describes the outputs it wants with `createAction` and the \
             wallet signs and broadcasts the transaction.",
        ),
        demo(
            "4",
            "Instant Settlements: Why It Matters",
            "Crypto Analyst",
            "Financial Technology",
            780,
            80,
            "In traditional payment systems, settlements can take days. Learn why instant \
             settlement is crucial for micropayments and how BSV achieves this...",
            "Instant settlement is fundamental to the viability of micropayments.\n\n\
             ## Traditional Settlement Times\n\n\
             - Credit cards: 2-3 business days\n\
             - Bank transfers: 1-5 business days\n\n\
             ## Settling on Chain\n\n\
             A broadcast transaction is visible to the recipient within seconds.",
        ),
    ]
}

/// Read a JSON array of articles.
pub fn load_articles(path: impl AsRef<Path>) -> Result<Vec<SeedArticle>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        PaywallError::Validation(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| PaywallError::Validation(format!("invalid seed file {}: {}", path.display(), e)))
}

/// Insert every article not already present. Returns how many were inserted.
pub fn seed(db: &Database, articles: Vec<SeedArticle>) -> Result<usize> {
    let mut inserted = 0;
    for entry in articles {
        let article = entry.into_article()?;
        if db.insert_article_if_absent(&article)? {
            log::info!("[seed] Added '{}' ({} sats)", article.title, article.price);
            inserted += 1;
        } else {
            log::debug!("[seed] Article {} already present", article.id);
        }
    }
    Ok(inserted)
}
