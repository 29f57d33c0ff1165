//! Access gate for full article content.
//!
//! Resolves who is asking, then whether they hold a purchase that covers the
//! article's current price. Identity is checked before the article so an
//! anonymous caller learns nothing about which ids exist.

use crate::db::Database;
use crate::error::{PaywallError, Result};
use crate::models::{Article, Purchase};

/// How the caller identified itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
    /// Identity key proven through the signed handshake
    Strong(String),
    /// Wallet address asserted in the request body, not proven
    Weak(String),
    Unauthenticated,
}

impl Identification {
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Strong(key) => Some(key),
            Self::Weak(address) => Some(address),
            Self::Unauthenticated => None,
        }
    }
}

/// A successful access check.
#[derive(Debug, Clone)]
pub struct Grant {
    pub article: Article,
    pub purchase: Purchase,
}

/// Decide whether `identification` may read `article_id`.
pub fn check_access(
    db: &Database,
    article_id: &str,
    identification: &Identification,
) -> Result<Grant> {
    let identity = match identification {
        Identification::Strong(key) => key.as_str(),
        Identification::Weak(address) if !address.trim().is_empty() => address.trim(),
        Identification::Weak(_) => {
            return Err(PaywallError::Validation("Wallet address required".to_string()));
        }
        Identification::Unauthenticated => return Err(PaywallError::AuthenticationRequired),
    };

    let article = db
        .get_article(article_id)?
        .ok_or_else(|| PaywallError::NotFound {
            article_id: article_id.to_string(),
        })?;

    let purchase = db
        .find_verified_purchase(article_id, identity)?
        .filter(|p| p.grants_access(article.price));

    match purchase {
        Some(purchase) => {
            if let Identification::Weak(_) = identification {
                log::warn!(
                    "[access] Granting article {} to unverified wallet address {} (trust fallback)",
                    article_id,
                    identity
                );
            } else {
                log::info!("[access] Granting article {} via signed request", article_id);
            }
            Ok(Grant { article, purchase })
        }
        None => {
            log::debug!("[access] No purchase of article {} for {}", article_id, identity);
            Err(PaywallError::PaymentRequired {
                article_id: article_id.to_string(),
                price: article.price,
            })
        }
    }
}
