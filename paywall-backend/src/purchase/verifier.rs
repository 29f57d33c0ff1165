//! Records claimed purchases after checking price and chain.

use std::sync::Arc;

use super::confirm::TxConfirmer;
use crate::db::Database;
use crate::error::{PaywallError, Result};
use crate::models::{NewPurchase, Purchase, VerifyPurchaseRequest, VerifyPurchaseResponse};
use crate::script::{self, MAX_SATOSHIS};

/// Length of a transaction id in hex.
pub const TXID_HEX_LEN: usize = 64;

/// Trim and lowercase a txid. Only hex digits are accepted, at most
/// [`TXID_HEX_LEN`] of them, so case variants of one transaction share a key.
pub fn normalize_txid(raw: &str) -> Result<String> {
    let txid = raw.trim();
    if txid.is_empty() || txid.len() > TXID_HEX_LEN || !txid.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PaywallError::Validation(format!(
            "txid must be a hex transaction id of at most {} characters",
            TXID_HEX_LEN
        )));
    }
    Ok(txid.to_ascii_lowercase())
}

fn check_amount(satoshis: u64) -> Result<u64> {
    if satoshis > MAX_SATOSHIS {
        return Err(PaywallError::Validation(format!(
            "satoshisPaid must not exceed {}",
            MAX_SATOSHIS
        )));
    }
    Ok(satoshis)
}

/// A buyer's claim that `txid` paid for an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseClaim {
    pub article_id: String,
    pub txid: String,
    pub buyer_identity: String,
    pub satoshis_paid: u64,
}

impl PurchaseClaim {
    /// Validate a verify-purchase body. All three fields are required.
    pub fn from_request(article_id: &str, request: VerifyPurchaseRequest) -> Result<Self> {
        let txid = request
            .txid
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let buyer = request
            .wallet_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        match (txid, buyer, request.satoshis_paid) {
            (Some(txid), Some(buyer_identity), Some(satoshis_paid)) => Ok(Self {
                article_id: article_id.to_string(),
                txid: normalize_txid(&txid)?,
                buyer_identity,
                satoshis_paid: check_amount(satoshis_paid)?,
            }),
            _ => Err(PaywallError::Validation(
                "Missing required fields: txid, walletAddress, satoshisPaid".to_string(),
            )),
        }
    }
}

pub struct PurchaseVerifier {
    db: Arc<Database>,
    confirmer: Arc<dyn TxConfirmer>,
}

impl PurchaseVerifier {
    pub fn new(db: Arc<Database>, confirmer: Arc<dyn TxConfirmer>) -> Self {
        Self { db, confirmer }
    }

    pub fn confirmer_name(&self) -> &'static str {
        self.confirmer.name()
    }

    /// Check a claim and record it. Repeating a successful claim returns the
    /// same response without writing a second row.
    pub async fn verify(&self, claim: &PurchaseClaim) -> Result<VerifyPurchaseResponse> {
        let txid = normalize_txid(&claim.txid)?;
        check_amount(claim.satoshis_paid)?;
        let claim = &PurchaseClaim {
            txid,
            ..claim.clone()
        };

        let article = self
            .db
            .get_article(&claim.article_id)?
            .ok_or_else(|| PaywallError::NotFound {
                article_id: claim.article_id.clone(),
            })?;

        if claim.satoshis_paid < article.price {
            log::info!(
                "[verify] Rejecting {} for article {}: paid {} < price {}",
                claim.txid,
                article.id,
                claim.satoshis_paid,
                article.price
            );
            return Err(PaywallError::InsufficientPayment {
                required: article.price,
                paid: claim.satoshis_paid,
                existing: false,
            });
        }

        if let Some(existing) = self.db.get_purchase_by_txid(&claim.txid)? {
            return Self::check_existing(claim, &existing, article.price);
        }

        let expected = script::expected_payment_output(
            &article.author_payment_address,
            claim.satoshis_paid,
        )
        .map_err(|e| {
            log::error!("[verify] Article {} has an unusable payment address: {}", article.id, e);
            PaywallError::Confirmation(format!("article {} payment address: {}", article.id, e))
        })?;

        if !self.confirmer.confirm(&claim.txid, &[expected]).await? {
            return Err(PaywallError::PaymentUnconfirmed {
                txid: claim.txid.clone(),
            });
        }

        let inserted = self.db.insert_purchase_if_absent(&NewPurchase {
            txid: claim.txid.clone(),
            article_id: claim.article_id.clone(),
            buyer_identity: claim.buyer_identity.clone(),
            satoshis_paid: claim.satoshis_paid,
            verified: true,
        })?;

        if inserted {
            log::info!(
                "[verify] Recorded purchase {} of article {} for {} ({} sats)",
                claim.txid,
                claim.article_id,
                claim.buyer_identity,
                claim.satoshis_paid
            );
            return Ok(VerifyPurchaseResponse::recorded(&claim.txid));
        }

        // Lost the insert race; judge the claim against the winning row
        let existing = self
            .db
            .get_purchase_by_txid(&claim.txid)?
            .ok_or(PaywallError::Storage(rusqlite::Error::QueryReturnedNoRows))?;
        Self::check_existing(claim, &existing, article.price)
    }

    fn check_existing(
        claim: &PurchaseClaim,
        existing: &Purchase,
        price: u64,
    ) -> Result<VerifyPurchaseResponse> {
        if existing.article_id != claim.article_id {
            return Err(PaywallError::TxidConflict {
                txid: claim.txid.clone(),
                recorded_for: existing.article_id.clone(),
            });
        }
        if existing.satoshis_paid < price {
            return Err(PaywallError::InsufficientPayment {
                required: price,
                paid: existing.satoshis_paid,
                existing: true,
            });
        }
        if existing.buyer_identity != claim.buyer_identity {
            log::warn!(
                "[verify] {} re-claimed by {} but recorded for {}; keeping original buyer",
                claim.txid,
                claim.buyer_identity,
                existing.buyer_identity
            );
        }
        log::debug!("[verify] Purchase {} already recorded", claim.txid);
        Ok(VerifyPurchaseResponse::recorded(&claim.txid))
    }
}
