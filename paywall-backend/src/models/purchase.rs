use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded payment for an article, keyed by its transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: i64,
    pub txid: String,
    pub article_id: String,
    /// Wallet address or identity key, whichever channel the buyer used
    #[serde(rename = "walletAddress")]
    pub buyer_identity: String,
    pub satoshis_paid: u64,
    pub verified: bool,
    pub purchased_at: DateTime<Utc>,
}

impl Purchase {
    /// Whether this purchase unlocks an article at the given price.
    pub fn grants_access(&self, price: u64) -> bool {
        self.verified && self.satoshis_paid >= price
    }
}

/// Insert payload for the purchases table.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub txid: String,
    pub article_id: String,
    pub buyer_identity: String,
    pub satoshis_paid: u64,
    pub verified: bool,
}

/// Body of POST /articles/{id}/verify-purchase.
///
/// Fields are optional so missing values surface as a 400 with a JSON body
/// instead of a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPurchaseRequest {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub satoshis_paid: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyPurchaseResponse {
    pub success: bool,
    pub txid: String,
    pub message: String,
}

impl VerifyPurchaseResponse {
    pub fn recorded(txid: impl Into<String>) -> Self {
        Self {
            success: true,
            txid: txid.into(),
            message: "Purchase recorded successfully".to_string(),
        }
    }
}

/// Body of the trust-based POST /articles/{id}/content fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAccessRequest {
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase(satoshis_paid: u64, verified: bool) -> Purchase {
        Purchase {
            id: 1,
            txid: "abc".to_string(),
            article_id: "1".to_string(),
            buyer_identity: "W1".to_string(),
            satoshis_paid,
            verified,
            purchased_at: Utc::now(),
        }
    }

    #[test]
    fn test_grants_access_requires_amount_and_verification() {
        assert!(purchase(100, true).grants_access(100));
        assert!(purchase(150, true).grants_access(100));
        assert!(!purchase(99, true).grants_access(100));
        assert!(!purchase(100, false).grants_access(100));
    }

    #[test]
    fn test_purchase_serializes_wallet_address() {
        let json = serde_json::to_value(purchase(100, true)).unwrap();
        assert_eq!(json["walletAddress"], "W1");
        assert_eq!(json["satoshisPaid"], 100);
        assert_eq!(json["articleId"], "1");
    }
}
