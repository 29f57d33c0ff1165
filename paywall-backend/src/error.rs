//! Error types for the paywall backend.
//!
//! Every variant maps onto an HTTP status and a JSON body carrying enough
//! context (required price, paid amount) for a client to correct itself.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Result type alias using the backend's error type.
pub type Result<T> = std::result::Result<T, PaywallError>;

#[derive(Debug, Error)]
pub enum PaywallError {
    /// The referenced article does not exist.
    #[error("Article not found: {article_id}")]
    NotFound { article_id: String },

    /// A required request field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// Claimed (or stored) amount is below the article price.
    #[error("Payment amount insufficient: required {required}, paid {paid}")]
    InsufficientPayment {
        required: u64,
        paid: u64,
        /// True when the shortfall was found on an already recorded purchase.
        existing: bool,
    },

    /// No identity could be established for the request.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Identity is known but holds no valid purchase for the article.
    #[error("Access denied for article {article_id}: purchase required")]
    PaymentRequired { article_id: String, price: u64 },

    /// The transaction confirmer rejected the claimed payment.
    #[error("Transaction {txid} could not be confirmed")]
    PaymentUnconfirmed { txid: String },

    /// The txid is already bound to a different article.
    #[error("Transaction {txid} is already recorded for article {recorded_for}")]
    TxidConflict { txid: String, recorded_for: String },

    /// The confirmation backend could not be reached or answered garbage.
    #[error("Transaction confirmation failed: {0}")]
    Confirmation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResponseError for PaywallError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientPayment { .. } | Self::PaymentUnconfirmed { .. } => {
                StatusCode::PAYMENT_REQUIRED
            }
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::PaymentRequired { .. } => StatusCode::FORBIDDEN,
            Self::TxidConflict { .. } => StatusCode::CONFLICT,
            Self::Confirmation(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Pool(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::NotFound { .. } => serde_json::json!({ "error": "Article not found" }),
            Self::Validation(message) => serde_json::json!({ "error": message }),
            Self::InsufficientPayment { required, paid, existing } => serde_json::json!({
                "error": if *existing {
                    "Existing purchase has insufficient payment"
                } else {
                    "Payment amount insufficient"
                },
                "required": required,
                "paid": paid,
            }),
            Self::AuthenticationRequired => serde_json::json!({
                "error": "Authentication required",
                "message": "Sign the request with your identity key (see the article's /info endpoint)",
            }),
            Self::PaymentRequired { article_id, price } => serde_json::json!({
                "error": "Access denied. You must purchase this article first.",
                "articleId": article_id,
                "price": price,
                "message": "Make a purchase using the payment flow, then request the content again",
            }),
            Self::PaymentUnconfirmed { txid } => serde_json::json!({
                "error": "Payment could not be confirmed",
                "txid": txid,
            }),
            Self::TxidConflict { txid, recorded_for } => serde_json::json!({
                "error": "Transaction already recorded for another article",
                "txid": txid,
                "articleId": recorded_for,
            }),
            Self::Confirmation(e) => {
                log::warn!("[verify] Confirmation backend failure: {}", e);
                serde_json::json!({ "error": "Payment confirmation temporarily unavailable" })
            }
            Self::Storage(e) => {
                log::error!("Database error: {}", e);
                serde_json::json!({ "error": "Internal server error" })
            }
            Self::Pool(e) => {
                log::error!("Database pool error: {}", e);
                serde_json::json!({ "error": "Internal server error" })
            }
            Self::Io(e) => {
                log::error!("I/O error: {}", e);
                serde_json::json!({ "error": "Internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
