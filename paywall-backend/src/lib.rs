//! Pay-per-article content backend and reader client.

use std::sync::Arc;

pub mod access;
pub mod auth;
pub mod client;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod markdown;
pub mod models;
pub mod purchase;
pub mod script;
pub mod seed;

#[cfg(test)]
pub(crate) mod test_support;

use auth::NonceStore;
use config::Config;
use db::Database;
use purchase::{PurchaseVerifier, TxConfirmer};

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub verifier: Arc<PurchaseVerifier>,
    pub nonces: Arc<NonceStore>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config, confirmer: Arc<dyn TxConfirmer>) -> Self {
        let verifier = Arc::new(PurchaseVerifier::new(Arc::clone(&db), confirmer));
        let nonces = Arc::new(NonceStore::new(config.auth_nonce_ttl_secs));
        Self {
            db,
            config,
            verifier,
            nonces,
        }
    }
}
