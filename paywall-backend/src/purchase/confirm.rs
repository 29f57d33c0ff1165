//! Transaction confirmation backends.
//!
//! The verifier asks a [`TxConfirmer`] whether a claimed transaction really
//! carries the expected payment output before recording a purchase.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Config, ConfirmerKind};
use crate::error::{PaywallError, Result};
use crate::script::ExpectedOutput;
use crate::purchase::verifier::TXID_HEX_LEN;

const SATOSHIS_PER_COIN: f64 = 100_000_000.0;
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[async_trait]
pub trait TxConfirmer: Send + Sync {
    /// Short name reported by the health endpoint
    fn name(&self) -> &'static str;

    /// Whether `txid` exists and contains every expected output.
    async fn confirm(&self, txid: &str, expected: &[ExpectedOutput]) -> Result<bool>;
}

/// Build the confirmer selected in the config.
pub fn from_config(config: &Config) -> Result<Box<dyn TxConfirmer>> {
    match config.tx_confirmer {
        ConfirmerKind::Trust => {
            log::warn!(
                "[confirm] TX_CONFIRMER=trust: purchases are recorded without checking the chain"
            );
            Ok(Box::new(TrustOnWrite))
        }
        ConfirmerKind::WhatsOnChain => Ok(Box::new(WhatsOnChainConfirmer::new(
            &config.woc_api_url,
            &config.woc_network,
            config.min_confirmations,
        )?)),
    }
}

/// Accepts every claimed transaction.
pub struct TrustOnWrite;

#[async_trait]
impl TxConfirmer for TrustOnWrite {
    fn name(&self) -> &'static str {
        "trust"
    }

    async fn confirm(&self, txid: &str, _expected: &[ExpectedOutput]) -> Result<bool> {
        log::debug!("[confirm] Trusting claimed transaction {}", txid);
        Ok(true)
    }
}

#[derive(Debug, Deserialize)]
pub struct WocTransaction {
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub vout: Vec<WocOutput>,
}

#[derive(Debug, Deserialize)]
pub struct WocOutput {
    /// Output value in whole coins
    pub value: f64,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: WocScript,
}

#[derive(Debug, Deserialize)]
pub struct WocScript {
    pub hex: String,
}

/// Whether a looked-up transaction satisfies the expected outputs.
pub fn transaction_satisfies(
    tx: &WocTransaction,
    expected: &[ExpectedOutput],
    min_confirmations: u64,
) -> bool {
    if tx.confirmations.unwrap_or(0) < min_confirmations {
        return false;
    }
    expected.iter().all(|want| {
        let want_script = hex::encode(&want.locking_script);
        tx.vout.iter().any(|out| {
            let satoshis = (out.value * SATOSHIS_PER_COIN).round() as u64;
            out.script_pub_key.hex.eq_ignore_ascii_case(&want_script) && satoshis >= want.satoshis
        })
    })
}

/// Looks transactions up through a WhatsOnChain-compatible API.
pub struct WhatsOnChainConfirmer {
    client: Client,
    base_url: String,
    network: String,
    min_confirmations: u64,
}

impl WhatsOnChainConfirmer {
    pub fn new(base_url: &str, network: &str, min_confirmations: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PaywallError::Confirmation(format!("HTTP client: {}", e)))?;
        log::info!(
            "[confirm] Using WhatsOnChain at {} ({}), min confirmations {}",
            base_url,
            network,
            min_confirmations
        );
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            network: network.to_string(),
            min_confirmations,
        })
    }

    fn tx_url(&self, txid: &str) -> String {
        format!("{}/{}/tx/hash/{}", self.base_url, self.network, txid)
    }
}

#[async_trait]
impl TxConfirmer for WhatsOnChainConfirmer {
    fn name(&self) -> &'static str {
        "whatsonchain"
    }

    async fn confirm(&self, txid: &str, expected: &[ExpectedOutput]) -> Result<bool> {
        // Only a full txid can name a transaction on chain
        if txid.len() != TXID_HEX_LEN || !txid.bytes().all(|b| b.is_ascii_hexdigit()) {
            log::info!("[confirm] {:?} is not a full transaction id", txid);
            return Ok(false);
        }

        let response = self
            .client
            .get(self.tx_url(txid))
            .send()
            .await
            .map_err(|e| PaywallError::Confirmation(format!("request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            log::info!("[confirm] Transaction {} not found", txid);
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(PaywallError::Confirmation(format!(
                "lookup of {} returned {}",
                txid,
                response.status()
            )));
        }

        let tx: WocTransaction = response
            .json()
            .await
            .map_err(|e| PaywallError::Confirmation(format!("bad transaction JSON: {}", e)))?;

        let ok = transaction_satisfies(&tx, expected, self.min_confirmations);
        if !ok {
            log::info!(
                "[confirm] Transaction {} lacks the payment output or confirmations ({:?})",
                txid,
                tx.confirmations
            );
        }
        Ok(ok)
    }
}
