//! Wallet agents: whatever holds the buyer's keys and funds.
//!
//! The HTTP agent speaks the BRC-100 JSON substrate exposed by desktop
//! wallets on `localhost:3321`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::ClientError;
use crate::auth::RequestSigner;

pub const DEFAULT_WALLET_URL: &str = "http://localhost:3321";
const ORIGINATOR_HEADER: &str = "Originator";
const WALLET_TIMEOUT_SECS: u64 = 120;

/// One output of a requested transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutput {
    /// Hex-encoded locking script
    pub locking_script: String,
    pub satoshis: u64,
    pub output_description: String,
}

/// A transaction the wallet should fund, sign and broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub description: String,
    pub outputs: Vec<ActionOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub txid: Option<String>,
}

#[async_trait]
pub trait WalletAgent: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    async fn is_authenticated(&self) -> Result<bool, ClientError>;

    /// Compressed identity public key, hex
    async fn identity_key(&self) -> Result<String, ClientError>;

    async fn create_action(&self, request: &ActionRequest) -> Result<ActionResult, ClientError>;

    /// Signed-request capability of this wallet, when it has one.
    fn request_signer(&self) -> Option<Arc<dyn RequestSigner>> {
        None
    }
}

#[derive(Deserialize)]
struct AuthenticatedResponse {
    authenticated: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

#[derive(Deserialize)]
struct WalletErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Wallet reached over HTTP.
pub struct HttpWalletAgent {
    client: Client,
    base_url: String,
    originator: String,
}

impl HttpWalletAgent {
    pub fn new(base_url: &str, originator: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(WALLET_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            originator: originator.to_string(),
        })
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        R: for<'de> Deserialize<'de> + Send,
    {
        let url = format!("{}/{}", self.base_url, method);
        log::debug!("[client] wallet call {}", url);

        let response = self
            .client
            .post(&url)
            .header(ORIGINATOR_HEADER, &self.originator)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ClientError::WalletUnavailable(format!("{} ({})", self.base_url, e))
                } else {
                    ClientError::Http(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<WalletErrorBody>(&text)
                .ok()
                .and_then(|b| b.message.or(b.description))
                .unwrap_or(text);
            return Err(ClientError::Wallet(format!("{} failed ({}): {}", method, status, message)));
        }

        serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("{} response: {}", method, e)))
    }
}

#[async_trait]
impl WalletAgent for HttpWalletAgent {
    fn name(&self) -> &'static str {
        "http-wallet"
    }

    async fn is_authenticated(&self) -> Result<bool, ClientError> {
        let response: AuthenticatedResponse =
            self.call("isAuthenticated", &serde_json::json!({})).await?;
        Ok(response.authenticated)
    }

    async fn identity_key(&self) -> Result<String, ClientError> {
        let response: PublicKeyResponse = self
            .call("getPublicKey", &serde_json::json!({ "identityKey": true }))
            .await?;
        Ok(response.public_key)
    }

    async fn create_action(&self, request: &ActionRequest) -> Result<ActionResult, ClientError> {
        self.call("createAction", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_request_wire_format() {
        let request = ActionRequest {
            description: "Unlock article: T".to_string(),
            outputs: vec![ActionOutput {
                locking_script: "76a9".to_string(),
                satoshis: 100,
                output_description: "Article payment to A".to_string(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["outputs"][0]["lockingScript"], "76a9");
        assert_eq!(json["outputs"][0]["outputDescription"], "Article payment to A");
        assert_eq!(json["outputs"][0]["satoshis"], 100);
    }

    #[test]
    fn test_action_result_without_txid() {
        let result: ActionResult = serde_json::from_str("{}").unwrap();
        assert!(result.txid.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_wallet_is_unavailable() {
        // Port 9 (discard) is closed on test machines
        let agent = HttpWalletAgent::new("http://127.0.0.1:9", "test").unwrap();
        assert!(matches!(
            agent.is_authenticated().await,
            Err(ClientError::WalletUnavailable(_))
        ));
    }
}
