//! Authenticated fetch with an ordered list of auth channels.
//!
//! Channels are tried in priority order and the first one that is available
//! handles the request. A request never falls through to a second channel:
//! if the chosen channel fails, the error is returned as is.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use super::error::ClientError;
use super::wallet::WalletAgent;
use crate::auth::{self, RequestSigner};

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    /// Name of the channel that served the request
    pub channel: &'static str,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait AuthChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the channel proves identity cryptographically
    fn is_strong(&self) -> bool;

    /// The identity this channel presents, or None when it cannot be used.
    fn identity(&self) -> Option<String>;

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, ClientError>;
}

#[derive(Deserialize)]
struct NonceResponse {
    nonce: String,
}

/// Signs each request with the handshake headers.
pub struct SignedFetchChannel {
    name: &'static str,
    http: Client,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl SignedFetchChannel {
    pub fn new(name: &'static str, http: Client, signer: Option<Arc<dyn RequestSigner>>) -> Self {
        Self { name, http, signer }
    }

    async fn fetch_nonce(&self, url: &Url, identity_key: &str) -> Result<String, ClientError> {
        let mut nonce_url = url
            .join("/.well-known/auth/nonce")
            .map_err(|e| ClientError::Decode(format!("nonce url: {}", e)))?;
        nonce_url
            .query_pairs_mut()
            .append_pair("identityKey", identity_key);

        let response = self.http.get(nonce_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: "nonce request rejected".to_string(),
            });
        }
        let nonce: NonceResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("nonce response: {}", e)))?;
        Ok(nonce.nonce)
    }
}

#[async_trait]
impl AuthChannel for SignedFetchChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn identity(&self) -> Option<String> {
        self.signer.as_ref().map(|s| s.identity_key())
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, ClientError> {
        let signer = self.signer.as_ref().ok_or(ClientError::NoAuthChannelAvailable)?;
        let identity_key = signer.identity_key();
        let nonce = self.fetch_nonce(&request.url, &identity_key).await?;

        let body = match &request.body {
            Some(value) => serde_json::to_vec(value)
                .map_err(|e| ClientError::Decode(format!("request body: {}", e)))?,
            None => Vec::new(),
        };
        let path_and_query = match request.url.query() {
            Some(query) => format!("{}?{}", request.url.path(), query),
            None => request.url.path().to_string(),
        };
        let timestamp = Utc::now().timestamp();
        let message = auth::canonical_message(
            request.method.as_str(),
            &path_and_query,
            timestamp,
            &nonce,
            &body,
        );
        let signature = signer
            .sign(message.as_bytes())
            .await
            .map_err(ClientError::Signing)?;

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(auth::HEADER_VERSION, auth::AUTH_VERSION)
            .header(auth::HEADER_IDENTITY_KEY, &identity_key)
            .header(auth::HEADER_NONCE, &nonce)
            .header(auth::HEADER_TIMESTAMP, timestamp.to_string())
            .header(auth::HEADER_SIGNATURE, hex::encode(signature));
        if !body.is_empty() {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await?;
        Ok(FetchResponse {
            status: response.status().as_u16(),
            body: response.text().await?,
            channel: self.name,
        })
    }
}

/// Re-issues the request as a POST carrying an unproven wallet address.
pub struct TrustFallbackChannel {
    http: Client,
    address: Option<String>,
}

impl TrustFallbackChannel {
    pub fn new(http: Client, address: Option<String>) -> Self {
        let address = address.filter(|a| !a.trim().is_empty());
        Self { http, address }
    }
}

#[async_trait]
impl AuthChannel for TrustFallbackChannel {
    fn name(&self) -> &'static str {
        "trust-fallback"
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn identity(&self) -> Option<String> {
        self.address.clone()
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, ClientError> {
        let address = self.address.as_ref().ok_or(ClientError::NoAuthChannelAvailable)?;
        log::warn!(
            "[client] Signed requests unavailable, sending trust-based POST for {}",
            address
        );
        let response = self
            .http
            .post(request.url.clone())
            .json(&serde_json::json!({ "walletAddress": address }))
            .send()
            .await?;
        Ok(FetchResponse {
            status: response.status().as_u16(),
            body: response.text().await?,
            channel: self.name(),
        })
    }
}

pub struct AuthFetchAdapter {
    channels: Vec<Box<dyn AuthChannel>>,
}

impl AuthFetchAdapter {
    /// Standard channel order: installed signing agent, the wallet's own
    /// signing capability, then the trust fallback with the caller's address
    /// (or the stored one).
    pub fn new(
        http: Client,
        installed_signer: Option<Arc<dyn RequestSigner>>,
        wallet: Option<&dyn WalletAgent>,
        caller_address: Option<String>,
        stored_address: Option<String>,
    ) -> Self {
        let wallet_signer = wallet.and_then(|w| w.request_signer());
        let fallback_address = caller_address
            .filter(|a| !a.trim().is_empty())
            .or(stored_address);

        Self::from_channels(vec![
            Box::new(SignedFetchChannel::new("installed-agent", http.clone(), installed_signer)),
            Box::new(SignedFetchChannel::new("wallet-handle", http.clone(), wallet_signer)),
            Box::new(TrustFallbackChannel::new(http, fallback_address)),
        ])
    }

    pub fn from_channels(channels: Vec<Box<dyn AuthChannel>>) -> Self {
        Self { channels }
    }

    /// The first available channel.
    pub fn select(&self) -> Result<&dyn AuthChannel, ClientError> {
        self.channels
            .iter()
            .find(|c| c.identity().is_some())
            .map(|c| c.as_ref())
            .ok_or(ClientError::NoAuthChannelAvailable)
    }

    /// Identity the selected channel presents to the server.
    pub fn identity(&self) -> Result<String, ClientError> {
        self.select()?
            .identity()
            .ok_or(ClientError::NoAuthChannelAvailable)
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, ClientError> {
        let channel = self.select()?;
        log::debug!(
            "[client] {} {} via {} ({})",
            request.method,
            request.url,
            channel.name(),
            if channel.is_strong() { "signed" } else { "trust" }
        );
        channel.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LocalKeySigner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel {
        name: &'static str,
        strong: bool,
        identity: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AuthChannel for CountingChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_strong(&self) -> bool {
            self.strong
        }

        fn identity(&self) -> Option<String> {
            self.identity.clone()
        }

        async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResponse {
                status: 200,
                body: "{}".to_string(),
                channel: self.name,
            })
        }
    }

    fn channel(
        name: &'static str,
        strong: bool,
        identity: Option<&str>,
    ) -> (Box<dyn AuthChannel>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let channel = CountingChannel {
            name,
            strong,
            identity: identity.map(str::to_string),
            calls: calls.clone(),
        };
        (Box::new(channel), calls)
    }

    fn request() -> FetchRequest {
        FetchRequest::get(Url::parse("http://localhost:3001/api/protected/articles/1/content").unwrap())
    }

    #[tokio::test]
    async fn test_falls_back_to_weak_channel_without_touching_strong_ones() {
        let (installed, installed_calls) = channel("installed-agent", true, None);
        let (handle, handle_calls) = channel("wallet-handle", true, None);
        let (weak, weak_calls) = channel("trust-fallback", false, Some("W1"));
        let adapter = AuthFetchAdapter::from_channels(vec![installed, handle, weak]);

        let response = adapter.fetch(&request()).await.unwrap();
        assert_eq!(response.channel, "trust-fallback");
        assert_eq!(adapter.identity().unwrap(), "W1");
        assert_eq!(installed_calls.load(Ordering::SeqCst), 0);
        assert_eq!(handle_calls.load(Ordering::SeqCst), 0);
        assert_eq!(weak_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_available_channel_wins() {
        let (installed, installed_calls) = channel("installed-agent", true, Some("key"));
        let (weak, weak_calls) = channel("trust-fallback", false, Some("W1"));
        let adapter = AuthFetchAdapter::from_channels(vec![installed, weak]);

        assert_eq!(adapter.fetch(&request()).await.unwrap().channel, "installed-agent");
        assert_eq!(installed_calls.load(Ordering::SeqCst), 1);
        assert_eq!(weak_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nothing_available() {
        let adapter = AuthFetchAdapter::new(Client::new(), None, None, None, None);
        assert!(matches!(
            adapter.fetch(&request()).await,
            Err(ClientError::NoAuthChannelAvailable)
        ));
    }

    #[test]
    fn test_standard_order() {
        let signer: Arc<dyn RequestSigner> = Arc::new(LocalKeySigner::random());
        let key = signer.identity_key();

        let adapter = AuthFetchAdapter::new(Client::new(), Some(signer), None, Some("W1".into()), None);
        assert_eq!(adapter.select().unwrap().name(), "installed-agent");
        assert_eq!(adapter.identity().unwrap(), key);

        let adapter = AuthFetchAdapter::new(Client::new(), None, None, None, Some("stored".into()));
        assert_eq!(adapter.select().unwrap().name(), "trust-fallback");
        assert_eq!(adapter.identity().unwrap(), "stored");

        let adapter =
            AuthFetchAdapter::new(Client::new(), None, None, Some("caller".into()), Some("stored".into()));
        assert_eq!(adapter.identity().unwrap(), "caller");
    }
}
