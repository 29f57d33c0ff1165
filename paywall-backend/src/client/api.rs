//! Typed client for the paywall HTTP API.

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::auth_fetch::{AuthFetchAdapter, FetchRequest};
use super::error::ClientError;
use super::payment::PaymentConstructor;
use crate::models::{ArticleContent, ArticleSummary, Purchase, VerifyPurchaseResponse};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Turn a non-success body into an `Api` error, preferring `message` over `error`.
fn api_error(status: u16, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| match (b.error, b.message) {
            (Some(error), Some(message)) => Some(format!("{} ({})", error, message)),
            (error, message) => message.or(error),
        })
        .unwrap_or_else(|| body.to_string());
    ClientError::Api { status, message }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Result of a complete purchase.
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub txid: String,
    pub content: ArticleContent,
}

pub struct PaywallClient {
    http: Client,
    base_url: Url,
}

impl PaywallClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Decode(format!("invalid API url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Decode(format!("invalid API url '{}'", base_url)));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base_url })
    }

    /// The HTTP client, for building auth channels against the same API.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// `<base>/api/protected/<segments...>`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Decode(format!("invalid API url '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "protected"])
            .extend(segments);
        Ok(url)
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(api_error(status, &body));
        }
        decode(&body)
    }

    pub async fn list_articles(&self) -> Result<Vec<ArticleSummary>, ClientError> {
        Self::read(self.http.get(self.url(&["articles"])?).send().await?).await
    }

    /// Articles with `is_purchased` set from the identity's purchase history.
    pub async fn list_articles_for(&self, identity: &str) -> Result<Vec<ArticleSummary>, ClientError> {
        let mut articles = self.list_articles().await?;
        let purchases = self.purchases(identity).await?;
        for article in &mut articles {
            article.is_purchased = purchases.iter().any(|p| p.article_id == article.id);
        }
        Ok(articles)
    }

    pub async fn get_article(&self, id: &str) -> Result<ArticleSummary, ClientError> {
        let url = self.url(&["articles", id])?;
        Self::read(self.http.get(url).send().await?).await
    }

    pub async fn article_info(&self, id: &str) -> Result<serde_json::Value, ClientError> {
        let url = self.url(&["articles", id, "info"])?;
        Self::read(self.http.get(url).send().await?).await
    }

    pub async fn verify_purchase(
        &self,
        article_id: &str,
        txid: &str,
        buyer_identity: &str,
        satoshis_paid: u64,
    ) -> Result<VerifyPurchaseResponse, ClientError> {
        let url = self.url(&["articles", article_id, "verify-purchase"])?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({
                "txid": txid,
                "walletAddress": buyer_identity,
                "satoshisPaid": satoshis_paid,
            }))
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn purchases(&self, identity: &str) -> Result<Vec<Purchase>, ClientError> {
        let url = self.url(&["articles", "purchases", identity])?;
        Self::read(self.http.get(url).send().await?).await
    }

    /// Fetch full content through whichever auth channel the adapter selects.
    pub async fn fetch_content(
        &self,
        auth: &AuthFetchAdapter,
        article_id: &str,
        html: bool,
    ) -> Result<ArticleContent, ClientError> {
        let mut url = self.url(&["articles", article_id, "content"])?;
        if html {
            url.query_pairs_mut().append_pair("format", "html");
        }
        let response = auth.fetch(&FetchRequest::get(url)).await?;
        if !response.is_success() {
            return Err(api_error(response.status, &response.body));
        }
        decode(&response.body)
    }

    /// Pay for an article, record the purchase and fetch its content.
    ///
    /// The buyer identity recorded with the server is the one the selected
    /// auth channel presents, so the later content request matches it.
    pub async fn unlock(
        &self,
        auth: &AuthFetchAdapter,
        payments: &PaymentConstructor,
        article_id: &str,
    ) -> Result<UnlockOutcome, ClientError> {
        let buyer = auth.identity()?;
        let article = self.get_article(article_id).await?;
        let txid = payments.pay(&article).await?;

        let receipt = self
            .verify_purchase(&article.id, &txid, &buyer, article.price)
            .await?;
        log::info!("[client] {}", receipt.message);

        let content = self.fetch_content(auth, &article.id, false).await?;
        Ok(UnlockOutcome { txid, content })
    }
}
