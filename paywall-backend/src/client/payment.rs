//! Builds and submits article payments.

use std::sync::Arc;

use super::error::ClientError;
use super::wallet::{ActionOutput, ActionRequest, WalletAgent};
use crate::models::ArticleSummary;
use crate::script;

pub struct PaymentConstructor {
    wallet: Arc<dyn WalletAgent>,
}

impl PaymentConstructor {
    pub fn new(wallet: Arc<dyn WalletAgent>) -> Self {
        Self { wallet }
    }

    /// Two outputs: the price to the author, then the zero-value metadata tag.
    pub fn build_action(article: &ArticleSummary) -> Result<ActionRequest, ClientError> {
        let payment_script = script::p2pkh_locking_script(&article.author_payment_address)
            .map_err(|e| ClientError::PaymentConstruction(e.to_string()))?;
        let metadata_script = script::article_metadata_script(&article.id, &article.title, article.price);

        Ok(ActionRequest {
            description: format!("Unlock article: {}", article.title),
            outputs: vec![
                ActionOutput {
                    locking_script: hex::encode(payment_script),
                    satoshis: article.price,
                    output_description: format!("Article payment to {}", article.author),
                },
                ActionOutput {
                    locking_script: hex::encode(metadata_script),
                    satoshis: 0,
                    output_description: format!("Article unlock metadata for \"{}\"", article.title),
                },
            ],
        })
    }

    /// Have the wallet fund and broadcast the payment. Returns the txid.
    pub async fn pay(&self, article: &ArticleSummary) -> Result<String, ClientError> {
        let action = Self::build_action(article)?;
        log::info!(
            "[client] Paying {} sats for article {} to {}",
            article.price,
            article.id,
            article.author_payment_address
        );

        let result = self.wallet.create_action(&action).await?;
        result
            .txid
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ClientError::PaymentConstruction(
                    "transaction was created but no txid was returned".to_string(),
                )
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::RequestSigner;
    use crate::client::wallet::ActionResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scriptable wallet used across the client tests.
    pub(crate) struct MockWallet {
        pub identity_key: String,
        pub authenticated: bool,
        pub txid: Option<String>,
        pub signer: Option<Arc<dyn RequestSigner>>,
        pub actions: Mutex<Vec<ActionRequest>>,
    }

    impl MockWallet {
        pub(crate) fn new(identity_key: &str, txid: Option<&str>) -> Self {
            Self {
                identity_key: identity_key.to_string(),
                authenticated: true,
                txid: txid.map(str::to_string),
                signer: None,
                actions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WalletAgent for MockWallet {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn is_authenticated(&self) -> Result<bool, ClientError> {
            Ok(self.authenticated)
        }

        async fn identity_key(&self) -> Result<String, ClientError> {
            Ok(self.identity_key.clone())
        }

        async fn create_action(&self, request: &ActionRequest) -> Result<ActionResult, ClientError> {
            self.actions.lock().unwrap().push(request.clone());
            Ok(ActionResult {
                txid: self.txid.clone(),
            })
        }

        fn request_signer(&self) -> Option<Arc<dyn RequestSigner>> {
            self.signer.clone()
        }
    }

    fn article() -> ArticleSummary {
        ArticleSummary {
            id: "1".to_string(),
            title: "T".to_string(),
            author: "A".to_string(),
            subject: "S".to_string(),
            word_count: 10,
            price: 100,
            preview: "p".to_string(),
            author_payment_address: "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string(),
            is_purchased: false,
        }
    }

    #[test]
    fn test_build_action_outputs() {
        let action = PaymentConstructor::build_action(&article()).unwrap();
        assert_eq!(action.outputs.len(), 2);

        let payment = &action.outputs[0];
        assert_eq!(payment.satoshis, 100);
        assert_eq!(
            payment.locking_script,
            "76a91462e907b15cbf27d5425399ebf6f0fb50ebb88f1888ac"
        );

        let metadata = &action.outputs[1];
        assert_eq!(metadata.satoshis, 0);
        assert_eq!(
            metadata.locking_script,
            format!("006a0e{}0131015403313030", hex::encode("article-unlock"))
        );
    }

    #[test]
    fn test_bad_address_is_construction_error() {
        let mut bad = article();
        bad.author_payment_address = "nope".to_string();
        assert!(matches!(
            PaymentConstructor::build_action(&bad),
            Err(ClientError::PaymentConstruction(_))
        ));
    }

    #[tokio::test]
    async fn test_pay_returns_txid() {
        let wallet = Arc::new(MockWallet::new("key", Some("abc")));
        let payments = PaymentConstructor::new(wallet.clone());
        assert_eq!(payments.pay(&article()).await.unwrap(), "abc");
        assert_eq!(wallet.actions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pay_without_txid_fails() {
        let payments = PaymentConstructor::new(Arc::new(MockWallet::new("key", None)));
        assert!(matches!(
            payments.pay(&article()).await,
            Err(ClientError::PaymentConstruction(_))
        ));
    }
}
