//! Paywall reader CLI
//!
//! Connects a wallet, buys articles and reads them from the terminal.
//!
//! ## Usage
//!
//!   paywall-reader connect
//!   paywall-reader list
//!   paywall-reader show <id>
//!   paywall-reader unlock <id>
//!   paywall-reader read <id> [--html]
//!   paywall-reader purchases
//!   paywall-reader disconnect
//!
//! ## Environment variables
//!
//!   PAYWALL_API_URL          - Paywall server (default: http://localhost:3001)
//!   PAYWALL_WALLET_URL       - BRC-100 wallet endpoint (default: http://localhost:3321)
//!   PAYWALL_IDENTITY_KEY     - Hex private key used to sign content requests (optional)
//!   PAYWALL_SESSION_PATH     - Session file (default: ~/.paywall-reader/session.json)
//!   PAYWALL_FALLBACK_ADDRESS - Address for trust-based reads when no signer is available

use chrono::Utc;
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use paywall_backend::auth::{LocalKeySigner, RequestSigner};
use paywall_backend::client::session::{self, FileSessionStore, WalletSession};
use paywall_backend::client::wallet::DEFAULT_WALLET_URL;
use paywall_backend::client::{
    AuthFetchAdapter, ClientError, HttpWalletAgent, PaymentConstructor, PaywallClient,
    WalletAgent,
};

const ORIGINATOR: &str = "paywall-reader";

// ── Config ──────────────────────────────────────────────────────────────

struct ReaderConfig {
    api_url: String,
    wallet_url: String,
    identity_key: Option<String>,
    session_path: PathBuf,
    fallback_address: Option<String>,
}

impl ReaderConfig {
    fn from_env() -> Self {
        let session_path = env::var("PAYWALL_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".paywall-reader").join("session.json")
            });
        Self {
            api_url: env::var("PAYWALL_API_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            wallet_url: env::var("PAYWALL_WALLET_URL")
                .unwrap_or_else(|_| DEFAULT_WALLET_URL.to_string()),
            identity_key: env::var("PAYWALL_IDENTITY_KEY").ok().filter(|k| !k.trim().is_empty()),
            session_path,
            fallback_address: env::var("PAYWALL_FALLBACK_ADDRESS")
                .ok()
                .filter(|a| !a.trim().is_empty()),
        }
    }
}

struct Reader {
    config: ReaderConfig,
    api: PaywallClient,
    wallet: Arc<HttpWalletAgent>,
    store: FileSessionStore,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl Reader {
    fn new(config: ReaderConfig) -> Result<Self, ClientError> {
        let api = PaywallClient::new(&config.api_url)?;
        let wallet = Arc::new(HttpWalletAgent::new(&config.wallet_url, ORIGINATOR)?);
        let store = FileSessionStore::new(config.session_path.clone());
        let signer = match &config.identity_key {
            Some(key) => {
                let signer = LocalKeySigner::from_hex(key).map_err(ClientError::Signing)?;
                Some(Arc::new(signer) as Arc<dyn RequestSigner>)
            }
            None => None,
        };
        Ok(Self {
            config,
            api,
            wallet,
            store,
            signer,
        })
    }

    async fn session(&self) -> Result<Option<WalletSession>, ClientError> {
        session::restore_session(self.wallet.as_ref(), &self.store, Utc::now()).await
    }

    /// Adapter for content reads. The session's identity key is the stored
    /// value offered to the trust fallback, so purchases made with it match.
    fn auth(&self, session: Option<&WalletSession>) -> AuthFetchAdapter {
        AuthFetchAdapter::new(
            self.api.http().clone(),
            self.signer.clone(),
            Some(self.wallet.as_ref() as &dyn WalletAgent),
            self.config.fallback_address.clone(),
            session.map(|s| s.identity_key.clone()),
        )
    }

    async fn run(&self, command: &str, args: &[String]) -> Result<(), ClientError> {
        match command {
            "connect" => {
                let session = session::connect(self.wallet.as_ref(), &self.store, Utc::now()).await?;
                println!("Connected: {}", session.address);
                println!("Identity key: {}", session.identity_key);
                println!("Session valid until {}", session.expires_at());
            }
            "disconnect" => {
                session::disconnect(&self.store)?;
                println!("Disconnected");
            }
            "list" => {
                let session = self.session().await?;
                let identity = self.auth(session.as_ref()).identity().ok();
                let articles = match &identity {
                    Some(identity) => self.api.list_articles_for(identity).await?,
                    None => self.api.list_articles().await?,
                };
                for article in articles {
                    let marker = if article.is_purchased { "owned" } else { "locked" };
                    println!(
                        "[{}] {:>6} sats  {:<7} {} by {}",
                        article.id, article.price, marker, article.title, article.author
                    );
                }
            }
            "show" => {
                let id = required_arg(args, "show <id>")?;
                let article = self.api.get_article(id).await?;
                println!(
                    "{}\nby {} | {} | {} words | {} sats\n",
                    article.title, article.author, article.subject, article.word_count, article.price
                );
                println!("{}", article.preview);
            }
            "unlock" => {
                let id = required_arg(args, "unlock <id>")?;
                let session = self.session().await?;
                if session.is_none() && self.signer.is_none() {
                    return Err(ClientError::Session(
                        "no wallet session; run `paywall-reader connect` first".to_string(),
                    ));
                }
                let auth = self.auth(session.as_ref());
                let payments = PaymentConstructor::new(self.wallet.clone());
                let outcome = self.api.unlock(&auth, &payments, id).await?;
                println!("Unlocked with transaction {}\n", outcome.txid);
                println!("{}", outcome.content.full_content);
            }
            "read" => {
                let id = required_arg(args, "read <id> [--html]")?;
                let html = args.iter().any(|a| a == "--html");
                let session = self.session().await?;
                let content = self.api.fetch_content(&self.auth(session.as_ref()), id, html).await?;
                println!("{}\nby {} (txid {})\n", content.title, content.author, content.txid);
                match content.full_content_html {
                    Some(rendered) if html => println!("{}", rendered),
                    _ => println!("{}", content.full_content),
                }
            }
            "purchases" => {
                let session = self.session().await?;
                let identity = self.auth(session.as_ref()).identity()?;
                let purchases = self.api.purchases(&identity).await?;
                if purchases.is_empty() {
                    println!("No purchases for {}", identity);
                }
                for purchase in purchases {
                    println!(
                        "{}  article {}  {} sats  {}",
                        purchase.purchased_at.format("%Y-%m-%d %H:%M"),
                        purchase.article_id,
                        purchase.satoshis_paid,
                        purchase.txid
                    );
                }
            }
            other => {
                return Err(ClientError::Session(format!("unknown command '{}'", other)));
            }
        }
        Ok(())
    }
}

fn required_arg<'a>(args: &'a [String], usage: &str) -> Result<&'a str, ClientError> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| ClientError::Session(format!("usage: paywall-reader {}", usage)))
}

fn print_usage() {
    eprintln!("usage: paywall-reader <connect|disconnect|list|show|unlock|read|purchases> [args]");
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        std::process::exit(2);
    };

    let reader = match Reader::new(ReaderConfig::from_env()) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = reader.run(command, &args[1..]).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
