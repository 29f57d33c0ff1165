//! Wallet session persisted between reader invocations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ClientError;
use super::wallet::WalletAgent;
use crate::script::{self, Network};

/// Sessions older than this must reconnect.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub identity_key: String,
    /// P2PKH address derived from the identity key, for display
    pub address: String,
    pub issued_at: DateTime<Utc>,
    pub ttl_secs: i64,
}

impl WalletSession {
    pub fn new(identity_key: String, address: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            identity_key,
            address,
            issued_at,
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.ttl_secs)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<WalletSession>, ClientError>;
    fn save(&self, session: &WalletSession) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Session kept as a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<WalletSession>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::Session(format!("{}: {}", self.path.display(), e))),
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                log::warn!("[client] Discarding unreadable session file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, session: &WalletSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ClientError::Session(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Session(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| ClientError::Session(format!("{}: {}", self.path.display(), e)))
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Session(format!("{}: {}", self.path.display(), e))),
        }
    }
}

/// Connect to the wallet and persist a fresh session.
pub async fn connect(
    wallet: &dyn WalletAgent,
    store: &dyn SessionStore,
    now: DateTime<Utc>,
) -> Result<WalletSession, ClientError> {
    if !wallet.is_authenticated().await? {
        return Err(ClientError::WalletUnavailable(format!(
            "{} is not authenticated; unlock the wallet and retry",
            wallet.name()
        )));
    }

    let identity_key = wallet.identity_key().await?;
    let key_bytes = hex::decode(&identity_key)
        .map_err(|e| ClientError::Wallet(format!("identity key is not hex: {}", e)))?;
    let address = script::address_from_public_key(&key_bytes, Network::Main)
        .map_err(|e| ClientError::Wallet(e.to_string()))?;

    let session = WalletSession::new(identity_key, address, now);
    store.save(&session)?;
    log::info!("[client] Connected wallet {} ({})", session.address, wallet.name());
    Ok(session)
}

pub fn disconnect(store: &dyn SessionStore) -> Result<(), ClientError> {
    store.clear()?;
    log::info!("[client] Wallet session cleared");
    Ok(())
}

/// Load the stored session if it is still valid for the connected wallet.
///
/// Expired sessions, a locked or unreachable wallet and a wallet now holding
/// a different identity all clear the stored session.
pub async fn restore_session(
    wallet: &dyn WalletAgent,
    store: &dyn SessionStore,
    now: DateTime<Utc>,
) -> Result<Option<WalletSession>, ClientError> {
    let Some(session) = store.load()? else {
        return Ok(None);
    };

    if session.is_expired(now) {
        log::info!("[client] Session expired at {}", session.expires_at());
        store.clear()?;
        return Ok(None);
    }

    let current_key = match wallet.is_authenticated().await {
        Ok(true) => wallet.identity_key().await,
        Ok(false) => Err(ClientError::WalletUnavailable("wallet is locked".to_string())),
        Err(e) => Err(e),
    };

    match current_key {
        Ok(key) if key == session.identity_key => Ok(Some(session)),
        Ok(_) => {
            log::warn!("[client] Wallet identity changed since the session was created");
            store.clear()?;
            Ok(None)
        }
        Err(e) => {
            log::warn!("[client] Could not confirm wallet identity: {}", e);
            store.clear()?;
            Ok(None)
        }
    }
}
