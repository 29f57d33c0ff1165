use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No wallet agent answered.
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Payment construction failed: {0}")]
    PaymentConstruction(String),

    #[error("No authentication channel available: no signing agent and no wallet address")]
    NoAuthChannelAvailable,

    /// The wallet answered with an error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    /// The paywall API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}
