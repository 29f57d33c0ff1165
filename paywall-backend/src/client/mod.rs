//! Reader-side library: wallet connection, payment construction and
//! authenticated content retrieval.

pub mod api;
pub mod auth_fetch;
pub mod error;
pub mod payment;
pub mod session;
pub mod wallet;

pub use api::{PaywallClient, UnlockOutcome};
pub use auth_fetch::{
    AuthChannel, AuthFetchAdapter, FetchRequest, FetchResponse, SignedFetchChannel,
    TrustFallbackChannel,
};
pub use error::ClientError;
pub use payment::PaymentConstructor;
pub use session::{FileSessionStore, SessionStore, WalletSession};
pub use wallet::{ActionOutput, ActionRequest, ActionResult, HttpWalletAgent, WalletAgent};
