//! Purchase verification: claimed payments in, recorded purchases out.

pub mod confirm;
pub mod verifier;

pub use confirm::{TrustOnWrite, TxConfirmer, WhatsOnChainConfirmer};
pub use verifier::{PurchaseClaim, PurchaseVerifier};
