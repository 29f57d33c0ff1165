//! Signing side of the handshake.

use async_trait::async_trait;
use ethers::core::k256::ecdsa::signature::Signer;
use ethers::core::k256::ecdsa::{Signature, SigningKey};

/// Something that can sign handshake messages for an identity key.
///
/// Implemented by the local key signer below and by wallet agents that
/// expose their own signing capability.
#[async_trait]
pub trait RequestSigner: Send + Sync {
    /// Compressed SEC1 public key, hex
    fn identity_key(&self) -> String;

    /// DER-encoded ECDSA/SHA-256 signature over `message`.
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String>;
}

/// Signs with a secp256k1 private key held in memory.
pub struct LocalKeySigner {
    key: SigningKey,
}

impl LocalKeySigner {
    /// Create a signer from a private key (hex string with or without 0x prefix)
    pub fn from_hex(private_key: &str) -> Result<Self, String> {
        let key_hex = private_key.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let key_bytes =
            hex::decode(key_hex).map_err(|e| format!("Invalid private key hex: {}", e))?;
        if key_bytes.len() != 32 {
            return Err(format!("Private key must be 32 bytes, got {}", key_bytes.len()));
        }
        let key = SigningKey::from_bytes(key_bytes.as_slice().into())
            .map_err(|e| format!("Invalid private key: {}", e))?;
        Ok(Self { key })
    }

    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Compressed public key bytes
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

#[async_trait]
impl RequestSigner for LocalKeySigner {
    fn identity_key(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let signature: Signature = self
            .key
            .try_sign(message)
            .map_err(|e| format!("Signing failed: {}", e))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}
