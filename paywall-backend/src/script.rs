//! Bitcoin script helpers shared by the payment constructor and the
//! transaction confirmer.
//!
//! Only what an article purchase needs: P2PKH addresses and locking scripts,
//! and the `OP_FALSE OP_RETURN` metadata output tagging the purchase.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Protocol marker pushed first in the metadata output
pub const ARTICLE_UNLOCK_PROTOCOL: &str = "article-unlock";

/// Total coin supply in satoshis; no price or payment can exceed it.
pub const MAX_SATOSHIS: u64 = 21_000_000 * 100_000_000;

const OP_FALSE: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_RETURN: u8 = 0x6a;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("unsupported address version byte 0x{0:02x}")]
    UnsupportedAddressVersion(u8),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Main,
    Test,
}

impl Network {
    fn p2pkh_version(self) -> u8 {
        match self {
            Self::Main => 0x00,
            Self::Test => 0x6f,
        }
    }

    fn from_p2pkh_version(version: u8) -> Result<Self, ScriptError> {
        match version {
            0x00 => Ok(Self::Main),
            0x6f => Ok(Self::Test),
            other => Err(ScriptError::UnsupportedAddressVersion(other)),
        }
    }
}

/// An output a purchase transaction must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOutput {
    pub locking_script: Vec<u8>,
    pub satoshis: u64,
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// Decode a base58check P2PKH address into its network and pubkey hash.
pub fn decode_p2pkh_address(address: &str) -> Result<(Network, [u8; 20]), ScriptError> {
    let address = address.trim();
    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|_| ScriptError::InvalidAddress(address.to_string()))?;

    if payload.len() != 21 {
        return Err(ScriptError::InvalidAddress(address.to_string()));
    }

    let network = Network::from_p2pkh_version(payload[0])?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    Ok((network, hash))
}

/// Derive the P2PKH address of a SEC1-encoded public key.
pub fn address_from_public_key(public_key: &[u8], network: Network) -> Result<String, ScriptError> {
    let valid_prefix = match public_key.len() {
        33 => public_key[0] == 0x02 || public_key[0] == 0x03,
        65 => public_key[0] == 0x04,
        _ => false,
    };
    if !valid_prefix {
        return Err(ScriptError::InvalidPublicKey(format!(
            "expected SEC1 encoding, got {} bytes",
            public_key.len()
        )));
    }

    let mut payload = Vec::with_capacity(21);
    payload.push(network.p2pkh_version());
    payload.extend_from_slice(&hash160(public_key));
    Ok(bs58::encode(payload).with_check().into_string())
}

/// `OP_DUP OP_HASH160 <hash160> OP_EQUALVERIFY OP_CHECKSIG` for an address.
pub fn p2pkh_locking_script(address: &str) -> Result<Vec<u8>, ScriptError> {
    let (_, hash) = decode_p2pkh_address(address)?;
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, &hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    Ok(script)
}

/// Append a minimal data push.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len == 0 {
        script.push(OP_FALSE);
        return;
    }
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= u8::MAX as usize {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= u16::MAX as usize {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Zero-value metadata output: protocol marker, article id, title, price.
pub fn article_metadata_script(article_id: &str, title: &str, price: u64) -> Vec<u8> {
    let mut script = vec![OP_FALSE, OP_RETURN];
    push_data(&mut script, ARTICLE_UNLOCK_PROTOCOL.as_bytes());
    push_data(&mut script, article_id.as_bytes());
    push_data(&mut script, title.as_bytes());
    push_data(&mut script, price.to_string().as_bytes());
    script
}

/// The payment output an article purchase must carry.
pub fn expected_payment_output(
    author_payment_address: &str,
    price: u64,
) -> Result<ExpectedOutput, ScriptError> {
    Ok(ExpectedOutput {
        locking_script: p2pkh_locking_script(author_payment_address)?,
        satoshis: price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compressed encoding of the secp256k1 generator (private key 1)
    const GENERATOR_PUBKEY: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const GENERATOR_ADDRESS: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";
    const GENERATOR_HASH160: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    #[test]
    fn test_hash160_and_address_of_known_key() {
        let pubkey = hex::decode(GENERATOR_PUBKEY).unwrap();
        assert_eq!(hex::encode(hash160(&pubkey)), GENERATOR_HASH160);
        assert_eq!(
            address_from_public_key(&pubkey, Network::Main).unwrap(),
            GENERATOR_ADDRESS
        );
    }

    #[test]
    fn test_p2pkh_locking_script() {
        let script = p2pkh_locking_script(GENERATOR_ADDRESS).unwrap();
        assert_eq!(
            hex::encode(script),
            format!("76a914{}88ac", GENERATOR_HASH160)
        );

        let genesis = p2pkh_locking_script("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        assert_eq!(
            hex::encode(genesis),
            "76a91462e907b15cbf27d5425399ebf6f0fb50ebb88f1888ac"
        );
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        // Flipped last character breaks the checksum
        assert!(p2pkh_locking_script("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMJ").is_err());
        assert!(p2pkh_locking_script("not-an-address").is_err());
        assert!(p2pkh_locking_script("").is_err());
    }

    #[test]
    fn test_address_rejects_bad_public_key() {
        assert!(address_from_public_key(&[0x05; 33], Network::Main).is_err());
        assert!(address_from_public_key(&[0x02; 20], Network::Main).is_err());
    }

    #[test]
    fn test_metadata_script_layout() {
        let script = article_metadata_script("1", "T", 100);
        assert_eq!(
            hex::encode(script),
            format!("006a0e{}0131015403313030", hex::encode("article-unlock"))
        );
    }

    #[test]
    fn test_push_data_length_prefixes() {
        let mut script = Vec::new();
        push_data(&mut script, &[0xaa; 75]);
        assert_eq!(script[0], 75);

        let mut script = Vec::new();
        push_data(&mut script, &[0xaa; 76]);
        assert_eq!(&script[..2], &[OP_PUSHDATA1, 76]);

        let mut script = Vec::new();
        push_data(&mut script, &[0xaa; 300]);
        assert_eq!(&script[..3], &[OP_PUSHDATA2, 0x2c, 0x01]);
        assert_eq!(script.len(), 303);
    }
}
