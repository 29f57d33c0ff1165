//! Signed-request handshake ("strong" authentication).
//!
//! A client proves control of a secp256k1 identity key by fetching a nonce
//! from `/.well-known/auth/nonce` and signing a canonical description of the
//! request with it. The server checks the clock window, the signature and
//! then burns the nonce, so a captured request cannot be replayed.

pub mod nonce;
pub mod signer;

use actix_web::HttpRequest;
use ethers::core::k256::ecdsa::signature::Verifier;
use ethers::core::k256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use nonce::{IssuedNonce, NonceStore};
pub use signer::{LocalKeySigner, RequestSigner};

pub const AUTH_VERSION: &str = "0.1";

pub const HEADER_VERSION: &str = "x-paywall-auth-version";
pub const HEADER_IDENTITY_KEY: &str = "x-paywall-identity-key";
pub const HEADER_NONCE: &str = "x-paywall-nonce";
pub const HEADER_TIMESTAMP: &str = "x-paywall-timestamp";
pub const HEADER_SIGNATURE: &str = "x-paywall-signature";

/// Why a signed request was not accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("unsupported auth version '{0}'")]
    UnsupportedVersion(String),
    #[error("invalid identity key")]
    InvalidIdentityKey,
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("timestamp outside the allowed clock skew")]
    ClockSkew,
    #[error("invalid signature encoding")]
    MalformedSignature,
    #[error("signature does not match")]
    BadSignature,
    #[error("nonce unknown, expired or issued to another key")]
    UnknownNonce,
}

/// The string both sides sign:
/// `version\nMETHOD\npath?query\ntimestamp\nnonce\nhex(sha256(body))`.
pub fn canonical_message(
    method: &str,
    path_and_query: &str,
    timestamp: i64,
    nonce: &str,
    body: &[u8],
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        AUTH_VERSION,
        method.to_uppercase(),
        path_and_query,
        timestamp,
        nonce,
        hex::encode(Sha256::digest(body))
    )
}

/// Parse a hex SEC1 public key, returning its canonical compressed hex form.
pub fn parse_identity_key(raw: &str) -> Result<(VerifyingKey, String), AuthRejection> {
    let bytes = hex::decode(raw.trim()).map_err(|_| AuthRejection::InvalidIdentityKey)?;
    let key = VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| AuthRejection::InvalidIdentityKey)?;
    let compressed = hex::encode(key.to_encoded_point(true).as_bytes());
    Ok((key, compressed))
}

fn header<'a>(req: &'a HttpRequest, name: &'static str) -> Result<&'a str, AuthRejection> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .ok_or(AuthRejection::MissingHeader(name))
}

/// Check the handshake headers of a request.
///
/// Returns `Ok(None)` when the request carries no identity header at all,
/// `Ok(Some(identity_key))` when the signature checks out and the nonce was
/// consumed.
pub fn authenticate(
    req: &HttpRequest,
    body: &[u8],
    nonces: &NonceStore,
    max_clock_skew_secs: i64,
    now: i64,
) -> Result<Option<String>, AuthRejection> {
    if req.headers().get(HEADER_IDENTITY_KEY).is_none() {
        return Ok(None);
    }

    let version = header(req, HEADER_VERSION)?;
    if version != AUTH_VERSION {
        return Err(AuthRejection::UnsupportedVersion(version.to_string()));
    }

    let (key, identity_key) = parse_identity_key(header(req, HEADER_IDENTITY_KEY)?)?;
    let nonce = header(req, HEADER_NONCE)?;
    let timestamp: i64 = header(req, HEADER_TIMESTAMP)?
        .parse()
        .map_err(|_| AuthRejection::InvalidTimestamp)?;
    if (now - timestamp).abs() > max_clock_skew_secs {
        return Err(AuthRejection::ClockSkew);
    }

    let signature_bytes =
        hex::decode(header(req, HEADER_SIGNATURE)?).map_err(|_| AuthRejection::MalformedSignature)?;
    let signature =
        Signature::from_der(&signature_bytes).map_err(|_| AuthRejection::MalformedSignature)?;

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.path());
    let message = canonical_message(req.method().as_str(), path_and_query, timestamp, nonce, body);
    key.verify(message.as_bytes(), &signature)
        .map_err(|_| AuthRejection::BadSignature)?;

    // Burn the nonce only once the signature is known good
    if !nonces.consume(nonce, &identity_key) {
        return Err(AuthRejection::UnknownNonce);
    }

    Ok(Some(identity_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    const NOW: i64 = 1_700_000_000;

    async fn signed_request(
        signer: &LocalKeySigner,
        nonce: &str,
        timestamp: i64,
        uri: &str,
    ) -> TestRequest {
        let message = canonical_message("GET", uri, timestamp, nonce, b"");
        let signature = signer.sign(message.as_bytes()).await.unwrap();
        TestRequest::get()
            .uri(uri)
            .insert_header((HEADER_VERSION, AUTH_VERSION))
            .insert_header((HEADER_IDENTITY_KEY, signer.identity_key()))
            .insert_header((HEADER_NONCE, nonce))
            .insert_header((HEADER_TIMESTAMP, timestamp.to_string()))
            .insert_header((HEADER_SIGNATURE, hex::encode(signature)))
    }

    #[test]
    fn test_canonical_message_layout() {
        let message = canonical_message("get", "/a?b=1", 5, "n", b"");
        assert_eq!(
            message,
            "0.1\nGET\n/a?b=1\n5\nn\ne3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_requests_without_identity_are_anonymous() {
        let nonces = NonceStore::new(60);
        let req = TestRequest::get().uri("/x").to_http_request();
        assert_eq!(authenticate(&req, b"", &nonces, 300, NOW), Ok(None));
    }

    #[actix_web::test]
    async fn test_valid_signature_consumes_nonce() {
        let signer = LocalKeySigner::random();
        let nonces = NonceStore::new(60);
        let issued = nonces.issue(&signer.identity_key());

        let req = signed_request(&signer, &issued.nonce, NOW, "/api/protected/articles/1/content?format=html")
            .await
            .to_http_request();
        assert_eq!(
            authenticate(&req, b"", &nonces, 300, NOW),
            Ok(Some(signer.identity_key()))
        );

        // Replaying the same request fails
        assert_eq!(
            authenticate(&req, b"", &nonces, 300, NOW),
            Err(AuthRejection::UnknownNonce)
        );
    }

    #[actix_web::test]
    async fn test_rejections() {
        let signer = LocalKeySigner::random();
        let other = LocalKeySigner::random();
        let nonces = NonceStore::new(60);

        // Clock skew
        let issued = nonces.issue(&signer.identity_key());
        let req = signed_request(&signer, &issued.nonce, NOW - 301, "/c").await.to_http_request();
        assert_eq!(authenticate(&req, b"", &nonces, 300, NOW), Err(AuthRejection::ClockSkew));

        // Signature over a different path
        let req = signed_request(&signer, &issued.nonce, NOW, "/c")
            .await
            .uri("/d")
            .to_http_request();
        assert_eq!(authenticate(&req, b"", &nonces, 300, NOW), Err(AuthRejection::BadSignature));

        // Nonce issued to another key
        let foreign = nonces.issue(&other.identity_key());
        let req = signed_request(&signer, &foreign.nonce, NOW, "/c").await.to_http_request();
        assert_eq!(authenticate(&req, b"", &nonces, 300, NOW), Err(AuthRejection::UnknownNonce));

        // Never issued
        let req = signed_request(&signer, "made-up", NOW, "/c").await.to_http_request();
        assert_eq!(authenticate(&req, b"", &nonces, 300, NOW), Err(AuthRejection::UnknownNonce));
    }

    #[actix_web::test]
    async fn test_expired_nonce_with_fresh_timestamp_rejected() {
        let signer = LocalKeySigner::random();
        let nonces = NonceStore::new(1);
        let issued = nonces.issue(&signer.identity_key());
        std::thread::sleep(std::time::Duration::from_millis(1100));

        let now = chrono::Utc::now().timestamp();
        let req = signed_request(&signer, &issued.nonce, now, "/c").await.to_http_request();
        assert_eq!(
            authenticate(&req, b"", &nonces, 300, now),
            Err(AuthRejection::UnknownNonce)
        );
    }

    #[test]
    fn test_parse_identity_key_normalizes_to_compressed() {
        let signer = LocalKeySigner::random();
        let (key, compressed) = parse_identity_key(&signer.identity_key()).unwrap();
        assert_eq!(compressed, signer.identity_key());
        let uncompressed = hex::encode(key.to_encoded_point(false).as_bytes());
        assert_eq!(parse_identity_key(&uncompressed).unwrap().1, compressed);
        assert_eq!(parse_identity_key("zz").unwrap_err(), AuthRejection::InvalidIdentityKey);
    }
}
