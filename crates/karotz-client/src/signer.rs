use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::config::Credentials;
use crate::error::{KarotzError, Result};
use crate::query::{canonical_query, encode_value};

type HmacSha1 = Hmac<Sha1>;

/// Base64 HMAC-SHA1 of `canonical_query` keyed with the ASCII bytes of `secret_key`.
pub fn sign(secret_key: &str, canonical_query: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(&ascii_key(secret_key))
        .map_err(|err| KarotzError::Crypto(err.to_string()))?;
    mac.update(canonical_query.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Each non-ASCII character of the key becomes `?`.
fn ascii_key(secret_key: &str) -> Vec<u8> {
    secret_key
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// A session-start request whose signature covers exactly `canonical_query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub base_url: String,
    pub canonical_query: String,
    pub signature: String,
}

impl SignedRequest {
    pub fn new(
        base_url: impl Into<String>,
        canonical_query: String,
        secret_key: &str,
    ) -> Result<Self> {
        let signature = sign(secret_key, &canonical_query)?;
        Ok(Self {
            base_url: base_url.into(),
            canonical_query,
            signature,
        })
    }

    /// Wire form. The signature is escaped here even though it was not part of the signed
    /// input.
    pub fn url(&self) -> String {
        format!(
            "{}?{}&signature={}",
            self.base_url,
            self.canonical_query,
            encode_value(&self.signature)
        )
    }
}

/// Build the signed start request for one attempt. `nonce` and `timestamp` are supplied by
/// the caller so a given attempt is reproducible.
pub fn start_request(
    start_endpoint: &str,
    credentials: &Credentials,
    nonce: u32,
    timestamp: u64,
) -> Result<SignedRequest> {
    let nonce = nonce.to_string();
    let timestamp = timestamp.to_string();
    let query = canonical_query([
        ("apikey", credentials.api_key()),
        ("installid", credentials.install_id()),
        ("once", nonce.as_str()),
        ("timestamp", timestamp.as_str()),
    ]);
    SignedRequest::new(start_endpoint, query, credentials.secret_key())
}
