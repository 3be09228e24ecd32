//! Signed session cookies.
//!
//! Cookie value: `{session_id}.{base64url(hmac_sha256(secret, session_id))}`.
//! A value whose signature does not verify is treated as no cookie at all.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use domains::auth::SessionId;
use domains::error::{DomainError, Result};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    /// Keys the signer. An empty secret is refused.
    pub fn new(secret: &SecretString) -> Result<Self> {
        let key = secret.expose_secret().as_bytes();
        if key.is_empty() {
            return Err(DomainError::Internal("session secret must not be empty".into()));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| DomainError::Internal(format!("session secret rejected: {e}")))?;
        Ok(Self { mac })
    }

    pub fn sign(&self, session: &SessionId) -> String {
        let mut mac = self.mac.clone();
        mac.update(session.as_str().as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", session.as_str(), tag)
    }

    /// The session id carried by a cookie value, if its signature holds.
    pub fn verify(&self, cookie_value: &str) -> Option<SessionId> {
        let (id, tag) = cookie_value.rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&tag).ok()?;
        Some(SessionId::from(id.to_string()))
    }
}
