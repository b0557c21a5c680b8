use crate::application_port::{AuthError, SessionTokens};
use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;

pub const SESSION_COOKIE: &str = "session";
pub const OAUTH_STATE_COOKIE: &str = "oauthstate";

type HmacSha256 = Hmac<Sha256>;

/// Encodes the token pair into the `session` cookie value:
/// `hex(json payload) "." hex(hmac-sha256 tag)`. A bad tag, bad hex, or
/// unparsable payload all decode to `MalformedCredential`; no store lookup
/// happens for a credential that fails here.
pub struct SessionCookieCodec {
    key: Vec<u8>,
}

impl SessionCookieCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        SessionCookieCodec { key: key.into() }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| AuthError::InternalError(e.to_string()))
    }

    pub fn encode(&self, tokens: &SessionTokens) -> Result<String, AuthError> {
        let payload =
            serde_json::to_vec(tokens).map_err(|e| AuthError::InternalError(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();
        Ok(format!("{}.{}", hex::encode(&payload), hex::encode(tag)))
    }

    pub fn decode(&self, cookie: &str) -> Result<SessionTokens, AuthError> {
        let (payload_hex, tag_hex) = cookie
            .split_once('.')
            .ok_or(AuthError::MalformedCredential)?;
        let payload = hex::decode(payload_hex).map_err(|_| AuthError::MalformedCredential)?;
        let tag = hex::decode(tag_hex).map_err(|_| AuthError::MalformedCredential)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&tag)
            .map_err(|_| AuthError::MalformedCredential)?;

        serde_json::from_slice(&payload).map_err(|_| AuthError::MalformedCredential)
    }
}

pub fn session_cookie_header(value: &str, expires_at: DateTime<Utc>) -> String {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={max_age}")
}

pub fn clear_session_cookie_header() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0")
}

pub fn oauth_state_cookie_header(state: &str) -> String {
    format!("{OAUTH_STATE_COOKIE}={state}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=600")
}

pub fn clear_oauth_state_cookie_header() -> String {
    format!("{OAUTH_STATE_COOKIE}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0")
}
