//! Webhook request authentication.
//!
//! The platform signs every delivery with HMAC-SHA256 over the raw body using
//! a secret shared with the relay, and sends the digest as
//! `X-GitCode-Signature-256: sha256=<hex>`. Event type and delivery id travel
//! in `X-GitCode-Event` and `X-GitCode-Delivery`.
//!
//! A rejected request is an [`AuthError`], which renders as `401 Unauthorized`
//! with an empty body.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the platform event type
pub const EVENT_TYPE_HEADER: &str = "X-GitCode-Event";

/// Header carrying the delivery id
pub const DELIVERY_ID_HEADER: &str = "X-GitCode-Delivery";

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "X-GitCode-Signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Reasons a webhook request is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    #[error("signature must start with 'sha256='")]
    MalformedSignature,

    #[error("signature is not valid hex")]
    InvalidHex,

    #[error("signature does not match payload")]
    SignatureMismatch,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// A request that passed authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Body bytes exactly as they were verified
    pub payload: Bytes,

    /// Value of `X-GitCode-Event`
    pub event_type: String,

    /// Value of `X-GitCode-Delivery`
    pub delivery_id: String,
}

/// The shared HMAC secret. Wiped on drop; `Debug` prints `[REDACTED]`.
pub type Secret = SecretSlice<u8>;

/// Verifies webhook signatures against a shared secret.
#[derive(Debug)]
pub struct Authenticator {
    secret: Secret,
}

impl Authenticator {
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// Authenticate a request from its headers and raw body.
    ///
    /// On success the body is returned unchanged together with the event
    /// metadata. The digest comparison is constant-time.
    pub fn authenticate(&self, headers: &HeaderMap, body: Bytes) -> Result<Authenticated, AuthError> {
        let event_type = required_header(headers, EVENT_TYPE_HEADER)?;
        let delivery_id = required_header(headers, DELIVERY_ID_HEADER)?;
        let signature = required_header(headers, SIGNATURE_HEADER)?;

        self.verify(&signature, &body)?;

        Ok(Authenticated {
            payload: body,
            event_type,
            delivery_id,
        })
    }

    fn verify(&self, signature: &str, body: &[u8]) -> Result<(), AuthError> {
        let digest = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(AuthError::MalformedSignature)?;
        let expected = hex::decode(digest).map_err(|_| AuthError::InvalidHex)?;

        let mut mac = new_mac(self.secret.expose_secret());
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| AuthError::SignatureMismatch)
    }
}

/// Compute the `sha256=<hex>` signature header value for a body.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = new_mac(secret);
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

fn new_mac(secret: &[u8]) -> HmacSha256 {
    match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    }
}

fn required_header(headers: &HeaderMap, name: &'static str) -> Result<String, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or(AuthError::MissingHeader(name))
}
