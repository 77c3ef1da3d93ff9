//! Access token inspection
//!
//! Tokens are JWTs issued by the backend. Only the `exp` claim is read; the
//! signature is the server's business.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Expiry time of a token, `Ok(None)` when it carries no `exp` claim
fn expiry(token: &str) -> Result<Option<DateTime<Utc>>, String> {
    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err("expected 3 non-empty parts".to_string());
    }

    let payload = BASE64_URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| format!("payload is not base64url: {}", e))?;
    let claims: Claims =
        serde_json::from_slice(&payload).map_err(|e| format!("payload is not JSON: {}", e))?;

    match claims.exp {
        Some(exp) => DateTime::from_timestamp(exp, 0)
            .map(Some)
            .ok_or_else(|| format!("exp out of range: {}", exp)),
        None => Ok(None),
    }
}

/// Whether a stored token must be discarded instead of sent.
///
/// A token that can't be decoded counts as expired. One without an `exp`
/// claim never expires on the client side.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match expiry(token) {
        Ok(Some(exp)) => exp <= now,
        Ok(None) => false,
        Err(reason) => {
            debug!("Treating undecodable token as expired: {}", reason);
            true
        }
    }
}

#[cfg(test)]
pub(crate) fn make_token(claims: &serde_json::Value) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}
