//! JWT payload decoding for OIDC `id_token`s.
//!
//! Signature verification is the provider's side of the TLS channel; this
//! module only recovers the claim set from `header.payload.signature`.

use crate::error::{OAuth2Error, OAuth2Result};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};

/// Decode the payload segment of a JWT and parse it as a JSON object.
pub fn decode_payload(id_token: &str) -> OAuth2Result<serde_json::Value> {
    let parts: Vec<&str> = id_token.split('.').collect();
    if parts.len() != 3 {
        return Err(OAuth2Error::InvalidJwt(format!(
            "expected 3 dot-separated segments, got {}",
            parts.len()
        )));
    }
    let bytes = decode_segment(parts[1])?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| OAuth2Error::InvalidJwt(format!("payload is not valid JSON: {e}")))?;
    if !claims.is_object() {
        return Err(OAuth2Error::InvalidJwt(
            "payload is not a JSON object".to_string(),
        ));
    }
    Ok(claims)
}

/// Extract the `id_token` from a raw token-response body and decode its
/// payload.
pub fn claims_from_raw(raw: &str) -> OAuth2Result<serde_json::Value> {
    let body: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| OAuth2Error::InvalidTokenResponse(e.to_string()))?;
    let id_token = body
        .get("id_token")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            OAuth2Error::InvalidJwt("token response doesn't contain id_token field".to_string())
        })?;
    decode_payload(id_token)
}

// Providers differ on padding and alphabet; accept both.
fn decode_segment(segment: &str) -> OAuth2Result<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| OAuth2Error::InvalidJwt(format!("payload is not valid base64: {e}")))
}
