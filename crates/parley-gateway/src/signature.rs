// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! The provider signs the raw request body with HMAC-SHA256 over a shared
//! secret and sends `X-Hub-Signature-256: sha256=<hex>`. Verification goes
//! through the `hmac` crate's `verify_slice`, which compares in constant
//! time.

use hmac::{Hmac, Mac};
use parley_core::ParleyError;
use sha2::Sha256;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Verify the signature header against the raw body.
///
/// Fails closed: a missing header, a malformed header, or a mismatch all
/// reject the request.
pub fn verify_signature(
    app_secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), ParleyError> {
    let header =
        header.ok_or_else(|| ParleyError::Authentication("missing signature header".into()))?;
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or_else(|| ParleyError::Authentication("signature header missing sha256= prefix".into()))?;
    let expected = hex::decode(hex_digest)
        .map_err(|_| ParleyError::Authentication("signature is not valid hex".into()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes())
        .map_err(|e| ParleyError::Internal(format!("hmac key setup failed: {e}")))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| ParleyError::Authentication("signature mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"entry":[]}"#;
        let header = sign("secret", body);
        assert!(verify_signature("secret", body, Some(&header)).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign("secret", br#"{"entry":[]}"#);
        let err = verify_signature("secret", br#"{"entry":[{}]}"#, Some(&header)).unwrap_err();
        assert!(matches!(err, ParleyError::Authentication(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = br#"{"entry":[]}"#;
        let header = sign("other-secret", body);
        assert!(verify_signature("secret", body, Some(&header)).is_err());
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(verify_signature("secret", b"{}", None).is_err());
    }

    #[test]
    fn header_without_prefix_is_rejected() {
        let body = b"{}";
        let bare_hex = sign("secret", body).trim_start_matches("sha256=").to_string();
        assert!(verify_signature("secret", body, Some(&bare_hex)).is_err());
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        assert!(verify_signature("secret", b"{}", Some("sha256=zzzz")).is_err());
    }
}
