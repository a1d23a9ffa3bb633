//! Identity extraction from the stored bearer token.
//!
//! The token is a JWT whose payload carries the user id.  The client decodes
//! the payload locally to know *who* it is acting as — it performs no
//! signature verification, which stays the backend's responsibility on every
//! authenticated call.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use lostnet_shared::constants::USER_ID_CLAIMS;
use lostnet_shared::types::{Credential, UserId};

/// The identity a decoded credential asserts.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthIdentity {
    pub user_id: UserId,
    /// The full claims object, for callers that need more than the id.
    pub claims: Value,
}

/// Decode `credential` into the identity it asserts.
///
/// The user id claim may appear as `userId` or `id`; the first present wins.
/// Returns `None` for anything that is not a well-formed token carrying a
/// user id — callers treat that as "not authenticated", never as a crash.
pub fn resolve_identity(credential: &Credential) -> Option<AuthIdentity> {
    let payload = credential.token().split('.').nth(1)?;

    // Tokens are base64url without padding; tolerate encoders that pad.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    let user_id = USER_ID_CLAIMS
        .iter()
        .find_map(|name| claims.get(name).and_then(Value::as_str))?;

    Some(AuthIdentity {
        user_id: UserId::from(user_id),
        claims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(payload: &str) -> Credential {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload);
        Credential::new(format!("{header}.{payload}.signature"))
    }

    #[test]
    fn resolves_id_claim() {
        let identity = resolve_identity(&token(r#"{"id":"u1","iat":1700000000}"#)).unwrap();
        assert_eq!(identity.user_id.as_str(), "u1");
        assert_eq!(identity.claims["iat"], 1700000000);
    }

    #[test]
    fn user_id_claim_takes_precedence() {
        let identity = resolve_identity(&token(r#"{"userId":"u1","id":"u2"}"#)).unwrap();
        assert_eq!(identity.user_id.as_str(), "u1");
    }

    #[test]
    fn padded_payload_still_decodes() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"id":"u1"}"#);
        let credential = Credential::new(format!("{header}.{payload}.sig"));
        assert!(resolve_identity(&credential).is_some());
    }

    #[test]
    fn missing_user_id_claim_is_absent() {
        assert!(resolve_identity(&token(r#"{"email":"a@b.c"}"#)).is_none());
    }

    #[test]
    fn corrupt_tokens_are_absent_not_fatal() {
        assert!(resolve_identity(&Credential::new("")).is_none());
        assert!(resolve_identity(&Credential::new("no-dots-here")).is_none());
        assert!(resolve_identity(&Credential::new("a.!!!not-base64!!!.c")).is_none());
        let header = URL_SAFE_NO_PAD.encode("{}");
        let not_json = URL_SAFE_NO_PAD.encode("plain text");
        assert!(resolve_identity(&Credential::new(format!("{header}.{not_json}.c"))).is_none());
    }
}
