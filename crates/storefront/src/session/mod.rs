//! Persisted session state.
//!
//! The session token lives in two redundant places: a cookie with a fixed
//! expiry, which the API client reads on every request, and a local
//! key-value entry, which the auth gate and profile views read. Both are
//! written together on sign-in and removed together on sign-out.
//!
//! Tokens are JWTs issued by the upstream. They are never verified here; the
//! payload is only decoded to recover the user id that order history needs.

mod store;

pub use store::{SessionStore, StorageChange, StorageEvent, StorageKey};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bazaar_core::UserId;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;

/// Errors reading or writing persisted session state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session storage is corrupt: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to persist session file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Session storage lock poisoned")]
    Poisoned,

    #[error("Malformed session token: {0}")]
    MalformedToken(&'static str),
}

/// An opaque session token.
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl From<SecretString> for SessionToken {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

impl From<String> for SessionToken {
    fn from(raw: String) -> Self {
        Self(SecretString::from(raw))
    }
}

impl ExposeSecret<str> for SessionToken {
    fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl SessionToken {
    /// Decode the JWT payload without verifying the signature.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MalformedToken` if the token is not a
    /// three-segment JWT with a base64url JSON payload.
    pub fn claims(&self) -> Result<TokenClaims, SessionError> {
        let mut segments = self.expose_secret().split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(SessionError::MalformedToken("expected three segments")),
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| SessionError::MalformedToken("payload is not base64url"))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|_| SessionError::MalformedToken("payload is not JSON"))?;

        Ok(TokenClaims::from_value(&value))
    }

    /// The user id carried in the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded or names no user.
    pub fn user_id(&self) -> Result<UserId, SessionError> {
        self.claims()?
            .user_id
            .ok_or(SessionError::MalformedToken("no user id claim"))
    }
}

/// The claims this client reads from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenClaims {
    /// From `userId`, `id` or `sub`, first present wins.
    pub user_id: Option<UserId>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenClaims {
    fn from_value(value: &Value) -> Self {
        let string = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            user_id: ["userId", "id", "sub"]
                .iter()
                .find_map(|key| string(key))
                .filter(|id| !id.is_empty())
                .map(UserId::new),
            name: string("name"),
            role: string("role"),
            expires_at: value
                .get("exp")
                .and_then(Value::as_i64)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }

    /// Whether the token's own expiry has passed. Tokens without one never
    /// expire client-side.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn token_with(payload: &Value) -> SessionToken {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        SessionToken::from(format!("eyJhbGciOiJIUzI1NiJ9.{body}.sig"))
    }

    #[test]
    fn test_claims_read_id_variants() {
        let token = token_with(&serde_json::json!({"id": "u-1", "name": "Mona", "role": "user"}));
        let claims = token.claims().unwrap();
        assert_eq!(claims.user_id, Some(UserId::new("u-1")));
        assert_eq!(claims.name.as_deref(), Some("Mona"));

        let token = token_with(&serde_json::json!({"userId": "u-2", "id": "ignored"}));
        assert_eq!(token.user_id().unwrap(), UserId::new("u-2"));

        let token = token_with(&serde_json::json!({"sub": "u-3"}));
        assert_eq!(token.user_id().unwrap(), UserId::new("u-3"));
    }

    #[test]
    fn test_claims_expiry() {
        let token = token_with(&serde_json::json!({"id": "u", "exp": 1_700_000_000}));
        let claims = token.claims().unwrap();
        let before = DateTime::from_timestamp(1_699_999_999, 0).unwrap();
        let after = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert!(!claims.is_expired(before));
        assert!(claims.is_expired(after));
    }

    #[test]
    fn test_malformed_tokens() {
        for raw in ["", "abc", "a.b", "a.!!!.c", "a.b.c.d"] {
            let token = SessionToken::from(raw.to_string());
            assert!(
                matches!(token.claims(), Err(SessionError::MalformedToken(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_token_without_user_claim() {
        let token = token_with(&serde_json::json!({"role": "user"}));
        assert!(token.user_id().is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let token = SessionToken::from("super.secret.token".to_string());
        assert!(!format!("{token:?}").contains("secret"));
    }
}
