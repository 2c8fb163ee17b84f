//! Reading claims out of a bearer token without verifying it.
//!
//! The client never validates signatures; claims only fill gaps the server
//! left and tell us when the token stops being worth presenting.

use crate::{AuthError, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Decoded payload segment of a JWT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenClaims(Map<String, Value>);

impl TokenClaims {
    /// Decode the payload (second) segment of `token`.
    pub fn decode(token: &str) -> AuthResult<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("missing payload segment".into()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidToken(format!("payload is not base64url: {e}")))?;

        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(AuthError::InvalidToken("payload is not a JSON object".into())),
            Err(e) => Err(AuthError::InvalidToken(format!("payload is not JSON: {e}"))),
        }
    }

    /// String claim, with numbers rendered as strings. Empty strings count as absent.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Identity of the token holder: `sub`, else `id`.
    pub fn subject(&self) -> Option<String> {
        self.string("sub").or_else(|| self.string("id"))
    }

    /// `exp` as seconds since the Unix epoch.
    pub fn expires_at(&self) -> Option<i64> {
        let exp = self.0.get("exp")?;
        exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))
    }

    /// A token without an `exp` claim is treated as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(exp) => exp <= now.timestamp(),
            None => true,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}
