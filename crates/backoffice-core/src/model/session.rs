// ── Signed-in session ──
//
// The login response is stored verbatim; the bearer token and the user
// record are located inside it on demand because different backend
// versions nest them differently.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Locations probed for the bearer token, in order.
const TOKEN_PATHS: &[&[&str]] = &[
    &["token"],
    &["access_token"],
    &["data", "token"],
    &["data", "access_token"],
    &["user", "token"],
    &["user", "access_token"],
];

/// The logged-in user payload, including the bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    payload: Value,
}

impl Session {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Accept a login response, rejecting it if it carries no token.
    pub fn from_login_response(payload: Value) -> Result<Self, CoreError> {
        let session = Self::new(payload);
        if session.token().is_none() {
            return Err(CoreError::AuthenticationFailed {
                message: "login response did not contain an access token".into(),
            });
        }
        Ok(session)
    }

    pub fn token(&self) -> Option<SecretString> {
        TOKEN_PATHS.iter().find_map(|path| {
            path.iter()
                .try_fold(&self.payload, |v, key| v.get(key))
                .and_then(Value::as_str)
                .filter(|t| !t.trim().is_empty())
                .map(|t| SecretString::from(t.to_owned()))
        })
    }

    /// The user record (`user` or `data.user`, else the payload itself).
    pub fn user(&self) -> &Value {
        self.payload
            .get("user")
            .or_else(|| self.payload.get("data").and_then(|d| d.get("user")))
            .unwrap_or(&self.payload)
    }

    pub fn user_name(&self) -> Option<String> {
        let user = self.user();
        ["name", "full_name", "email"]
            .iter()
            .find_map(|k| user.get(k).and_then(Value::as_str))
            .map(String::from)
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    fn token_of(payload: Value) -> Option<String> {
        Session::new(payload)
            .token()
            .map(|t| t.expose_secret().to_owned())
    }

    #[test]
    fn token_is_found_in_every_known_location() {
        assert_eq!(token_of(json!({"token": "a"})).as_deref(), Some("a"));
        assert_eq!(token_of(json!({"access_token": "b"})).as_deref(), Some("b"));
        assert_eq!(token_of(json!({"data": {"token": "c"}})).as_deref(), Some("c"));
        assert_eq!(
            token_of(json!({"data": {"access_token": "d"}})).as_deref(),
            Some("d")
        );
        assert_eq!(token_of(json!({"user": {"token": "e"}})).as_deref(), Some("e"));
        assert_eq!(
            token_of(json!({"user": {"access_token": "f"}})).as_deref(),
            Some("f")
        );
    }

    #[test]
    fn blank_or_missing_token() {
        assert!(token_of(json!({"token": " "})).is_none());
        assert!(token_of(json!({"user": {"id": 1}})).is_none());
        assert!(Session::from_login_response(json!({"message": "ok"})).is_err());
    }

    #[test]
    fn user_lookup() {
        let s = Session::new(json!({"data": {"token": "t", "user": {"name": "Huda"}}}));
        assert_eq!(s.user_name().as_deref(), Some("Huda"));
        let flat = Session::new(json!({"token": "t", "email": "hr@example.com"}));
        assert_eq!(flat.user_name().as_deref(), Some("hr@example.com"));
    }
}
