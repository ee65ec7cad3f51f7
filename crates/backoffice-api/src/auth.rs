// Authentication primitives: UI language, bearer token lookup,
// and the login/logout endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;

// ── Language ────────────────────────────────────────────────────────

/// UI language. Drives the `Accept-Language` header and which name field
/// (`name` vs `name_ar`) is shown for an entity.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    Ar,
    #[default]
    En,
}

impl Language {
    /// Value sent in the `Accept-Language` header.
    pub fn as_header(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    /// Whether text in this language is laid out right-to-left.
    pub fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

// ── Token lookup ────────────────────────────────────────────────────

/// Source of the bearer token, consulted on every request.
///
/// Implemented by the session store in `backoffice-core`, so a login or
/// logout is visible to the very next request without rebuilding clients.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<SecretString>;
}

/// A fixed token (or none). Handy for scripts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<SecretString>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(SecretString::from(token.into())))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        self.0
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
            .cloned()
    }
}

// ── Endpoints ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// `POST /login`. The only call that does not need a bearer token.
    ///
    /// Returns the whole response body; the caller persists it as the
    /// session payload and locates the token inside it.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<serde_json::Value, Error> {
        let url = self.url("login")?;
        debug!("POST {url}");

        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let resp = self
            .anonymous(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// `POST /logout`: revokes the token server-side.
    pub async fn logout(&self) -> Result<(), Error> {
        self.post("logout", &serde_json::json!({})).await?;
        Ok(())
    }

    /// `GET /me`: the profile of the signed-in user.
    pub async fn me(&self) -> Result<serde_json::Value, Error> {
        let value = self.get("me").await?;
        Ok(crate::envelope::unwrap_single(value))
    }
}
