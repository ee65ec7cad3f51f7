// Async HTTP client for the back-office REST API.
//
// Every request carries `Accept-Language` and a bearer token looked up
// from the session at send time. Responses are parsed into loose JSON
// here; envelope shapes are normalized in `envelope.rs` and failure
// shapes in `error.rs`.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{Language, TokenProvider};
use crate::error::Error;
use crate::transport::TransportConfig;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the back-office API.
///
/// Cheap to share behind an `Arc`; the language can be switched at
/// runtime and the token provider is consulted per request.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    language: RwLock<Language>,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from a transport config.
    ///
    /// `base_url` is the API root (e.g. `https://erp.example.com/api`);
    /// resource paths are joined onto it.
    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        tokens: Arc<dyn TokenProvider>,
        language: Language,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, tokens, language)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
        language: Language,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            tokens,
            language: RwLock::new(language),
        })
    }

    /// The API base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Current request language.
    pub fn language(&self) -> Language {
        *self.language.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch the `Accept-Language` sent on subsequent requests.
    pub fn set_language(&self, language: Language) {
        debug!(%language, "switching request language");
        *self.language.write().unwrap_or_else(PoisonError::into_inner) = language;
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"journal-entries/12/post"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request builders ─────────────────────────────────────────────

    /// Request carrying the language header but no credentials.
    pub(crate) fn anonymous(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(ACCEPT_LANGUAGE, self.language().as_header())
    }

    /// Authenticated request. Fails locally when no token is stored.
    fn authorized(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let token = self.tokens.bearer_token().ok_or(Error::MissingToken)?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        Ok(self.anonymous(method, url).header(AUTHORIZATION, value))
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get(&self, path: &str) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        let req = self.authorized(reqwest::Method::GET, url.clone())?;
        debug!("GET {url}");

        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        let req = self.authorized(reqwest::Method::GET, url.clone())?;
        debug!("GET {url} params={params:?}");

        let resp = req.query(params).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        let req = self.authorized(reqwest::Method::POST, url.clone())?;
        debug!("POST {url}");

        let resp = req.json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        let req = self.authorized(reqwest::Method::PUT, url.clone())?;
        debug!("PUT {url}");

        let resp = req.json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn patch<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        let req = self.authorized(reqwest::Method::PATCH, url.clone())?;
        debug!("PATCH {url}");

        let resp = req.json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        let req = self.authorized(reqwest::Method::DELETE, url.clone())?;
        debug!("DELETE {url}");

        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        let req = self.authorized(reqwest::Method::POST, url.clone())?;
        debug!("POST {url} (multipart)");

        let resp = req.multipart(form).send().await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    /// Parse a success body as JSON (empty bodies become `null`), or
    /// normalize the failure.
    pub(crate) async fn handle_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<serde_json::Value, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            trace!(status = status.as_u16(), "error body: {body}");
            return Err(Error::from_response(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Ensure the base URL ends with `/` so relative joins keep its path.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
