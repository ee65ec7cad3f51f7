use indexmap::IndexMap;
use thiserror::Error;

/// Top-level error type for the `backoffice-api` crate.
///
/// The server reports failures in a handful of loosely specified shapes.
/// They are all normalized here, immediately after the response arrives,
/// so callers only ever match on these variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// No bearer token in the stored session. Raised before any I/O.
    #[error("Not signed in: no access token found in the stored session")]
    MissingToken,

    /// The server rejected the bearer token (HTTP 401).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // ── Server-reported failures ────────────────────────────────────
    /// Field-level validation failure (`{message, errors: {field: [msg]}}`).
    #[error("{}", join_validation(.message, .fields))]
    Validation {
        message: String,
        fields: IndexMap<String, Vec<String>>,
    },

    /// Business rule rejection carrying a single server message.
    #[error("{message}")]
    Business { status: u16, message: String },

    /// Non-JSON or unexpected error shape; the raw body is kept as-is.
    #[error("Unexpected response (HTTP {status}): {body}")]
    Unknown { status: u16, body: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A header value could not be encoded (e.g. a token with control characters).
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Reading an attachment from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Collapse the error into the single human-readable line shown to users.
    pub fn user_message(&self) -> String {
        match self {
            Self::Business { message, .. } | Self::Unauthorized { message } => message.clone(),
            Self::Unknown { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    /// Returns `true` if the session is gone and signing in again would help.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::MissingToken | Self::Unauthorized { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Business { status: 404, .. } | Self::Unknown { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status reported by the server, when there was a response at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Validation { .. } => Some(422),
            Self::Business { status, .. } | Self::Unknown { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    // ── Normalization ───────────────────────────────────────────────

    /// Normalize a non-2xx response body into one of the variants above.
    pub(crate) fn from_response(status: reqwest::StatusCode, raw: &str) -> Self {
        let code = status.as_u16();
        let parsed = serde_json::from_str::<serde_json::Value>(raw).ok();

        let message = parsed.as_ref().and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) => map
                .get("message")
                .or_else(|| map.get("error"))
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            _ => None,
        });

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Self::Unauthorized {
                message: message.unwrap_or_else(|| "Unauthenticated".into()),
            };
        }

        if let Some(fields) = parsed
            .as_ref()
            .and_then(|v| v.get("errors"))
            .and_then(parse_field_errors)
        {
            return Self::Validation {
                message: message.unwrap_or_else(|| "The given data was invalid.".into()),
                fields,
            };
        }

        match message {
            Some(message) => Self::Business {
                status: code,
                message,
            },
            None => Self::Unknown {
                status: code,
                body: if raw.trim().is_empty() {
                    status.to_string()
                } else {
                    raw.to_owned()
                },
            },
        }
    }
}

/// Parse `{field: ["msg", ...]}` (or `{field: "msg"}`) into an ordered map.
fn parse_field_errors(value: &serde_json::Value) -> Option<IndexMap<String, Vec<String>>> {
    let map = value.as_object()?;
    let mut fields = IndexMap::with_capacity(map.len());
    for (field, messages) in map {
        let list: Vec<String> = match messages {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|m| m.as_str().map_or_else(|| m.to_string(), String::from))
                .collect(),
            serde_json::Value::String(s) => vec![s.clone()],
            other => vec![other.to_string()],
        };
        fields.insert(field.clone(), list);
    }
    (!fields.is_empty()).then_some(fields)
}

/// Flatten validation messages into one line, falling back to the summary.
fn join_validation(message: &str, fields: &IndexMap<String, Vec<String>>) -> String {
    let joined: Vec<&str> = fields
        .values()
        .flatten()
        .map(String::as_str)
        .filter(|m| !m.is_empty())
        .collect();
    if joined.is_empty() {
        message.to_owned()
    } else {
        joined.join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn validation_map_flattens_in_server_order() {
        let raw = r#"{"message":"The given data was invalid.","errors":{"name":["Name is required."],"code":["Code taken.","Code too long."]}}"#;
        let err = Error::from_response(StatusCode::UNPROCESSABLE_ENTITY, raw);
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(
            err.user_message(),
            "Name is required., Code taken., Code too long."
        );
    }

    #[test]
    fn message_string_becomes_business_error() {
        let err = Error::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Period is closed"}"#,
        );
        assert!(matches!(err, Error::Business { status: 400, .. }));
        assert_eq!(err.user_message(), "Period is closed");
    }

    #[test]
    fn bare_json_string_is_a_message() {
        let err = Error::from_response(StatusCode::CONFLICT, r#""Already posted""#);
        assert_eq!(err.user_message(), "Already posted");
    }

    #[test]
    fn unexpected_shape_is_stringified() {
        let err = Error::from_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(matches!(err, Error::Unknown { status: 500, .. }));
        assert_eq!(err.user_message(), "<html>oops</html>");

        let empty = Error::from_response(StatusCode::BAD_GATEWAY, "");
        assert_eq!(empty.user_message(), "502 Bad Gateway");
    }

    #[test]
    fn unauthorized_is_auth_expired() {
        let err = Error::from_response(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_auth_expired());
        assert_eq!(err.user_message(), "Unauthenticated");
        assert!(Error::MissingToken.is_auth_expired());
    }

    #[test]
    fn not_found_detection() {
        let err = Error::from_response(StatusCode::NOT_FOUND, r#"{"message":"No query results"}"#);
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }
}
