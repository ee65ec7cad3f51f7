// ── Core error types ──
//
// User-facing errors from backoffice-core. Consumers never see reqwest
// errors or raw response bodies directly: the `From<backoffice_api::Error>`
// impl folds transport-layer failures into the variants below.

use indexmap::IndexMap;
use thiserror::Error;

/// Field name to messages, in server order.
pub type ValidationFields = IndexMap<String, Vec<String>>;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session ──────────────────────────────────────────────────────
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session storage error: {message}")]
    Session { message: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot reach server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Client is shut down")]
    Disconnected,

    // ── Server-reported ──────────────────────────────────────────────
    #[error("{message}")]
    Validation {
        message: String,
        fields: ValidationFields,
    },

    #[error("{message}")]
    Business { message: String, status: u16 },

    /// A 404, carrying the server's own wording.
    #[error("{message}")]
    NotFound { message: String },

    #[error("Unexpected server response: {message}")]
    Unknown {
        message: String,
        status: Option<u16>,
    },

    // ── Local ────────────────────────────────────────────────────────
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The single line shown in a toast or on stderr.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. }
            | Self::Business { message, .. }
            | Self::NotFound { message }
            | Self::Unknown { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Signing in again would resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::AuthenticationFailed { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status when the failure came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { .. } => Some(401),
            Self::Validation { .. } => Some(422),
            Self::Business { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Unknown { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<backoffice_api::Error> for CoreError {
    fn from(err: backoffice_api::Error) -> Self {
        use backoffice_api::Error as Api;

        if err.is_not_found() {
            return CoreError::NotFound {
                message: err.user_message(),
            };
        }

        match err {
            Api::MissingToken => CoreError::NotAuthenticated,
            Api::Unauthorized { message } => CoreError::AuthenticationFailed { message },
            Api::Validation { message, fields } => {
                let joined = fields.values().flatten().cloned().collect::<Vec<_>>();
                let message = if joined.is_empty() {
                    message
                } else {
                    joined.join(", ")
                };
                CoreError::Validation { message, fields }
            }
            Api::Business { status, message } => CoreError::Business { message, status },
            Api::Unknown { status, body } => CoreError::Unknown {
                message: body,
                status: Some(status),
            },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Unknown {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            Api::InvalidHeader(message) => CoreError::InvalidInput { message },
            Api::Deserialization { message, body } => {
                tracing::debug!(body = %body, "undecodable response body");
                CoreError::Unknown {
                    message,
                    status: None,
                }
            }
            Api::Io(e) => CoreError::InvalidInput {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use backoffice_api::Error as Api;

    use super::*;

    #[test]
    fn validation_message_joins_field_messages() {
        let mut fields = IndexMap::new();
        fields.insert("name".to_owned(), vec!["Name is required".to_owned()]);
        fields.insert("code".to_owned(), vec!["Code is taken".to_owned()]);
        let err = CoreError::from(Api::Validation {
            message: "The given data was invalid.".into(),
            fields,
        });
        assert_eq!(err.user_message(), "Name is required, Code is taken");
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn auth_and_not_found_mapping() {
        assert!(CoreError::from(Api::MissingToken).is_auth_expired());
        assert!(
            CoreError::from(Api::Unauthorized {
                message: "Unauthenticated".into()
            })
            .is_auth_expired()
        );
        let missing = CoreError::from(Api::Business {
            status: 404,
            message: "Vendor not found".into(),
        });
        assert!(missing.is_not_found());
        assert_eq!(missing.status(), Some(404));
        assert_eq!(missing.user_message(), "Vendor not found");
        assert_eq!(missing.to_string(), "Vendor not found");
    }

    #[test]
    fn business_message_passes_through() {
        let err = CoreError::from(Api::Business {
            status: 409,
            message: "Period is closed".into(),
        });
        assert_eq!(err.user_message(), "Period is closed");
        assert_eq!(err.status(), Some(409));
    }
}
