//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use backoffice_config::ConfigError;
use backoffice_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the back-office API at {url}")]
    #[diagnostic(
        code(backoffice::connection_failed),
        help(
            "Check the base URL and that the server is running.\n\
             URL: {url}\n\
             Try: backoffice whoami --base-url <url>"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS certificate verification failed for {url}")]
    #[diagnostic(
        code(backoffice::tls_error),
        help(
            "The server is using a certificate this machine does not trust.\n\
             Use --insecure (-k) to accept it, or configure ca_cert in your profile."
        )
    )]
    TlsError { url: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(backoffice::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not signed in")]
    #[diagnostic(
        code(backoffice::not_signed_in),
        help("Run: backoffice login")
    )]
    NotSignedIn,

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(backoffice::auth_failed),
        help(
            "The stored session was rejected or the credentials are wrong.\n\
             Run: backoffice login"
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(backoffice::no_credentials),
        help(
            "Store one with: backoffice config set-password --profile {profile}\n\
             Or set the BACKOFFICE_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Unknown resource '{name}'")]
    #[diagnostic(
        code(backoffice::unknown_resource),
        help("Run: backoffice resources to see the catalog")
    )]
    UnknownResource { name: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(backoffice::not_found),
        help("Run: backoffice {list_command} to see available records")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(backoffice::not_found),
        help("The record may have been deleted; list the resource to check")
    )]
    Missing { message: String },

    #[error("{message}")]
    #[diagnostic(code(backoffice::rejected))]
    Rejected { message: String, status: u16 },

    #[error("{message}")]
    #[diagnostic(
        code(backoffice::invalid_data),
        help("{details}")
    )]
    InvalidData { message: String, details: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(backoffice::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(backoffice::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(backoffice::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: backoffice config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No profile configured")]
    #[diagnostic(
        code(backoffice::no_config),
        help(
            "Create one with: backoffice config init\n\
             Or pass --base-url.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(backoffice::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {0}")]
    #[diagnostic(code(backoffice::keyring))]
    Keyring(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(backoffice::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(
        code(backoffice::json),
        help("Check the JSON file contents and try again.")
    )]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(backoffice::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to write config: {0}")]
    #[diagnostic(code(backoffice::config_write))]
    ConfigWrite(#[from] toml::ser::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NotSignedIn | Self::AuthFailed { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::Missing { .. } => exit_code::NOT_FOUND,
            Self::Rejected { status: 403, .. } => exit_code::PERMISSION,
            Self::Rejected { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::UnknownResource { .. }
            | Self::InvalidData { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                if reason.contains("certificate") {
                    CliError::TlsError { url }
                } else {
                    CliError::ConnectionFailed {
                        url,
                        source: reason.into(),
                    }
                }
            }

            CoreError::Disconnected => CliError::ConnectionFailed {
                url: "(shut down)".into(),
                source: "the request was cancelled before it completed".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::NotAuthenticated => CliError::NotSignedIn,

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::NotFound { message } => CliError::Missing { message },

            CoreError::Validation { message, fields } => {
                let details = fields
                    .iter()
                    .map(|(field, errors)| format!("{field}: {}", errors.join(", ")))
                    .collect::<Vec<_>>()
                    .join("\n");
                CliError::InvalidData { message, details }
            }

            CoreError::Business { message, status } => CliError::Rejected { message, status },

            CoreError::InvalidInput { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Unknown { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "unknown".into(), |s| s.to_string()),
                message,
            },

            CoreError::Session { message } => CliError::ApiError {
                code: "session".into(),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Keyring(message) => CliError::Keyring(message),
            ConfigError::Serialization(e) => CliError::ConfigWrite(e),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
