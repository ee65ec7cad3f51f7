// ── Runtime client configuration ──
//
// Describes *how* to reach the back-office API. Built by the CLI/TUI from
// the profile file and handed in; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use backoffice_api::{Language, TlsMode, TransportConfig};
use url::Url;

/// Default page size for list requests.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed staging servers).
    DangerAcceptInvalid,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://erp.example.com/api/`.
    pub base_url: Url,
    /// Language sent with every request.
    pub language: Language,
    pub per_page: u32,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            language: Language::default(),
            per_page: DEFAULT_PER_PAGE,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
