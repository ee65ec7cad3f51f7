//! CLI configuration: thin wrapper around `backoffice_config`.
//!
//! Adds the resolution step that layers `GlobalOpts` flag overrides
//! (--base-url, --lang, --insecure, --timeout) on top of the profile.

use std::sync::Arc;

use backoffice_core::{ClientConfig, Language, SessionStore};

use crate::cli::{GlobalOpts, LangArg};
use crate::error::CliError;

pub use backoffice_config::{
    Config, Profile, SessionBackend, config_path, load_config_or_default, resolve_password,
    save_config, store_password,
};

/// Everything a connected command needs.
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub client: ClientConfig,
    pub sessions: Arc<dyn SessionStore>,
}

impl From<LangArg> for Language {
    fn from(lang: LangArg) -> Self {
        match lang {
            LangArg::Ar => Language::Ar,
            LangArg::En => Language::En,
        }
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Load the config file and apply flag overrides to the active profile.
///
/// Without a matching profile, `--base-url` alone is enough to run.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    resolve_with(global, &cfg)
}

pub fn resolve_with(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match (cfg.profiles.get(&profile_name), &global.base_url) {
        (Some(profile), _) => profile.clone(),
        (None, Some(_)) => Profile::default(),
        (None, None) if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global);
    let client = backoffice_config::profile_to_client_config(&profile, &cfg.defaults)?;
    let sessions = backoffice_config::session_store(&profile, &profile_name);

    Ok(Resolved {
        profile_name,
        profile,
        client,
        sessions,
    })
}

/// CLI flags take priority over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.base_url {
        profile.base_url.clone_from(url);
    }
    if let Some(lang) = global.lang {
        profile.language = Some(lang.into());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}
