//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Input, Select};
use serde_json::Value;

use backoffice_core::Language;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile, SessionBackend};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "language = \"{}\"", cfg.defaults.language);
    let _ = writeln!(out, "per_page = {}", cfg.defaults.per_page);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "base_url = \"{}\"", p.base_url);
        if let Some(language) = p.language {
            let _ = writeln!(out, "language = \"{language}\"");
        }
        if let Some(per_page) = p.per_page {
            let _ = writeln!(out, "per_page = {per_page}");
        }
        if let Some(ref email) = p.email {
            let _ = writeln!(out, "email = \"{email}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if p.session_backend == SessionBackend::Keyring {
            let _ = writeln!(out, "session_backend = \"keyring\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out.trim_end().to_owned()
}

/// Serializable copy of the config with passwords masked.
fn redacted_value(cfg: &Config) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(cfg)?;
    if let Some(profiles) = value.get_mut("profiles").and_then(Value::as_object_mut) {
        for profile in profiles.values_mut() {
            if let Some(pw) = profile.get_mut("password").filter(|pw| !pw.is_null()) {
                *pw = Value::from("****");
            }
        }
    }
    Ok(value)
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn profile_not_found(cfg: &Config, name: String) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be 'true' or 'false'".into(),
    })
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str, what: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {what}"),
    })
}

/// Apply one `config set` assignment to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "base_url" | "base-url" => {
            url::Url::parse(&value).map_err(|e| CliError::Validation {
                field: "base_url".into(),
                reason: format!("invalid URL: {e}"),
            })?;
            profile.base_url = value;
        }
        "language" | "lang" => {
            let language: Language = value.parse().map_err(|_| CliError::Validation {
                field: "language".into(),
                reason: "must be 'ar' or 'en'".into(),
            })?;
            profile.language = Some(language);
        }
        "per_page" | "per-page" => {
            let per_page: u32 = parse_number("per_page", &value, "a positive number")?;
            if per_page == 0 {
                return Err(CliError::Validation {
                    field: "per_page".into(),
                    reason: "must be at least 1".into(),
                });
            }
            profile.per_page = Some(per_page);
        }
        "email" => profile.email = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "session_backend" | "session-backend" => {
            profile.session_backend = match value.as_str() {
                "file" => SessionBackend::File,
                "keyring" => SessionBackend::Keyring,
                _ => {
                    return Err(CliError::Validation {
                        field: "session_backend".into(),
                        reason: "must be 'file' or 'keyring'".into(),
                    });
                }
            };
        }
        "insecure" => profile.insecure = Some(parse_bool("insecure", &value)?),
        "timeout" => profile.timeout = Some(parse_number("timeout", &value, "a number (seconds)")?),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: base_url, language, per_page, \
                     email, password_env, session_backend, insecure, timeout, ca_cert"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let redacted = redacted_value(&cfg)?;
            let out = output::render_single(
                global.output,
                &redacted,
                |_| format_config_redacted(&cfg),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;
            save_config(&cfg)?;
            output::notice(&format!("✓ Set {key} on profile '{profile_name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                output::notice("No profiles configured. Run: backoffice config init", global.quiet);
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&cfg, name));
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            output::notice(&format!("✓ Default profile set to '{name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(&cfg, profile_name));
            }
            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            config::store_password(&profile_name, &secret)?;
            output::notice(
                &format!("✓ Password stored in system keyring for '{profile_name}'"),
                global.quiet,
            );
            Ok(())
        }
    }
}

/// Interactive wizard writing a fresh config with one profile.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("Back office CLI: configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default("http://localhost:8000/api".into())
        .validate_with(|input: &String| url::Url::parse(input).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(prompt_err)?;

    let email: String = Input::new()
        .with_prompt("Sign-in email")
        .interact_text()
        .map_err(prompt_err)?;

    let language = match Select::new()
        .with_prompt("Response language")
        .items(&["English", "Arabic"])
        .default(0)
        .interact()
        .map_err(prompt_err)?
    {
        1 => Language::Ar,
        _ => Language::En,
    };

    let password = rpassword::prompt_password("Password (empty to enter at login): ")
        .map_err(prompt_err)?;
    let mut plaintext = None;
    if !password.is_empty() {
        let choice = Select::new()
            .with_prompt("Where to store the password?")
            .items(&[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ])
            .default(0)
            .interact()
            .map_err(prompt_err)?;
        if choice == 0 {
            config::store_password(&profile_name, &password)?;
            eprintln!("   ✓ Password stored in system keyring");
        } else {
            plaintext = Some(password);
        }
    }

    let profile = Profile {
        base_url,
        language: Some(language),
        email: Some(email),
        password: plaintext,
        ..Profile::default()
    };

    let mut profiles = HashMap::new();
    profiles.insert(profile_name.clone(), profile);
    let cfg = Config {
        default_profile: Some(profile_name.clone()),
        profiles,
        ..Config::default()
    };
    save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Next: backoffice login");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_validates_values() {
        let mut profile = Profile::default();
        set_profile_key(&mut profile, "per-page", "25".into()).unwrap();
        set_profile_key(&mut profile, "lang", "ar".into()).unwrap();
        set_profile_key(&mut profile, "session_backend", "keyring".into()).unwrap();
        assert_eq!(profile.per_page, Some(25));
        assert_eq!(profile.language, Some(Language::Ar));
        assert_eq!(profile.session_backend, SessionBackend::Keyring);

        assert!(set_profile_key(&mut profile, "per_page", "0".into()).is_err());
        assert!(set_profile_key(&mut profile, "base_url", "not a url".into()).is_err());
        assert!(set_profile_key(&mut profile, "colour", "red".into()).is_err());
    }

    #[test]
    fn show_masks_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                base_url: "https://erp.example/api".into(),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        let value = redacted_value(&cfg).unwrap();
        assert_eq!(value["profiles"]["default"]["password"], "****");
        assert!(!format_config_redacted(&cfg).contains("hunter2"));
    }
}
