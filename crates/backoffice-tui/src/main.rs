//! `backoffice-tui`: terminal client for the HR and accounting back office.
//!
//! One tab per resource group (HR, Accounting, Parties, Treasury,
//! Organization), each listing its resources on the left. Lists page
//! through the server, records open into detail views with attachments,
//! and the chart of accounts and cost centers render as trees.
//!
//! Logs go to a file so they never corrupt the terminal. A background
//! data bridge streams store changes and request outcomes into the
//! action loop.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use backoffice_core::{BackOffice, Language};

use crate::app::App;

/// Terminal client for the HR and accounting back office.
#[derive(Parser, Debug)]
#[command(name = "backoffice-tui", version, about)]
struct Cli {
    /// Config profile to use
    #[arg(short = 'p', long, env = "BACKOFFICE_PROFILE")]
    profile: Option<String>,

    /// API root, overriding the profile (e.g. https://erp.example.com/api)
    #[arg(short = 'u', long, env = "BACKOFFICE_URL")]
    base_url: Option<String>,

    /// Interface language sent to the server (ar or en)
    #[arg(long)]
    lang: Option<Language>,

    /// Log file path (defaults to backoffice-tui.log in the log directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Nothing may be written to stdout or stderr while
/// the terminal is in raw mode. Hold the guard until exit so logs flush.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "backoffice_tui={log_level},backoffice_core={log_level},backoffice_api={log_level}"
        ))
    });

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| backoffice_config::log_dir().join("backoffice-tui.log"));
    let log_dir = log_file
        .parent()
        .map_or_else(std::env::temp_dir, std::path::Path::to_path_buf);
    let log_name = log_file
        .file_name()
        .map_or_else(|| "backoffice-tui.log".into(), std::ffi::OsStr::to_os_string);

    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Build the client from the active profile plus flag overrides.
/// Returns the profile's sign-in email alongside.
fn build_office(cli: &Cli) -> Result<(BackOffice, Option<String>)> {
    let cfg = backoffice_config::load_config_or_default();
    let profile_name = cfg.active_profile_name(cli.profile.as_deref());

    let mut profile = match (cfg.profiles.get(&profile_name), &cli.base_url) {
        (Some(profile), _) => profile.clone(),
        (None, Some(_)) => backoffice_config::Profile::default(),
        (None, None) => {
            return Err(eyre!(
                "no profile '{profile_name}' in {}; run `backoffice config init` or pass --base-url",
                backoffice_config::config_path().display()
            ));
        }
    };
    if let Some(url) = &cli.base_url {
        profile.base_url.clone_from(url);
    }
    if let Some(lang) = cli.lang {
        profile.language = Some(lang);
    }

    let client = backoffice_config::profile_to_client_config(&profile, &cfg.defaults)?;
    let sessions = backoffice_config::session_store(&profile, &profile_name);
    info!(profile = %profile_name, base_url = %client.base_url, "starting backoffice-tui");
    let office = BackOffice::new(client, sessions)?;
    Ok((office, profile.email))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli);

    let (office, email) = build_office(&cli)?;
    office.start().await;

    let mut app = App::new(office.clone(), email);
    let result = app.run().await;

    office.shutdown().await;
    result
}
