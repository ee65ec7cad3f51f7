//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use backoffice_core::{AttachmentUpload, CommandResult, CoreError, Resource};

use crate::error::CliError;

/// Resolve a resource name from the command line (kebab-case, case-insensitive).
pub fn parse_resource(name: &str) -> Result<Resource, CliError> {
    name.parse().map_err(|_| CliError::UnknownResource { name: name.into() })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, the operation is refused rather than
/// silently approved.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })?;
    if !value.is_object() {
        return Err(CliError::Validation {
            field: "from-file".into(),
            reason: "expected a JSON object".into(),
        });
    }
    Ok(value)
}

/// Load files for a multipart upload.
pub async fn read_uploads(paths: &[PathBuf]) -> Result<Vec<AttachmentUpload>, CliError> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let upload = AttachmentUpload::from_path(path)
            .await
            .map_err(CoreError::from)?;
        uploads.push(upload);
    }
    Ok(uploads)
}

/// Spinner on stderr while a request is in flight. Hidden when quiet or
/// when stderr is not a terminal.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Success toast text for a mutation result.
pub fn result_message(result: &CommandResult, fallback: &str) -> String {
    result.message().unwrap_or(fallback).to_owned()
}
