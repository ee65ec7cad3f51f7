//! Sign-in, sign-out and the current user.

use std::io::{BufRead, IsTerminal};

use dialoguer::Input;
use secrecy::SecretString;

use backoffice_core::{BackOffice, Entity};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Credentials ─────────────────────────────────────────────────────

fn resolve_email(args: &LoginArgs, resolved: &Resolved) -> Result<String, CliError> {
    if let Some(email) = args.email.clone().or_else(|| resolved.profile.email.clone()) {
        return Ok(email);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: "pass --email or set email in the profile".into(),
        });
    }
    Input::new()
        .with_prompt("Email")
        .interact_text()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

fn resolve_password(args: &LoginArgs, resolved: &Resolved) -> Result<SecretString, CliError> {
    if args.password_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        return Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_owned()));
    }
    match config::resolve_password(&resolved.profile, &resolved.profile_name) {
        Ok(password) => Ok(password),
        Err(_) if std::io::stdin().is_terminal() => {
            let password = rpassword::prompt_password("Password: ")?;
            Ok(SecretString::from(password))
        }
        Err(e) => Err(e.into()),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn login(
    office: &BackOffice,
    resolved: &Resolved,
    args: LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = resolve_email(&args, resolved)?;
    let password = resolve_password(&args, resolved)?;

    let spinner = util::spinner("Signing in…", global.quiet);
    let session = office.login(&email, &password).await;
    spinner.finish_and_clear();

    let session = session?;
    let name = session.user_name().unwrap_or(email);
    output::notice(
        &format!("Signed in as {name} (profile '{}')", resolved.profile_name),
        global.quiet,
    );
    Ok(())
}

pub async fn logout(office: &BackOffice, global: &GlobalOpts) -> Result<(), CliError> {
    office.logout().await?;
    output::notice("Signed out", global.quiet);
    Ok(())
}

pub async fn whoami(office: &BackOffice, global: &GlobalOpts) -> Result<(), CliError> {
    let user = Entity::new(office.me().await?);
    let language = office.language();
    let out = output::render_single(
        global.output,
        &user,
        |u| output::entity_detail(u, language),
        |u| u.display_name(language),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
