//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod auth;
pub mod catalog;
pub mod config_cmd;
pub mod journal;
pub mod links;
pub mod rates;
pub mod records;
pub mod tree;
pub mod util;

use backoffice_core::BackOffice;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    office: &BackOffice,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(office, resolved, args, global).await,
        Command::Logout => auth::logout(office, global).await,
        Command::Whoami => auth::whoami(office, global).await,
        Command::List(args) => records::list(office, args, global).await,
        Command::Get(args) => records::get(office, args, global).await,
        Command::Create(args) => records::create(office, args, global).await,
        Command::Update(args) => records::update(office, args, global).await,
        Command::Delete(args) => records::delete(office, args, global).await,
        Command::Toggle(args) => records::toggle(office, args, global).await,
        Command::Action(args) => records::action(office, args, global).await,
        Command::Tree(args) => tree::handle(office, args, global).await,
        Command::Journal(args) => journal::handle(office, args, global).await,
        Command::Links(args) => links::handle(office, args, global).await,
        Command::Rates(args) => rates::handle(office, args, global).await,
        // Handled before a client is built
        Command::Resources | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
