//! Clap derive structures for the `backoffice` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only depends on clap so `build.rs` can render man pages from it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// backoffice -- HR and accounting back office from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "backoffice",
    version,
    about = "Manage the HR and accounting back office from the command line",
    long_about = "Browse and edit back-office records: employees, attendance, payroll,\n\
        the chart of accounts, cost centers, journal entries, treasury and more.\n\n\
        Every resource follows the same list / get / create / update / delete shape.\n\
        Run `backoffice resources` for the catalog.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "BACKOFFICE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, short = 'u', env = "BACKOFFICE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Response language sent as Accept-Language
    #[arg(long, env = "BACKOFFICE_LANG", global = true)]
    pub lang: Option<LangArg>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BACKOFFICE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BACKOFFICE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BACKOFFICE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output, Color & Language Enums ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LangArg {
    /// Arabic
    Ar,
    /// English
    En,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session for the active profile
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List every resource module and what it supports
    #[command(alias = "catalog")]
    Resources,

    /// List one page of a resource
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a single record
    Get(RecordArgs),

    /// Create a record from a JSON file
    Create(CreateArgs),

    /// Update a record from a JSON file
    Update(UpdateArgs),

    /// Delete a record
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Flip a record's active status
    Toggle(RecordArgs),

    /// Run a domain action (post, accept, approve, reject, close, reopen)
    Action(ActionArgs),

    /// Show the account or cost-center hierarchy
    Tree(TreeArgs),

    /// Journal entries: lines, totals and attachments
    #[command(alias = "je")]
    Journal(JournalArgs),

    /// Default accounts linked to ledger roles
    Links(LinksArgs),

    /// Exchange rates
    Rates(RatesArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (defaults to the profile's email)
    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Read the password from stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RECORDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Resource name (e.g. vendors, journal-entries)
    pub resource: String,

    /// Page to show
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Records per page (overrides profile)
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Extra filter, repeatable (e.g. --filter status=draft)
    #[arg(long, short = 'f', value_name = "KEY=VALUE")]
    pub filter: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Resource name
    pub resource: String,

    /// Record ID
    pub id: String,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Resource name
    pub resource: String,

    /// Record ID
    pub id: String,

    /// List page the record is on; the page to show next is listed after
    /// the delete
    #[arg(long)]
    pub page: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Resource name
    pub resource: String,

    /// JSON file with the record fields
    #[arg(long, short = 'F')]
    pub from_file: PathBuf,

    /// File to attach, repeatable (multipart upload)
    #[arg(long, short = 'a')]
    pub attach: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Resource name
    pub resource: String,

    /// Record ID
    pub id: String,

    /// JSON file with the changed fields
    #[arg(long, short = 'F')]
    pub from_file: PathBuf,

    /// File to attach, repeatable (multipart upload)
    #[arg(long, short = 'a')]
    pub attach: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ActionArgs {
    /// Resource name
    pub resource: String,

    /// Record ID
    pub id: String,

    /// Action name
    pub action: String,

    /// Optional JSON body sent with the action
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TREE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Which hierarchy to show
    pub resource: TreeResource,

    /// Only show the subtree under this node ID
    #[arg(long)]
    pub root: Option<String>,

    /// Hide inactive nodes
    #[arg(long)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TreeResource {
    /// Chart of accounts
    Accounts,
    /// Cost centers
    CostCenters,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  JOURNAL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct JournalArgs {
    #[command(subcommand)]
    pub command: JournalCommand,
}

#[derive(Debug, Subcommand)]
pub enum JournalCommand {
    /// Show an entry with its lines, totals and attachments
    Show {
        /// Journal entry ID
        id: String,
    },

    /// Upload files to an existing entry
    Attach {
        /// Journal entry ID
        id: String,

        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete one attachment of an entry
    Detach {
        /// Journal entry ID
        id: String,

        /// Attachment ID
        attachment_id: String,
    },

    /// Post an entry to the ledger
    Post {
        /// Journal entry ID
        id: String,
    },

    /// Accept an entry
    Accept {
        /// Journal entry ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACCOUNT LINKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LinksArgs {
    #[command(subcommand)]
    pub command: LinksCommand,
}

#[derive(Debug, Subcommand)]
pub enum LinksCommand {
    /// Show every ledger role and its linked account
    List,

    /// Link accounts to roles; only roles that change are sent
    Set {
        /// Assignments as ROLE=ACCOUNT_ID, or ROLE=none to unlink
        #[arg(required = true, value_name = "ROLE=ACCOUNT")]
        assignments: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RATES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RatesArgs {
    #[command(subcommand)]
    pub command: RatesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RatesCommand {
    /// Rate in effect for a currency on a date
    Effective {
        /// Currency ID
        currency_id: String,

        /// Date (YYYY-MM-DD), defaults to today on the server
        #[arg(long, short = 'd')]
        date: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG & COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a profile value (e.g. "base_url", "per_page")
    Set {
        /// Profile key
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
