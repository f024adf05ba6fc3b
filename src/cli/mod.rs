//! CLI entry point for oauthflows.

pub mod auth;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// OAuth2 browser login for command-line programs
#[derive(Parser, Debug)]
#[command(name = "oauthflows", version, about = "OAuth2 loopback login and token cache")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize in the browser and cache the token
    Login(LoginArgs),
    /// Show the cached token for a client and scope set
    Status(CredentialArgs),
    /// Remove the cached token for a client and scope set
    Logout(CredentialArgs),
}

/// Client identity and scopes shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Client secrets JSON downloaded from the provider console
    #[arg(long, value_name = "PATH")]
    pub client_secrets: PathBuf,

    /// Scope to request (repeatable, or comma separated)
    #[arg(long = "scope", value_delimiter = ',')]
    pub scopes: Vec<String>,

    /// Directory for cached tokens (default: ~/.oauthflows)
    #[arg(long, value_name = "DIR")]
    pub token_dir: Option<PathBuf>,
}

/// Arguments for `oauthflows login`.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// Fail when the provider grants fewer scopes than requested
    #[arg(long)]
    pub fail_on_missing_scopes: bool,

    /// Skip the on-disk token cache
    #[arg(long)]
    pub no_cache: bool,

    /// Give up waiting for the browser after this many seconds
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
}
