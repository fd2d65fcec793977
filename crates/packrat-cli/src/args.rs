use clap::{Parser, Subcommand, ValueEnum};
use packrat_runtime::DiscoveryScope;

#[derive(Debug, Parser)]
#[command(
    name = "packrat",
    version,
    about = "Catalog and durably archive AI agent session logs"
)]
pub struct Cli {
    /// Workspace data directory (defaults to PACKRAT_PATH or the XDG data dir)
    #[arg(long, global = true)]
    pub path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover changed session logs and refresh the catalog
    Refresh {
        #[arg(long, value_enum, default_value_t = ScopeArg::Recent)]
        scope: ScopeArg,

        /// Single-worker profile that stays out of the way of other work
        #[arg(long)]
        background: bool,
    },

    /// List indexed sessions, newest first
    List {
        /// Restrict to one source (claude_code, codex, gemini)
        #[arg(long)]
        source: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long)]
        json: bool,

        /// Skip the refresh that normally runs first
        #[arg(long)]
        no_refresh: bool,
    },

    /// Show one session by id or unique id prefix
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Pin a session for durable archival
    Pin { id: String },

    /// Unpin a session
    Unpin {
        id: String,

        /// Also delete the archived copy
        #[arg(long)]
        remove: bool,
    },

    /// List archives and their sync status
    Archives {
        #[arg(long)]
        json: bool,
    },

    /// Run one archive sync pass over every pinned session
    Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Full,
    Recent,
}

impl From<ScopeArg> for DiscoveryScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Full => DiscoveryScope::Full,
            ScopeArg::Recent => DiscoveryScope::Recent,
        }
    }
}
