//! CLI parse: clap types for odoo-agent. No behavior; definitions only.

use crate::script::OnError;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// odoo-agent CLI - guarded access to Odoo's external API
#[derive(Parser, Debug)]
#[command(name = "odoo-agent")]
#[command(about = "Guarded command-line access to Odoo's external API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Profile to use (falls back to ODOO_PROFILE, then the default profile)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Allow mutations on a read-only profile
    #[arg(long, global = true)]
    pub force: bool,

    /// Context entry for every call, as key=value (repeatable)
    #[arg(long = "context", value_name = "KEY=VALUE", global = true)]
    pub context: Vec<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Bypass the result cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search records; returns ids, or records when --fields is given
    Search {
        model: String,
        /// Domain as JSON, e.g. '[["is_company","=",true]]'
        #[arg(long, default_value = "[]")]
        domain: String,
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        order: Option<String>,
    },
    /// Read records by id
    Read {
        model: String,
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },
    /// Count records matching a domain
    Count {
        model: String,
        #[arg(long, default_value = "[]")]
        domain: String,
    },
    /// Show field definitions of a model
    Fields {
        model: String,
        #[arg(long, value_delimiter = ',')]
        attributes: Option<Vec<String>>,
    },
    /// List installed models
    Models,
    /// Create a record
    Create {
        model: String,
        /// Field values as a JSON object
        #[arg(long)]
        values: String,
    },
    /// Update records
    Update {
        model: String,
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
        /// Field values as a JSON object
        #[arg(long)]
        values: String,
    },
    /// Delete records
    Delete {
        model: String,
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// Call any model method
    Execute {
        model: String,
        method: String,
        /// Positional arguments as a JSON list
        #[arg(long, default_value = "[]")]
        args: String,
        /// Keyword arguments as a JSON object
        #[arg(long, default_value = "{}")]
        kwargs: String,
    },
    /// Run a script document (JSON, or TOML by extension)
    Run {
        script: PathBuf,
        /// Failure policy; overrides the document's on_error
        #[arg(long)]
        on_error: Option<OnError>,
    },
    /// List configured profiles
    Profiles,
    /// Result cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Remove every cached result
    Clear,
}

impl Commands {
    /// Short command name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Search { .. } => "search",
            Commands::Read { .. } => "read",
            Commands::Count { .. } => "count",
            Commands::Fields { .. } => "fields",
            Commands::Models => "models",
            Commands::Create { .. } => "create",
            Commands::Update { .. } => "update",
            Commands::Delete { .. } => "delete",
            Commands::Execute { .. } => "execute",
            Commands::Run { .. } => "run",
            Commands::Profiles => "profiles",
            Commands::Cache { .. } => "cache",
        }
    }
}
