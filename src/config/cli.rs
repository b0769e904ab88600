use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the kinship binary.
#[derive(Debug, Parser)]
#[command(
    name = "kinship",
    version,
    about = "Community options and sites directory tooling"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "KINSHIP_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the log level filter (e.g. info, debug).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL; without one, options live in memory.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the site treated as the root site.
    #[arg(long = "root-site-id", value_name = "ID", global = true)]
    pub root_site_id: Option<u64>,

    /// Override the site serving the current request.
    #[arg(long = "current-site-id", value_name = "ID", global = true)]
    pub current_site_id: Option<u64>,

    /// Shadow a stored option for this invocation (repeatable).
    #[arg(long = "override", value_name = "NAME=JSON", global = true)]
    pub option_overrides: Vec<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Install every default option that is not stored yet.
    Activate,
    /// Delete every default option.
    Uninstall,
    /// Print one option as JSON.
    Get(GetArgs),
    /// Store one option.
    Set(SetArgs),
    /// Delete one option.
    Delete(NameArgs),
    /// Print the resolved root options as JSON.
    #[command(name = "root-options")]
    RootOptions,
    /// Print every feature flag as JSON.
    Flags,
    /// Render the sites directory page to stdout.
    #[command(name = "render-directory")]
    RenderDirectory(RenderDirectoryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct NameArgs {
    /// Stored option name.
    pub name: String,
}

#[derive(Debug, Args, Clone)]
pub struct GetArgs {
    /// Stored option name.
    pub name: String,

    /// JSON value returned when the option is not stored.
    #[arg(long, value_name = "JSON")]
    pub default: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SetArgs {
    /// Stored option name.
    pub name: String,

    /// JSON value: a boolean, a string or an array of strings.
    #[arg(value_name = "JSON")]
    pub value: String,
}

#[derive(Debug, Args, Clone)]
pub struct RenderDirectoryArgs {
    /// TOML fixture describing the listed sites.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub sites: PathBuf,

    /// Render for this signed-in user; omit for an anonymous visitor.
    #[arg(long = "user-id", value_name = "ID")]
    pub user_id: Option<u64>,

    /// Value for the referer field of the filter form.
    #[arg(long, value_name = "PATH", default_value = "/sites/")]
    pub referer: String,

    /// Search term echoed into the legacy search form.
    #[arg(long, value_name = "TERMS")]
    pub search: Option<String>,
}
