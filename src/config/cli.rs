use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the tierlist binary.
#[derive(Debug, Parser)]
#[command(name = "tierlist", version, about = "Tier list store administration")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TIERLIST_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Print a single tier list.
    Show(ShowArgs),
    /// Print one page of an owner's tier lists.
    List(ListArgs),
    /// Print the most recent public tier lists.
    Recent,
    /// Create a tier list from a payload file.
    Create(CreateArgs),
    /// Change fields of a tier list owned by the given user.
    Update(UpdateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Toggle the tagged read cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Tier list identifier.
    #[arg(value_name = "ID")]
    pub id: Uuid,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Owner whose tier lists are listed.
    #[arg(long, value_name = "UUID")]
    pub owner: Uuid,

    /// Cursor returned by a previous page.
    #[arg(long, value_name = "CURSOR")]
    pub cursor: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    /// Owner of the new tier list.
    #[arg(long, value_name = "UUID")]
    pub owner: Uuid,

    /// JSON file holding the board payload (`sidebar` and `rows`).
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub data: PathBuf,

    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Thumbnail URL.
    #[arg(long, value_name = "URL")]
    pub thumbnail: Option<String>,

    /// Publish the tier list in the recent listing.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub public: bool,
}

#[derive(Debug, Args, Clone)]
pub struct UpdateArgs {
    /// Tier list identifier.
    #[arg(value_name = "ID")]
    pub id: Uuid,

    /// Acting user; must own the tier list.
    #[arg(long, value_name = "UUID")]
    pub owner: Uuid,

    /// JSON file holding the replacement board payload.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub data: Option<PathBuf>,

    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Remove the current description.
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "description")]
    pub clear_description: bool,

    #[arg(long, value_name = "URL")]
    pub thumbnail: Option<String>,

    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub public: Option<bool>,
}

impl UpdateArgs {
    /// Description change requested on the command line, if any.
    pub fn description_change(&self) -> Option<Option<String>> {
        if self.clear_description {
            Some(None)
        } else {
            self.description.clone().map(Some)
        }
    }
}
