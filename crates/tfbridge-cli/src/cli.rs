use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tfbridge",
    about = "Propose and diff resource states against provider schemas",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Engine settings (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub engine_config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge prior state with configuration into a proposed state
    Propose(ProposeArgs),
    /// Diff a prior state against a planned state
    Diff(DiffArgs),
    /// Apply defaults, propose, and diff in one step
    Plan(ProposeArgs),
    /// Convert an upstream JSON schema to the native format
    Schema(SchemaArgs),
}

#[derive(Args)]
pub struct SchemaSource {
    /// Resource schema file
    #[arg(long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Read the schema in the upstream JSON schema format
    #[arg(long)]
    pub tfjson: bool,
}

#[derive(Args)]
pub struct ProposeArgs {
    #[command(flatten)]
    pub schema: SchemaSource,

    /// Prior state (host property JSON); omitted means the resource is new
    #[arg(long, value_name = "FILE")]
    pub prior: Option<PathBuf>,

    /// Resource configuration (host property JSON)
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub schema: SchemaSource,

    /// Prior state (host property JSON); omitted means the resource is new
    #[arg(long, value_name = "FILE")]
    pub prior: Option<PathBuf>,

    /// Planned state (host property JSON)
    #[arg(long, value_name = "FILE")]
    pub planned: PathBuf,

    /// Force (`true`) or suppress (`false`) replacement
    #[arg(long, value_name = "BOOL")]
    pub replace_override: Option<bool>,
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Upstream JSON schema of one resource type
    #[arg(long, value_name = "FILE")]
    pub tfjson: PathBuf,
}
