use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use gateway_cost_control::CostControlConfig;

mod log;

pub(crate) use self::log::{LogLevel, LogStyle};

#[derive(Debug, Parser)]
#[command(name = "graphql-cost", version)]
#[command(arg_required_else_help = true)]
/// Cost analysis of GraphQL operations from the @cost and @listSize directives
pub(crate) struct Args {
    #[command(subcommand)]
    pub command: Command,
    /// Set the logging level
    #[arg(long = "log", env = "GRAPHQL_COST_LOG", global = true)]
    pub log_level: Option<LogLevel>,
    /// Set the style of log output
    #[arg(long, env = "GRAPHQL_COST_LOG_STYLE", default_value_t = LogStyle::Text, global = true)]
    pub log_style: LogStyle,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the cost map of a subgraph schema
    Extract {
        /// Path to the subgraph SDL
        schema: PathBuf,
    },
    /// Fetch the schemas of all the subgraphs of a supergraph and print their merged cost map
    Federated {
        /// Path to the supergraph SDL
        supergraph: PathBuf,
        /// Path to the TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Estimate the cost of an operation and, given a response, its realized cost
    Analyze(AnalyzeArgs),
}

#[derive(Debug, clap::Args)]
#[clap(group(ArgGroup::new("costs").args(["cost_map", "subgraph"])))]
pub(crate) struct AnalyzeArgs {
    /// Path to the API schema SDL
    #[arg(long, short)]
    pub schema: PathBuf,
    /// Path to a cost map, as printed by the extract and federated commands
    #[arg(long)]
    pub cost_map: Option<PathBuf>,
    /// Path to a cost-annotated subgraph SDL. Can be repeated.
    #[arg(long)]
    pub subgraph: Vec<PathBuf>,
    /// Path to the operation
    #[arg(long, short)]
    pub query: PathBuf,
    /// Name of the operation to analyze in documents with several operations
    #[arg(long)]
    pub operation_name: Option<String>,
    /// Path to a JSON file with the variables of the operation
    #[arg(long)]
    pub variables: Option<PathBuf>,
    /// Path to a JSON file with the response of the operation
    #[arg(long)]
    pub response: Option<PathBuf>,
    /// Path to the TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub cost_control: Option<CostControlConfig>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let content = read(path)?;

        toml::from_str(&content).with_context(|| format!("error parsing configuration {}", path.display()))
    }
}

pub(crate) fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("error reading {}", path.display()))
}

pub(crate) fn parse() -> Args {
    Args::parse()
}
