//! Command-line interface for the geoimport engine.
//!
//! Subcommands:
//! - `detect`: infer the import format of local files;
//! - `query`: build an Overpass query and its fetch URL;
//! - `areas`: search boundaries by name;
//! - `helper`: open a configured dataset helper and print what it resolved;
//! - `import`: run an import into an in-memory map and print a summary.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

mod areas;
mod detect;
mod error;
mod helper;
mod import;
mod query;
mod services;

pub use error::CliError;

use areas::AreasArgs;
use detect::DetectArgs;
use helper::HelperArgs;
use import::ImportArgs;
use query::QueryArgs;
use services::{HttpServiceBuilder, NetworkConfig, ServiceBuilder};

const ARG_EXPRESSION: &str = "expression";
const ARG_MODE: &str = "mode";
const ARG_AREA: &str = "area";
const ARG_ENDPOINT: &str = "endpoint";
const ARG_TEXT: &str = "text";
const ARG_SEARCH_URL: &str = "search-url";
const ARG_NAME: &str = "name";
const ARG_SETTINGS: &str = "settings";
const ARG_DATASET: &str = "dataset";
const ARG_FILTER: &str = "filter";
const ARG_FILE: &str = "file";
const ARG_URL: &str = "url";
const ARG_RAW: &str = "raw";
const ARG_FORMAT: &str = "format";
const ARG_ACTION: &str = "action";
const ARG_LAYER_NAME: &str = "layer-name";
const ARG_HELPER: &str = "helper";
const ARG_BBOX: &str = "bbox";
const ARG_OUTPUT: &str = "output";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_USER_AGENT: &str = "user-agent";
const ENV_QUERY_EXPRESSION: &str = "GEOIMPORT_CMDS_QUERY_EXPRESSION";
const ENV_AREAS_TEXT: &str = "GEOIMPORT_CMDS_AREAS_TEXT";
const ENV_HELPER_NAME: &str = "GEOIMPORT_CMDS_HELPER_NAME";
const ENV_HELPER_SETTINGS: &str = "GEOIMPORT_CMDS_HELPER_SETTINGS";
const ENV_IMPORT_SETTINGS: &str = "GEOIMPORT_CMDS_IMPORT_SETTINGS";

/// Run the geoimport CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli.command, &HttpServiceBuilder, &mut stdout)
}

fn run_with(
    command: Command,
    services: &dyn ServiceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Detect(args) => detect::run_detect(args, writer),
        Command::Query(args) => query::run_query(args, writer),
        Command::Areas(args) => areas::run_areas(args, services, writer),
        Command::Helper(args) => helper::run_helper(args, services, writer),
        Command::Import(args) => import::run_import(args, services, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "geoimport",
    about = "Import map data from files, URLs and curated datasets",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Infer the import format of local files.
    Detect(DetectArgs),
    /// Build an Overpass filter query.
    Query(QueryArgs),
    /// Search boundaries by name.
    Areas(AreasArgs),
    /// Open a dataset helper and print the source it resolves.
    Helper(HelperArgs),
    /// Import data into an in-memory map.
    Import(ImportArgs),
}

fn network_config(timeout_secs: Option<u64>, user_agent: Option<String>) -> NetworkConfig {
    let defaults = NetworkConfig::default();
    NetworkConfig {
        timeout: timeout_secs.map_or(defaults.timeout, Duration::from_secs),
        user_agent: user_agent.unwrap_or(defaults.user_agent),
    }
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
