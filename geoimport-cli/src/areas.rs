//! `areas` command: search boundaries by name.

use std::io::Write;

use clap::Parser;
use geoimport_core::{BoundaryChoice, BoundaryPicker};
use geoimport_core::boundary::DEFAULT_SEARCH_URL;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::services::{NetworkConfig, ServiceBuilder, block_on};
use crate::{
    ARG_SEARCH_URL, ARG_TEXT, ARG_TIMEOUT_SECS, ARG_USER_AGENT, CliError, ENV_AREAS_TEXT,
    network_config, write_json,
};

/// CLI arguments for the `areas` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Search boundaries by name")]
#[ortho_config(prefix = "GEOIMPORT")]
pub(crate) struct AreasArgs {
    /// Free-text area name.
    #[arg(value_name = ARG_TEXT)]
    #[serde(default)]
    pub(crate) text: Option<String>,
    /// Search URL template containing `{q}`.
    #[arg(long = ARG_SEARCH_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) search_url: Option<String>,
    /// Request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// User-Agent header sent with requests.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
}

/// Resolved `areas` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AreasConfig {
    pub(crate) text: String,
    pub(crate) search_url: String,
    pub(crate) network: NetworkConfig,
}

impl TryFrom<AreasArgs> for AreasConfig {
    type Error = CliError;

    fn try_from(args: AreasArgs) -> Result<Self, Self::Error> {
        let text = args
            .text
            .filter(|text| !text.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_TEXT,
                env: ENV_AREAS_TEXT,
            })?;
        Ok(Self {
            text,
            search_url: args
                .search_url
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_owned()),
            network: network_config(args.timeout_secs, args.user_agent),
        })
    }
}

pub(crate) fn search_areas(
    config: &AreasConfig,
    services: &dyn ServiceBuilder,
) -> Result<Vec<BoundaryChoice>, CliError> {
    let plugin_services = services.plugin_services(&config.network)?;
    let search = plugin_services.boundary_search;
    let mut picker = BoundaryPicker::default();
    let shown = block_on(picker.refresh(search.as_ref(), &config.search_url, &config.text))??;
    Ok(shown.to_vec())
}

pub(crate) fn run_areas(
    args: AreasArgs,
    services: &dyn ServiceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = AreasConfig::try_from(merged)?;
    write_json(writer, &search_areas(&config, services)?)
}
