//! `helper` command: open a dataset helper non-interactively.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geoimport_core::plugin::{ImporterSettings, PluginOutcome, PluginParams, PluginRegistry};
use geoimport_core::{BoundaryChoice, ImportContext, ImportFormat, LayerOptions};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::query::parse_mode;
use crate::services::{NetworkConfig, ServiceBuilder, block_on};
use crate::{
    ARG_AREA, ARG_DATASET, ARG_EXPRESSION, ARG_FILTER, ARG_MODE, ARG_NAME, ARG_SETTINGS,
    ARG_TIMEOUT_SECS, ARG_USER_AGENT, CliError, ENV_HELPER_NAME, ENV_HELPER_SETTINGS,
    network_config, write_json,
};

/// CLI arguments for the `helper` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Open the helper registered under a name or id, passing \
                 every value it would otherwise prompt for, and print the \
                 URL, format and layer it resolves.",
    about = "Resolve a dataset helper's source"
)]
#[ortho_config(prefix = "GEOIMPORT")]
pub(crate) struct HelperArgs {
    /// Helper name or id, such as `overpass`.
    #[arg(value_name = ARG_NAME)]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Importer settings JSON file.
    #[arg(long = ARG_SETTINGS, value_name = "path")]
    #[serde(default)]
    pub(crate) settings: Option<Utf8PathBuf>,
    /// Expression for the Overpass helper.
    #[arg(long = ARG_EXPRESSION, value_name = "expr")]
    #[serde(default)]
    pub(crate) expression: Option<String>,
    /// Geometry mode: `geom` or `center`.
    #[arg(long = ARG_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<String>,
    /// Area id, such as `3600002202`.
    #[arg(long = ARG_AREA, value_name = "id")]
    #[serde(default)]
    pub(crate) area: Option<String>,
    /// Dataset label, for catalog helpers.
    #[arg(long = ARG_DATASET, value_name = "label")]
    #[serde(default)]
    pub(crate) dataset: Option<String>,
    /// Filter value, for data-API datasets.
    #[arg(long = ARG_FILTER, value_name = "value")]
    #[serde(default)]
    pub(crate) filter: Option<String>,
    /// Request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// User-Agent header sent with requests.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
}

/// Values handed to a helper instead of prompting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HelperParams {
    pub(crate) expression: Option<String>,
    pub(crate) mode: Option<String>,
    pub(crate) area: Option<String>,
    pub(crate) dataset: Option<String>,
    pub(crate) filter: Option<String>,
}

impl HelperParams {
    /// Auto-confirming plugin parameters.
    pub(crate) fn to_plugin_params(&self) -> Result<PluginParams, CliError> {
        Ok(PluginParams {
            expression: self.expression.clone(),
            mode: self.mode.as_deref().map(|m| parse_mode(Some(m))).transpose()?,
            area: self.area.as_deref().and_then(BoundaryChoice::from_area_param),
            dataset: self.dataset.clone(),
            filter: self.filter.clone(),
            auto_confirm: true,
        })
    }
}

/// Resolved `helper` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HelperConfig {
    pub(crate) name: String,
    pub(crate) settings: Utf8PathBuf,
    pub(crate) params: HelperParams,
    pub(crate) network: NetworkConfig,
}

impl TryFrom<HelperArgs> for HelperConfig {
    type Error = CliError;

    fn try_from(args: HelperArgs) -> Result<Self, Self::Error> {
        let name = args.name.ok_or(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_HELPER_NAME,
        })?;
        let settings = args.settings.ok_or(CliError::MissingArgument {
            field: ARG_SETTINGS,
            env: ENV_HELPER_SETTINGS,
        })?;
        Ok(Self {
            name,
            settings,
            params: HelperParams {
                expression: args.expression,
                mode: args.mode,
                area: args.area,
                dataset: args.dataset,
                filter: args.filter,
            },
            network: network_config(args.timeout_secs, args.user_agent),
        })
    }
}

/// Read importer settings from a JSON file.
pub(crate) fn load_settings(path: &Utf8Path) -> Result<ImporterSettings, CliError> {
    let text = geoimport_fs::read_text(path).map_err(|source| CliError::ReadSource {
        field: ARG_SETTINGS,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseSettings {
        path: path.to_path_buf(),
        source,
    })
}

/// Open `name` on `ctx`, failing when it is unknown or needs a prompt.
pub(crate) fn open_helper(
    registry: &mut PluginRegistry,
    ctx: &mut ImportContext,
    name: &str,
    params: &HelperParams,
) -> Result<(), CliError> {
    let outcome = block_on(registry.open_helper(name, ctx, params.to_plugin_params()?))??;
    confirmed(name, outcome)
}

/// Map a helper outcome onto the CLI's expectations: it must exist and
/// confirm without prompting.
pub(crate) fn confirmed(name: &str, outcome: Option<PluginOutcome>) -> Result<(), CliError> {
    match outcome {
        Some(PluginOutcome::Confirmed) => Ok(()),
        Some(PluginOutcome::Cancelled) => Err(CliError::HelperCancelled(name.to_owned())),
        None => Err(CliError::UnknownHelper(name.to_owned())),
    }
}

/// Source a helper wrote onto the context.
#[derive(Debug, Serialize)]
pub(crate) struct HelperReport {
    pub(crate) url: Option<String>,
    pub(crate) format: Option<ImportFormat>,
    pub(crate) layer_name: Option<String>,
    pub(crate) layer_options: LayerOptions,
}

impl From<&ImportContext> for HelperReport {
    fn from(ctx: &ImportContext) -> Self {
        Self {
            url: ctx.url.clone(),
            format: ctx.format,
            layer_name: ctx.layer_name.clone(),
            layer_options: ctx.layer_options.clone(),
        }
    }
}

pub(crate) fn resolve_helper(
    config: &HelperConfig,
    services: &dyn ServiceBuilder,
) -> Result<HelperReport, CliError> {
    let settings = load_settings(&config.settings)?;
    let mut registry =
        PluginRegistry::from_settings(&settings, &services.plugin_services(&config.network)?);
    let mut ctx = ImportContext::new();
    open_helper(&mut registry, &mut ctx, &config.name, &config.params)?;
    Ok(HelperReport::from(&ctx))
}

pub(crate) fn run_helper(
    args: HelperArgs,
    services: &dyn ServiceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = HelperConfig::try_from(merged)?;
    write_json(writer, &resolve_helper(&config, services)?)
}
