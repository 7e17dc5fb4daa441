//! `import` command: run an import into an in-memory map.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geo::{Coord, Rect};
use geoimport_core::plugin::{ImporterSettings, PluginRegistry};
use geoimport_core::{
    ImportAction, ImportFormat, ImportReport, Importer, LayerId, MemoryMap, RemoteData,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::detect::load_file;
use crate::helper::{HelperParams, confirmed, load_settings};
use crate::services::{NetworkConfig, ServiceBuilder, block_on};
use crate::{
    ARG_ACTION, ARG_AREA, ARG_BBOX, ARG_DATASET, ARG_EXPRESSION, ARG_FILE, ARG_FILTER, ARG_FORMAT,
    ARG_HELPER, ARG_LAYER_NAME, ARG_MODE, ARG_OUTPUT, ARG_RAW, ARG_SETTINGS, ARG_TIMEOUT_SECS,
    ARG_URL, ARG_USER_AGENT, CliError, ENV_IMPORT_SETTINGS, network_config, write_json,
};

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Import local files, pasted text, a URL or a dataset helper's \
                 source into a fresh in-memory map, then print the report \
                 and the resulting layers as JSON.",
    about = "Import data into an in-memory map"
)]
#[ortho_config(prefix = "GEOIMPORT")]
pub(crate) struct ImportArgs {
    /// Local file to import; repeat for several.
    #[arg(long = ARG_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) file: Vec<Utf8PathBuf>,
    /// Remote URL to import.
    #[arg(long = ARG_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Text to import as if pasted.
    #[arg(long = ARG_RAW, value_name = "text")]
    #[serde(default)]
    pub(crate) raw: Option<String>,
    /// Dataset helper resolving the source, such as `overpass`.
    #[arg(long = ARG_HELPER, value_name = "name")]
    #[serde(default)]
    pub(crate) helper: Option<String>,
    /// Importer settings JSON file, required with --helper.
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
    /// Payload format; inferred from file names when omitted.
    #[arg(long = ARG_FORMAT, value_name = "format")]
    #[serde(default)]
    pub(crate) format: Option<String>,
    /// `copy` or `link`, for URL sources.
    #[arg(long = ARG_ACTION, value_name = "action")]
    #[serde(default)]
    pub(crate) action: Option<String>,
    /// Name of the layer created for the import.
    #[arg(long = ARG_LAYER_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) layer_name: Option<String>,
    /// Viewport as `west,south,east,north`.
    #[arg(long = ARG_BBOX, value_name = "bbox")]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Route linked layers through the map's proxy.
    #[arg(long)]
    #[serde(default)]
    pub(crate) proxy: bool,
    /// Write the summary here instead of stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// User-Agent header sent with requests.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
}

/// Where the imported data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportSource {
    Files(Vec<Utf8PathBuf>),
    Url(String),
    Raw(String),
    Helper {
        name: String,
        settings: Utf8PathBuf,
        params: HelperParams,
    },
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportConfig {
    pub(crate) source: ImportSource,
    pub(crate) format: Option<ImportFormat>,
    pub(crate) action: ImportAction,
    pub(crate) layer_name: Option<String>,
    pub(crate) viewport: Option<Rect<f64>>,
    pub(crate) proxy: bool,
    pub(crate) output: Option<Utf8PathBuf>,
    pub(crate) network: NetworkConfig,
}

/// Parse `west,south,east,north`.
pub(crate) fn parse_bbox(raw: &str) -> Result<Rect<f64>, CliError> {
    let invalid = |message: &str| CliError::InvalidArgument {
        field: ARG_BBOX,
        message: message.to_owned(),
    };
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| invalid(&err.to_string()))?;
    let [west, south, east, north] = values.as_slice() else {
        return Err(invalid("expected west,south,east,north"));
    };
    if west >= east || south >= north {
        return Err(invalid("west must be below east and south below north"));
    }
    Ok(Rect::new(
        Coord { x: *west, y: *south },
        Coord { x: *east, y: *north },
    ))
}

fn parse_action(raw: &str) -> Result<ImportAction, CliError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "copy" => Ok(ImportAction::Copy),
        "link" => Ok(ImportAction::Link),
        other => Err(CliError::InvalidArgument {
            field: ARG_ACTION,
            message: format!("expected copy or link, found {other:?}"),
        }),
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let mut sources = Vec::new();
        if !args.file.is_empty() {
            sources.push(ImportSource::Files(args.file));
        }
        if let Some(url) = args.url {
            sources.push(ImportSource::Url(url));
        }
        if let Some(raw) = args.raw {
            sources.push(ImportSource::Raw(raw));
        }
        if let Some(name) = args.helper {
            let settings = args.settings.ok_or(CliError::MissingArgument {
                field: ARG_SETTINGS,
                env: ENV_IMPORT_SETTINGS,
            })?;
            sources.push(ImportSource::Helper {
                name,
                settings,
                params: HelperParams {
                    expression: args.expression,
                    mode: args.mode,
                    area: args.area,
                    dataset: args.dataset,
                    filter: args.filter,
                },
            });
        }
        let source = match sources.pop() {
            Some(source) if sources.is_empty() => source,
            _ => return Err(CliError::SourceChoice),
        };
        let format = args
            .format
            .as_deref()
            .map(|raw| {
                raw.parse::<ImportFormat>()
                    .map_err(|err| CliError::InvalidArgument {
                        field: ARG_FORMAT,
                        message: err.to_string(),
                    })
            })
            .transpose()?;
        Ok(Self {
            source,
            format,
            action: args
                .action
                .as_deref()
                .map(parse_action)
                .transpose()?
                .unwrap_or_default(),
            layer_name: args.layer_name,
            viewport: args.bbox.as_deref().map(parse_bbox).transpose()?,
            proxy: args.proxy,
            output: args.output,
            network: network_config(args.timeout_secs, args.user_agent),
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LayerReport {
    pub(crate) id: LayerId,
    pub(crate) name: Option<String>,
    pub(crate) features: usize,
    pub(crate) remote: Option<RemoteData>,
}

/// Outcome of an import and the layers it left on the map.
#[derive(Debug, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) message: String,
    pub(crate) count: Option<usize>,
    pub(crate) layers: Vec<LayerReport>,
}

impl ImportSummary {
    fn new(report: ImportReport, map: &MemoryMap) -> Self {
        Self {
            message: report.message,
            count: report.count,
            layers: map
                .all_layers()
                .iter()
                .map(|layer| LayerReport {
                    id: layer.id,
                    name: layer.options.name.clone(),
                    features: layer.features.len(),
                    remote: layer.remote.clone(),
                })
                .collect(),
        }
    }
}

fn registry(
    config: &ImportConfig,
    services: &dyn ServiceBuilder,
) -> Result<PluginRegistry, CliError> {
    let settings = match &config.source {
        ImportSource::Helper { settings, .. } => load_settings(settings)?,
        _ => ImporterSettings::default(),
    };
    Ok(PluginRegistry::from_settings(
        &settings,
        &services.plugin_services(&config.network)?,
    ))
}

pub(crate) fn execute_import(
    config: &ImportConfig,
    services: &dyn ServiceBuilder,
) -> Result<ImportSummary, CliError> {
    let mut map = MemoryMap::new().with_proxy(config.proxy);
    if let Some(viewport) = config.viewport {
        map = map.with_viewport(viewport);
    }
    let mut importer = Importer::new(
        registry(config, services)?,
        services.import_services(&config.network)?,
    );
    importer.open(&map);

    match &config.source {
        ImportSource::Files(paths) => {
            let files = paths
                .iter()
                .map(|path| load_file(path, ARG_FILE))
                .collect::<Result<Vec<_>, _>>()?;
            importer.context_mut().set_files(files);
        }
        ImportSource::Url(url) => importer.context_mut().set_url(url.clone()),
        ImportSource::Raw(text) => importer.context_mut().set_raw(text.clone()),
        ImportSource::Helper { name, params, .. } => {
            let outcome = block_on(importer.open_plugin(name, params.to_plugin_params()?))??;
            confirmed(name, outcome)?;
        }
    }

    let ctx = importer.context_mut();
    if let Some(format) = config.format {
        ctx.set_format(format);
    }
    ctx.action = Some(config.action);
    if let Some(name) = &config.layer_name {
        ctx.layer_name = Some(name.clone());
    }

    let report = block_on(importer.submit(&mut map))??;
    log::info!("{}", report.message);
    Ok(ImportSummary::new(report, &map))
}

pub(crate) fn run_import(
    args: ImportArgs,
    services: &dyn ServiceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ImportConfig::try_from(merged)?;
    let summary = execute_import(&config, services)?;
    match &config.output {
        Some(path) => {
            let mut buffer = Vec::new();
            write_json(&mut buffer, &summary)?;
            geoimport_fs::write_file(path, &buffer).map_err(CliError::WriteOutput)
        }
        None => write_json(writer, &summary),
    }
}
