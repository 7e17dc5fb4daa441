//! `query` command: build an Overpass filter query.

use std::io::Write;

use clap::Parser;
use geoimport_core::BoundaryChoice;
use geoimport_core::plugin::DEFAULT_ENDPOINT;
use geoimport_core::query::{self, GeometryMode, QuerySpec, UnknownGeometryMode};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_AREA, ARG_ENDPOINT, ARG_EXPRESSION, ARG_MODE, CliError, ENV_QUERY_EXPRESSION, write_json,
};

/// CLI arguments for the `query` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Build the filter query for a tag or element expression. \
                 Without an area the query is bounded by viewport \
                 placeholders.",
    about = "Build an Overpass filter query"
)]
#[ortho_config(prefix = "GEOIMPORT")]
pub(crate) struct QueryArgs {
    /// Tag expression such as `amenity=bench`, or element statements.
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
    /// Endpoint the fetch URL points at.
    #[arg(long = ARG_ENDPOINT, value_name = "url")]
    #[serde(default)]
    pub(crate) endpoint: Option<String>,
}

impl QueryArgs {
    fn into_config(self) -> Result<QueryConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        QueryConfig::try_from(merged)
    }
}

/// Resolved `query` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueryConfig {
    pub(crate) expression: String,
    pub(crate) mode: GeometryMode,
    pub(crate) area: Option<BoundaryChoice>,
    pub(crate) endpoint: String,
}

/// Parse a geometry mode option, defaulting to full geometries.
pub(crate) fn parse_mode(raw: Option<&str>) -> Result<GeometryMode, CliError> {
    raw.map_or(Ok(GeometryMode::default()), |mode| {
        mode.parse()
            .map_err(|err: UnknownGeometryMode| CliError::InvalidArgument {
                field: ARG_MODE,
                message: err.to_string(),
            })
    })
}

impl TryFrom<QueryArgs> for QueryConfig {
    type Error = CliError;

    fn try_from(args: QueryArgs) -> Result<Self, Self::Error> {
        let expression = args.expression.ok_or(CliError::MissingArgument {
            field: ARG_EXPRESSION,
            env: ENV_QUERY_EXPRESSION,
        })?;
        Ok(Self {
            expression,
            mode: parse_mode(args.mode.as_deref())?,
            area: args.area.as_deref().and_then(BoundaryChoice::from_area_param),
            endpoint: args.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
        })
    }
}

/// A built query and the URL that fetches it.
#[derive(Debug, Serialize)]
pub(crate) struct QueryReport {
    pub(crate) query: String,
    pub(crate) url: String,
}

pub(crate) fn build_query(config: &QueryConfig) -> Result<QueryReport, CliError> {
    let built = query::build(&config.expression, config.mode, config.area.as_ref())?;
    let spec = QuerySpec::new(&config.endpoint, &built);
    Ok(QueryReport {
        query: built,
        url: spec.url,
    })
}

pub(crate) fn run_query(args: QueryArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    write_json(writer, &build_query(&config)?)
}
