//! Error types emitted by the geoimport CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use geoimport_core::ImportError;
use geoimport_core::query::QueryError;
use geoimport_data::ProviderBuildError;
use thiserror::Error;

/// Errors emitted by the geoimport CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// An option holds a value that cannot be used.
    #[error("invalid {field}: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },
    /// No import source, or more than one, was given.
    #[error("choose exactly one source among --file, --url, --raw and --helper")]
    SourceChoice,
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be read.
    #[error("failed to read {field} path {path:?}: {source}")]
    ReadSource {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Importer settings JSON could not be decoded.
    #[error("failed to parse importer settings at {path:?}: {source}")]
    ParseSettings {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The named helper is not configured.
    #[error("no helper named {0:?} is configured")]
    UnknownHelper(String),
    /// A helper was opened without the values it needs and cancelled.
    #[error("helper {0:?} needs more input than was given")]
    HelperCancelled(String),
    /// Building a query failed.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// The import, helper or search failed.
    #[error("{}", .0.user_message())]
    Import(#[from] ImportError),
    /// Constructing the HTTP client failed.
    #[error(transparent)]
    BuildHttpClient(#[from] ProviderBuildError),
    /// Starting the async runtime failed.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
