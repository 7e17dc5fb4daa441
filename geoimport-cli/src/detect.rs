//! `detect` command: infer the format of local files.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geoimport_core::{ImportFile, ImportFormat, detect_file_format, resolve_format};
use serde::Serialize;

use crate::{ARG_FILE, CliError, write_json};

/// CLI arguments for the `detect` subcommand.
#[derive(Debug, Clone, Parser, Default)]
#[command(about = "Infer the import format of local files")]
pub(crate) struct DetectArgs {
    /// Files to inspect.
    #[arg(value_name = "path", required = true)]
    pub(crate) files: Vec<Utf8PathBuf>,
}

#[derive(Debug, Serialize)]
struct DetectedFile {
    name: String,
    format: Option<ImportFormat>,
}

/// Formats of each file and of the batch.
#[derive(Debug, Serialize)]
pub(crate) struct DetectReport {
    files: Vec<DetectedFile>,
    /// Shared format, `None` when the files disagree or one is unknown.
    pub(crate) format: Option<ImportFormat>,
}

/// Load `path` as an import file, reporting failures against `field`.
pub(crate) fn load_file(path: &Utf8Path, field: &'static str) -> Result<ImportFile, CliError> {
    match geoimport_fs::file_is_file(path) {
        Ok(true) => {}
        Ok(false) if path.exists() => {
            return Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            });
        }
        Ok(false) => {
            return Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(CliError::ReadSource {
                field,
                path: path.to_path_buf(),
                source,
            });
        }
    }
    geoimport_fs::read_import_file(path).map_err(|source| CliError::ReadSource {
        field,
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn detect(args: &DetectArgs) -> Result<DetectReport, CliError> {
    let files = args
        .files
        .iter()
        .map(|path| load_file(path, ARG_FILE))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DetectReport {
        files: files
            .iter()
            .map(|file| DetectedFile {
                name: file.name.clone(),
                format: detect_file_format(file),
            })
            .collect(),
        format: resolve_format(&files),
    })
}

pub(crate) fn run_detect(args: DetectArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    write_json(writer, &detect(&args)?)
}
