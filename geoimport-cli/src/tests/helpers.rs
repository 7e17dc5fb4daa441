//! Stub collaborators and on-disk fixtures for CLI tests.

use crate::CliError;
use crate::services::{NetworkConfig, ServiceBuilder};
use camino::Utf8PathBuf;
use geoimport_core::plugin::PluginServices;
use geoimport_core::test_support::{
    ScriptedDialog, StubBoundarySearch, StubDatasetApi, StubRemoteSource,
};
use geoimport_core::{BoundaryChoice, ImportServices};
use geoimport_data::GeoDecoder;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

pub(super) const CSV_POINTS: &str = "name,lat,lon\nBellecour,45.7640,4.8357\nTerreaux,45.7676,4.8344\n";

pub(super) const OVERPASS_SETTINGS: &str = r#"{
    "importers": {"overpass": {"url": "https://overpass.example/api/interpreter"}}
}"#;

/// Services answering every fetch with one body and every search with
/// fixed candidates.
#[derive(Debug, Default, Clone)]
pub(super) struct StubServices {
    pub(super) body: Option<String>,
    pub(super) choices: Vec<BoundaryChoice>,
}

impl StubServices {
    pub(super) fn serving(body: &str) -> Self {
        Self {
            body: Some(body.to_owned()),
            ..Self::default()
        }
    }
}

impl ServiceBuilder for StubServices {
    fn import_services(&self, _network: &NetworkConfig) -> Result<ImportServices, CliError> {
        let remote = self
            .body
            .as_deref()
            .map_or_else(StubRemoteSource::default, StubRemoteSource::with_body);
        Ok(ImportServices::new(Rc::new(remote), Rc::new(GeoDecoder)))
    }

    fn plugin_services(&self, _network: &NetworkConfig) -> Result<PluginServices, CliError> {
        Ok(PluginServices::new(
            Rc::new(ScriptedDialog::default()),
            Rc::new(StubBoundarySearch::with_choices(self.choices.clone())),
            Rc::new(StubDatasetApi::default()),
        ))
    }
}

/// Temporary directory holding input files.
#[derive(Debug)]
pub(super) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub(super) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("utf-8 temp path")
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }
}
