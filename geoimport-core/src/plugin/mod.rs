//! Dataset plugins: interchangeable strategies that fill the import context.
//!
//! # Architecture
//!
//! Every plugin implements [`ImportPlugin`]. Opening a plugin asks the user
//! for input through an [`ImportDialog`] (or skips the dialog when
//! [`PluginParams::auto_confirm`] is set), then writes a resolved URL,
//! format and layer name onto the [`ImportContext`]. Cancelling leaves the
//! context untouched.
//!
//! Plugins are built from [`ImporterSettings`] by the static
//! [`PluginRegistry`]; there is no runtime loading.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use geoimport_core::ImportContext;
//! use geoimport_core::plugin::{ImporterSettings, PluginParams, PluginRegistry, PluginServices};
//! use geoimport_core::test_support::{ScriptedDialog, StubBoundarySearch, StubDatasetApi};
//!
//! let settings: ImporterSettings =
//!     serde_json::from_str(r#"{"importers": {"overpass": {"url": "https://o.example/api"}}}"#)
//!         .unwrap();
//! let services = PluginServices::new(
//!     Rc::new(ScriptedDialog::default()),
//!     Rc::new(StubBoundarySearch::default()),
//!     Rc::new(StubDatasetApi::default()),
//! );
//! let mut registry = PluginRegistry::from_settings(&settings, &services);
//! let mut ctx = ImportContext::new();
//! let params = PluginParams::auto("amenity=bench", None);
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! rt.block_on(registry.open_helper("Overpass", &mut ctx, params)).unwrap();
//! assert!(ctx.url.unwrap().starts_with("https://o.example/api?data="));
//! ```

mod datasets;
mod overpass;
mod registry;

use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::query::GeometryMode;
use crate::{
    BoundaryChoice, BoundarySearch, DatasetApi, DatasetChoice, FilterOption, ImportContext,
    ImportError,
};

pub use datasets::{DatasetsImporter, plugin_id};
pub use overpass::{DEFAULT_ENDPOINT, DEFAULT_NAME, OverpassImporter};
pub use registry::PluginRegistry;

/// Inputs for opening a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginParams {
    /// Filter expression, overriding the remembered one.
    pub expression: Option<String>,
    /// Geometry mode, overriding the remembered one.
    pub mode: Option<GeometryMode>,
    /// Boundary, overriding the remembered one.
    pub area: Option<BoundaryChoice>,
    /// Dataset label to pick without a dialog.
    pub dataset: Option<String>,
    /// Data-API filter value to pick without a dialog.
    pub filter: Option<String>,
    /// Resolve from these values and skip the dialog.
    pub auto_confirm: bool,
}

impl PluginParams {
    /// Parameters that confirm `expression` in `area` without a dialog.
    pub fn auto(expression: impl Into<String>, area: Option<BoundaryChoice>) -> Self {
        Self {
            expression: Some(expression.into()),
            area,
            auto_confirm: true,
            ..Self::default()
        }
    }
}

/// How an opened plugin finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOutcome {
    /// The context now holds a resolved source.
    Confirmed,
    /// The user closed the dialog; the context is unchanged.
    Cancelled,
}

/// Shared contract of dataset plugins.
#[async_trait(?Send)]
pub trait ImportPlugin {
    /// Stable identifier used by helper lookups.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Prompt for input (unless auto-confirming) and write the resolved
    /// source onto `ctx`.
    async fn open(
        &mut self,
        ctx: &mut ImportContext,
        params: PluginParams,
    ) -> Result<PluginOutcome, ImportError>;
}

/// Initial values of the Overpass form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverpassPrompt<'a> {
    /// Dialog title.
    pub title: &'a str,
    /// Pre-filled expression.
    pub expression: Option<&'a str>,
    /// Pre-selected geometry mode.
    pub mode: GeometryMode,
    /// Pre-selected boundary.
    pub boundary: Option<&'a BoundaryChoice>,
    /// Boundary search URL template.
    pub search_url: &'a str,
}

/// Values submitted from the Overpass form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassForm {
    /// Filter expression.
    pub expression: String,
    /// Geometry mode.
    pub mode: GeometryMode,
    /// Selected boundary; `None` uses the viewport.
    pub boundary: Option<BoundaryChoice>,
}

/// Initial values of a dataset picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetPrompt<'a> {
    /// Dialog title.
    pub title: &'a str,
    /// Selectable entries.
    pub choices: &'a [DatasetChoice],
    /// Pre-selected boundary.
    pub boundary: Option<&'a BoundaryChoice>,
    /// Boundary search URL template.
    pub search_url: &'a str,
}

/// Values submitted from a dataset picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSelection {
    /// Index into the prompt's choices.
    pub index: usize,
    /// Selected boundary.
    pub boundary: Option<BoundaryChoice>,
}

/// Filter values offered for a data-API dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPrompt<'a> {
    /// Dataset label.
    pub label: &'a str,
    /// Query key the value will be sent as.
    pub key: &'a str,
    /// Selectable values.
    pub options: &'a [FilterOption],
}

/// User interaction needed by the plugins. `None` means cancelled.
#[async_trait(?Send)]
pub trait ImportDialog {
    /// Ask for an expression, a mode and a boundary.
    async fn overpass(
        &self,
        prompt: OverpassPrompt<'_>,
        search: &dyn BoundarySearch,
    ) -> Option<OverpassForm>;

    /// Ask for a dataset and a boundary.
    async fn dataset(
        &self,
        prompt: DatasetPrompt<'_>,
        search: &dyn BoundarySearch,
    ) -> Option<DatasetSelection>;

    /// Ask for a data-API filter value.
    async fn filter(&self, prompt: FilterPrompt<'_>) -> Option<FilterOption>;
}

/// Collaborators shared by every plugin.
#[derive(Clone)]
pub struct PluginServices {
    /// User interaction.
    pub dialog: Rc<dyn ImportDialog>,
    /// Boundary search service.
    pub boundary_search: Rc<dyn BoundarySearch>,
    /// Dataset data-API client.
    pub dataset_api: Rc<dyn DatasetApi>,
}

impl PluginServices {
    /// Bundle the collaborators.
    #[must_use]
    pub fn new(
        dialog: Rc<dyn ImportDialog>,
        boundary_search: Rc<dyn BoundarySearch>,
        dataset_api: Rc<dyn DatasetApi>,
    ) -> Self {
        Self {
            dialog,
            boundary_search,
            dataset_api,
        }
    }
}

/// Configuration of one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Query endpoint, for the Overpass plugin.
    #[serde(default)]
    pub url: Option<String>,
    /// Boundary search URL template.
    #[serde(default, alias = "searchUrl")]
    pub search_url: Option<String>,
    /// Catalog entries, for dataset plugins.
    #[serde(default)]
    pub choices: Vec<DatasetChoice>,
}

/// Importer settings: plugin configurations keyed by plugin name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImporterSettings {
    /// Plugin configurations; keys select the plugin kind.
    #[serde(default)]
    pub importers: BTreeMap<String, PluginConfig>,
    /// Base URL of the dataset data API.
    #[serde(default)]
    pub data_api_url: Option<String>,
}
