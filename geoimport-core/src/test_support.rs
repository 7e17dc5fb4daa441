//! Test doubles for the importer's collaborators.
//!
//! Every stub answers from pre-configured data and records what it was
//! asked, so unit and behaviour tests can run without a network or a user.
//! Gated behind the `test-support` feature (and `cfg(test)`).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use geo::Point;
use tokio::runtime::Builder;

use crate::plugin::{
    DatasetPrompt, DatasetSelection, FilterPrompt, ImportDialog, OverpassForm, OverpassPrompt,
    PluginServices,
};
use crate::query::GeometryMode;
use crate::{
    BoundaryChoice, BoundarySearch, DatasetApi, FeatureDecoder, FilterOption, ImportError,
    ImportFormat, ImportedFeature, NativeDocument, RemoteSource,
};

/// Drive a future to completion on a current-thread Tokio runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
pub fn block_on<F: Future>(future: F) -> F::Output {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}

/// Point feature with a `name` property equal to its id.
#[must_use]
pub fn point_feature(id: &str, x: f64, y: f64) -> ImportedFeature {
    let mut properties = crate::Properties::new();
    properties.insert("name".into(), id.into());
    ImportedFeature::new(id, Some(Point::new(x, y).into())).with_properties(properties)
}

/// Remote source answering every request with the same body or error.
#[derive(Debug, Default)]
pub struct StubRemoteSource {
    response: Option<Result<String, ImportError>>,
    requested: RefCell<Vec<String>>,
}

impl StubRemoteSource {
    /// Answer every request with `body`.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            response: Some(Ok(body.into())),
            requested: RefCell::default(),
        }
    }

    /// Fail every request with `error`.
    #[must_use]
    pub fn with_error(error: ImportError) -> Self {
        Self {
            response: Some(Err(error)),
            requested: RefCell::default(),
        }
    }

    /// URLs requested so far.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

#[async_trait(?Send)]
impl RemoteSource for StubRemoteSource {
    async fn fetch_text(&self, url: &str) -> Result<String, ImportError> {
        self.requested.borrow_mut().push(url.to_owned());
        self.response.clone().unwrap_or_else(|| {
            Err(ImportError::Http {
                url: url.to_owned(),
                status: 404,
                message: "Not Found".to_owned(),
            })
        })
    }
}

/// Decoder returning canned features or documents whatever the input.
#[derive(Debug, Default, Clone)]
pub struct StubDecoder {
    features: Vec<ImportedFeature>,
    document: NativeDocument,
    error: Option<ImportError>,
}

impl StubDecoder {
    /// Decode every payload into `features`.
    #[must_use]
    pub fn with_features(features: Vec<ImportedFeature>) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }

    /// Decode every native payload into `document`.
    #[must_use]
    pub fn with_document(document: NativeDocument) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    /// Fail every decode with `error`.
    #[must_use]
    pub fn with_error(error: ImportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

impl FeatureDecoder for StubDecoder {
    fn decode_features(
        &self,
        _text: &str,
        _format: ImportFormat,
    ) -> Result<Vec<ImportedFeature>, ImportError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.features.clone()),
        }
    }

    fn decode_document(&self, _text: &str) -> Result<NativeDocument, ImportError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.document.clone()),
        }
    }
}

/// Initial values an Overpass prompt was shown with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOverpassPrompt {
    /// Pre-filled expression.
    pub expression: Option<String>,
    /// Pre-selected mode.
    pub mode: GeometryMode,
    /// Pre-selected boundary.
    pub boundary: Option<BoundaryChoice>,
}

/// Dialog replaying queued answers. An empty queue cancels.
#[derive(Debug, Default)]
pub struct ScriptedDialog {
    overpass: RefCell<VecDeque<Option<OverpassForm>>>,
    datasets: RefCell<VecDeque<Option<DatasetSelection>>>,
    filters: RefCell<VecDeque<Option<FilterOption>>>,
    overpass_prompts: RefCell<Vec<RecordedOverpassPrompt>>,
}

impl ScriptedDialog {
    /// Queue a confirmed Overpass form.
    #[must_use]
    pub fn answer_overpass(self, form: OverpassForm) -> Self {
        self.overpass.borrow_mut().push_back(Some(form));
        self
    }

    /// Queue a cancelled Overpass form.
    #[must_use]
    pub fn cancel_overpass(self) -> Self {
        self.overpass.borrow_mut().push_back(None);
        self
    }

    /// Queue a dataset selection.
    #[must_use]
    pub fn answer_dataset(self, selection: DatasetSelection) -> Self {
        self.datasets.borrow_mut().push_back(Some(selection));
        self
    }

    /// Queue a filter choice.
    #[must_use]
    pub fn answer_filter(self, option: FilterOption) -> Self {
        self.filters.borrow_mut().push_back(Some(option));
        self
    }

    /// Queue a cancelled filter choice.
    #[must_use]
    pub fn cancel_filter(self) -> Self {
        self.filters.borrow_mut().push_back(None);
        self
    }

    /// Overpass prompts shown so far.
    #[must_use]
    pub fn overpass_prompts(&self) -> Vec<RecordedOverpassPrompt> {
        self.overpass_prompts.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ImportDialog for ScriptedDialog {
    async fn overpass(
        &self,
        prompt: OverpassPrompt<'_>,
        _search: &dyn BoundarySearch,
    ) -> Option<OverpassForm> {
        self.overpass_prompts
            .borrow_mut()
            .push(RecordedOverpassPrompt {
                expression: prompt.expression.map(str::to_owned),
                mode: prompt.mode,
                boundary: prompt.boundary.cloned(),
            });
        self.overpass.borrow_mut().pop_front().flatten()
    }

    async fn dataset(
        &self,
        _prompt: DatasetPrompt<'_>,
        _search: &dyn BoundarySearch,
    ) -> Option<DatasetSelection> {
        self.datasets.borrow_mut().pop_front().flatten()
    }

    async fn filter(&self, _prompt: FilterPrompt<'_>) -> Option<FilterOption> {
        self.filters.borrow_mut().pop_front().flatten()
    }
}

/// Boundary search answering with fixed candidates.
#[derive(Debug, Default, Clone)]
pub struct StubBoundarySearch {
    choices: Vec<BoundaryChoice>,
    error: Option<ImportError>,
}

impl StubBoundarySearch {
    /// Answer every search with `choices`.
    #[must_use]
    pub const fn with_choices(choices: Vec<BoundaryChoice>) -> Self {
        Self {
            choices,
            error: None,
        }
    }

    /// Fail every search with `error`.
    #[must_use]
    pub const fn with_error(error: ImportError) -> Self {
        Self {
            choices: Vec::new(),
            error: Some(error),
        }
    }
}

#[async_trait(?Send)]
impl BoundarySearch for StubBoundarySearch {
    async fn search(
        &self,
        _search_url: &str,
        _text: &str,
    ) -> Result<Vec<BoundaryChoice>, ImportError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.choices.clone()),
        }
    }
}

/// Data API answering with fixed filter values.
#[derive(Debug, Default, Clone)]
pub struct StubDatasetApi {
    filters: Vec<FilterOption>,
}

impl StubDatasetApi {
    /// Answer every filter request with `filters`.
    #[must_use]
    pub const fn with_filters(filters: Vec<FilterOption>) -> Self {
        Self { filters }
    }
}

#[async_trait(?Send)]
impl DatasetApi for StubDatasetApi {
    async fn filters(&self, _base: &str, _slug: &str) -> Result<Vec<FilterOption>, ImportError> {
        Ok(self.filters.clone())
    }
}

/// Plugin services around `dialog` with empty search and data-API stubs.
#[must_use]
pub fn plugin_services(dialog: Rc<ScriptedDialog>) -> PluginServices {
    plugin_services_with(dialog, Rc::new(StubDatasetApi::default()))
}

/// Plugin services around `dialog` and `api`.
#[must_use]
pub fn plugin_services_with(dialog: Rc<ScriptedDialog>, api: Rc<StubDatasetApi>) -> PluginServices {
    PluginServices::new(dialog, Rc::new(StubBoundarySearch::default()), api)
}
