//! Import controller: validates the context and runs one of three import
//! strategies against a [`MapEngine`].
//!
//! # Architecture
//!
//! - **Full**: native documents are decoded up front and merged into the
//!   map only if every one of them parses.
//! - **Copy**: features are fetched, decoded, checked and inserted once into
//!   an existing layer or a provisional one.
//! - **Link**: the destination layer is pointed at the URL and refreshed
//!   immediately.
//!
//! A provisional layer is created when no existing destination is chosen.
//! Every failure after its creation goes through one rollback routine that
//! removes it (or, for a linked existing layer, restores its previous remote
//! source) and notifies the map.

mod validation;

use std::rc::Rc;

use log::info;

use crate::query::substitute_viewport;
use crate::{
    FeatureDecoder, FeatureOptions, ImportContext, ImportError, ImportFormat, ImportedFeature,
    LayerId, LayerOptions, MapEngine, RemoteData, RemoteSource, SourceKind, SubmitPlan,
};
use crate::plugin::{PluginOutcome, PluginParams, PluginRegistry};

use validation::usable_features;

/// Proxy cache lifetime, in seconds, for linked layers.
pub const DEFAULT_REMOTE_TTL: u32 = 300;

/// Label of the destination entry that creates a new layer.
pub const NEW_LAYER_LABEL: &str = "Import in a new layer";

/// Lifecycle of the import dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportState {
    /// No dialog open.
    #[default]
    Idle,
    /// Dialog open, waiting for input.
    AwaitingInput,
    /// An import is running.
    Submitting,
    /// The last import succeeded, with the feature count when known.
    Succeeded(Option<usize>),
    /// The last import failed.
    Failed,
}

/// Collaborators used to run imports.
#[derive(Clone)]
pub struct ImportServices {
    /// Fetches remote payloads.
    pub remote: Rc<dyn RemoteSource>,
    /// Decodes payloads.
    pub decoder: Rc<dyn FeatureDecoder>,
    /// Proxy cache lifetime for linked layers.
    pub remote_ttl: u32,
}

impl ImportServices {
    /// Bundle the collaborators with the default TTL.
    #[must_use]
    pub fn new(remote: Rc<dyn RemoteSource>, decoder: Rc<dyn FeatureDecoder>) -> Self {
        Self {
            remote,
            decoder,
            remote_ttl: DEFAULT_REMOTE_TTL,
        }
    }

    /// Override the proxy cache lifetime.
    #[must_use]
    pub const fn with_remote_ttl(mut self, ttl: u32) -> Self {
        self.remote_ttl = ttl;
        self
    }
}

/// One entry of the destination picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationChoice {
    /// Existing layer, or `None` for a new one.
    pub layer: Option<LayerId>,
    /// Display label.
    pub label: String,
}

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Features imported; `None` for native documents.
    pub count: Option<usize>,
    /// Layer the features went into.
    pub layer: Option<LayerId>,
    /// Message shown to the user.
    pub message: String,
}

impl ImportReport {
    fn features(count: usize, layer: LayerId) -> Self {
        let noun = if count == 1 { "feature" } else { "features" };
        Self {
            count: Some(count),
            layer: Some(layer),
            message: format!("Successfully imported {count} {noun}"),
        }
    }

    fn document() -> Self {
        Self {
            count: None,
            layer: None,
            message: "Data successfully imported!".to_owned(),
        }
    }
}

/// Destination resolved for one copy or link run.
#[derive(Debug)]
struct Destination {
    id: LayerId,
    provisional: bool,
    /// Remote source before a link replaced it; `Some` once linked.
    previous_remote: Option<Option<RemoteData>>,
}

/// The import controller.
pub struct Importer {
    context: ImportContext,
    state: ImportState,
    plugins: PluginRegistry,
    services: ImportServices,
}

impl Importer {
    /// Controller with the given plugins and collaborators.
    #[must_use]
    pub fn new(plugins: PluginRegistry, services: ImportServices) -> Self {
        Self {
            context: ImportContext::new(),
            state: ImportState::Idle,
            plugins,
            services,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ImportState {
        self.state
    }

    /// Session context.
    #[must_use]
    pub const fn context(&self) -> &ImportContext {
        &self.context
    }

    /// Session context, for form input.
    pub const fn context_mut(&mut self) -> &mut ImportContext {
        &mut self.context
    }

    /// Configured plugins.
    #[must_use]
    pub const fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Start a session and list the destination choices.
    pub fn open<M: MapEngine>(&mut self, map: &M) -> Vec<DestinationChoice> {
        self.context.reset();
        self.state = ImportState::AwaitingInput;
        Self::destination_choices(map)
    }

    /// End the session and discard its context.
    pub fn close(&mut self) {
        self.context.reset();
        self.state = ImportState::Idle;
    }

    /// Loaded layers that are not linked, newest first, then the new-layer
    /// entry.
    pub fn destination_choices<M: MapEngine>(map: &M) -> Vec<DestinationChoice> {
        let mut choices: Vec<DestinationChoice> = map
            .layers()
            .into_iter()
            .rev()
            .filter(|layer| layer.loaded && !layer.remote)
            .map(|layer| DestinationChoice {
                layer: Some(layer.id),
                label: layer.name,
            })
            .collect();
        choices.push(DestinationChoice {
            layer: None,
            label: NEW_LAYER_LABEL.to_owned(),
        });
        choices
    }

    /// Whether the context is ready to submit.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.context.can_submit()
    }

    /// Open the plugin matching `name_or_id` on this session's context.
    ///
    /// # Errors
    ///
    /// Propagates the plugin's error.
    pub async fn open_plugin(
        &mut self,
        name_or_id: &str,
        params: PluginParams,
    ) -> Result<Option<PluginOutcome>, ImportError> {
        self.plugins
            .open_helper(name_or_id, &mut self.context, params)
            .await
    }

    /// Run the import described by the context.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the context is incomplete (the state
    /// stays [`ImportState::AwaitingInput`]), [`ImportError::Busy`] while
    /// another import runs, and fetch, parse or empty-result errors from
    /// the run itself.
    pub async fn submit<M: MapEngine>(&mut self, map: &mut M) -> Result<ImportReport, ImportError> {
        if self.state == ImportState::Submitting {
            return Err(ImportError::Busy);
        }
        let plan = match self.context.validate() {
            Ok(plan) => plan,
            Err(err) => {
                self.state = ImportState::AwaitingInput;
                return Err(err.into());
            }
        };
        self.state = ImportState::Submitting;
        let result = match plan {
            SubmitPlan::Full => self.run_full(map).await,
            SubmitPlan::Copy => self.run_copy(map).await,
            SubmitPlan::Link => self.run_link(map).await,
        };
        match &result {
            Ok(report) => {
                info!("{}", report.message);
                self.state = ImportState::Succeeded(report.count);
            }
            Err(err) => {
                info!("import failed: {err}");
                self.state = ImportState::Failed;
            }
        }
        result
    }

    /// Payload texts of the active source. URLs get the viewport
    /// substituted.
    async fn source_texts(
        &self,
        source: Option<SourceKind>,
        viewport: geo::Rect<f64>,
    ) -> Result<Vec<String>, ImportError> {
        match source {
            Some(SourceKind::Files) => Ok(self.context.files.iter().map(|f| f.text()).collect()),
            Some(SourceKind::Raw) => Ok(self.context.raw.clone().into_iter().collect()),
            Some(SourceKind::Url) => {
                let url = self.context.url.as_deref().unwrap_or_default();
                let text = self
                    .services
                    .remote
                    .fetch_text(&substitute_viewport(url, &viewport))
                    .await?;
                Ok(vec![text])
            }
            None => Ok(Vec::new()),
        }
    }

    fn format(&self) -> ImportFormat {
        self.context.format.unwrap_or(ImportFormat::GeoJson)
    }

    async fn run_full<M: MapEngine>(&self, map: &mut M) -> Result<ImportReport, ImportError> {
        let texts = self
            .source_texts(self.context.source(), map.viewport())
            .await?;
        let documents = texts
            .iter()
            .map(|text| self.services.decoder.decode_document(text))
            .collect::<Result<Vec<_>, _>>()?;
        for document in documents {
            map.merge_document(document);
        }
        map.notify_layers_changed();
        Ok(ImportReport::document())
    }

    /// Take the options staged for this run off the context.
    fn take_staged_options(&mut self) -> (LayerOptions, FeatureOptions) {
        let layer_options = self.context.layer_creation_options();
        self.context.layer_options = LayerOptions::default();
        (layer_options, std::mem::take(&mut self.context.feature_options))
    }

    fn resolve_destination<M: MapEngine>(
        &self,
        map: &mut M,
        layer_options: LayerOptions,
    ) -> Destination {
        match self.context.layer_id.filter(|id| map.has_layer(*id)) {
            Some(id) => Destination {
                id,
                provisional: false,
                previous_remote: None,
            },
            None => Destination {
                id: map.create_layer(layer_options),
                provisional: true,
                previous_remote: None,
            },
        }
    }

    /// Undo what a failed run did to its destination and tell the map.
    fn roll_back<M: MapEngine>(map: &mut M, destination: Destination) {
        if destination.provisional {
            map.remove_layer(destination.id);
        } else if let Some(previous) = destination.previous_remote {
            map.replace_remote_data(destination.id, previous);
        }
        map.notify_layers_changed();
    }

    /// Fetch, decode and check features for the destination.
    async fn load_features<M: MapEngine>(
        &self,
        map: &M,
        source: Option<SourceKind>,
    ) -> Result<(Vec<ImportedFeature>, geo::Rect<f64>), ImportError> {
        let format = self.format();
        let mut decoded = Vec::new();
        for text in self.source_texts(source, map.viewport()).await? {
            decoded.extend(self.services.decoder.decode_features(&text, format)?);
        }
        let usable = usable_features(decoded);
        match usable.bounds.rect() {
            Some(rect) if !usable.features.is_empty() => Ok((usable.features, rect)),
            _ => Err(ImportError::EmptyResult),
        }
    }

    fn insert<M: MapEngine>(
        map: &mut M,
        destination: &Destination,
        features: Vec<ImportedFeature>,
        pending: &FeatureOptions,
        bounds: geo::Rect<f64>,
    ) -> ImportReport {
        let inserted = map.insert_features(destination.id, features);
        for feature in inserted.iter_mut() {
            feature.apply_options(pending);
        }
        let count = inserted.len();
        map.zoom_to(bounds);
        if destination.provisional {
            map.notify_layers_changed();
        }
        ImportReport::features(count, destination.id)
    }

    async fn run_copy<M: MapEngine>(&mut self, map: &mut M) -> Result<ImportReport, ImportError> {
        let (layer_options, feature_options) = self.take_staged_options();
        let destination = self.resolve_destination(map, layer_options);
        self.context.pending_feature_options = feature_options;
        if self.context.clear {
            map.clear_layer(destination.id);
        }
        let loaded = self.load_features(map, self.context.source()).await;
        let pending = std::mem::take(&mut self.context.pending_feature_options);
        let (features, bounds) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                Self::roll_back(map, destination);
                return Err(err);
            }
        };
        Ok(Self::insert(map, &destination, features, &pending, bounds))
    }

    /// Linked layers take no feature overrides: their features are
    /// replaced on every refresh.
    async fn run_link<M: MapEngine>(&mut self, map: &mut M) -> Result<ImportReport, ImportError> {
        let (layer_options, _) = self.take_staged_options();
        self.context.pending_feature_options = FeatureOptions::default();
        let mut destination = self.resolve_destination(map, layer_options);
        let proxy = map.proxy_enabled();
        let remote = RemoteData {
            url: self.context.url.clone().unwrap_or_default(),
            format: self.format(),
            proxy: proxy.then_some(true),
            ttl: proxy.then_some(self.services.remote_ttl),
        };
        destination.previous_remote = Some(map.replace_remote_data(destination.id, Some(remote)));
        let (features, bounds) = match self.load_features(map, Some(SourceKind::Url)).await {
            Ok(loaded) => loaded,
            Err(err) => {
                Self::roll_back(map, destination);
                return Err(err);
            }
        };
        map.clear_layer(destination.id);
        Ok(Self::insert(
            map,
            &destination,
            features,
            &FeatureOptions::default(),
            bounds,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMap;
    use crate::test_support::{
        ScriptedDialog, StubDecoder, StubRemoteSource, block_on, plugin_services, point_feature,
    };
    use crate::{ImportAction, ImportFile, LayerOptions, NativeDocument, ValidationError};
    use rstest::rstest;

    fn importer(remote: StubRemoteSource, decoder: StubDecoder) -> Importer {
        let registry = PluginRegistry::from_settings(
            &crate::plugin::ImporterSettings::default(),
            &plugin_services(Rc::new(ScriptedDialog::default())),
        );
        Importer::new(registry, ImportServices::new(Rc::new(remote), Rc::new(decoder)))
    }

    #[rstest]
    fn open_lists_local_layers_newest_first() {
        let mut map = MemoryMap::new();
        let first = map.create_layer(LayerOptions {
            name: Some("First".into()),
            ..LayerOptions::default()
        });
        let second = map.create_layer(LayerOptions {
            name: Some("Second".into()),
            ..LayerOptions::default()
        });
        let linked = map.create_layer(LayerOptions::default());
        map.replace_remote_data(
            linked,
            Some(RemoteData {
                url: "https://r.example/x.csv".into(),
                format: ImportFormat::Csv,
                proxy: None,
                ttl: None,
            }),
        );
        let mut importer = importer(StubRemoteSource::default(), StubDecoder::default());
        let choices = importer.open(&map);
        let layers: Vec<_> = choices.iter().map(|c| c.layer).collect();
        assert_eq!(layers, [Some(second), Some(first), None]);
        assert_eq!(choices.last().map(|c| c.label.as_str()), Some(NEW_LAYER_LABEL));
        assert_eq!(importer.state(), ImportState::AwaitingInput);
    }

    #[rstest]
    fn validation_failure_keeps_dialog_open() {
        let mut map = MemoryMap::new();
        let mut importer = importer(StubRemoteSource::default(), StubDecoder::default());
        importer.open(&map);
        let err = block_on(importer.submit(&mut map)).expect_err("no format");
        assert_eq!(err, ImportError::Validation(ValidationError::MissingFormat));
        assert_eq!(importer.state(), ImportState::AwaitingInput);
    }

    #[rstest]
    fn copy_into_new_layer() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_features(vec![
            point_feature("a", 4.8, 45.7),
            point_feature("b", 4.9, 45.8),
        ]);
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::Csv);
        ctx.set_raw("lat,lon\n45.7,4.8\n45.8,4.9");
        ctx.layer_name = Some("Imported".into());
        let report = block_on(importer.submit(&mut map)).expect("imported");
        assert_eq!(report.count, Some(2));
        assert_eq!(report.message, "Successfully imported 2 features");
        let layer = report.layer.and_then(|id| map.layer(id)).expect("layer kept");
        assert_eq!(layer.options.name.as_deref(), Some("Imported"));
        assert_eq!(layer.features.len(), 2);
        assert!(map.last_zoom().is_some());
        assert_eq!(importer.state(), ImportState::Succeeded(Some(2)));
    }

    #[rstest]
    fn singular_message() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.0, 2.0)]);
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        importer.context_mut().set_format(ImportFormat::GeoJson);
        importer.context_mut().set_raw("{}");
        let report = block_on(importer.submit(&mut map)).expect("imported");
        assert_eq!(report.message, "Successfully imported 1 feature");
    }

    #[rstest]
    fn copy_fetches_url_with_viewport() {
        let remote = StubRemoteSource::with_body("payload");
        let mut map = MemoryMap::new().with_viewport(geo::Rect::new(
            geo::Coord { x: 1.0, y: 2.0 },
            geo::Coord { x: 3.0, y: 4.0 },
        ));
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.5, 2.5)]);
        let remote = Rc::new(remote);
        let mut importer = Importer::new(
            PluginRegistry::from_settings(
                &crate::plugin::ImporterSettings::default(),
                &plugin_services(Rc::new(ScriptedDialog::default())),
            ),
            ImportServices::new(Rc::clone(&remote) as Rc<dyn RemoteSource>, Rc::new(decoder)),
        );
        importer.open(&map);
        importer.context_mut().set_format(ImportFormat::Osm);
        importer
            .context_mut()
            .set_url("https://o.example/api?data=x({south},{west},{north},{east})");
        block_on(importer.submit(&mut map)).expect("imported");
        assert_eq!(
            remote.requested(),
            ["https://o.example/api?data=x(2,1,4,3)".to_owned()]
        );
    }

    #[rstest]
    fn pending_options_disable_editing() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.0, 2.0)]);
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::GeoJson);
        ctx.set_raw("{}");
        ctx.feature_options.draggable = Some(false);
        let report = block_on(importer.submit(&mut map)).expect("imported");
        let layer = report.layer.and_then(|id| map.layer(id)).expect("layer");
        let feature = layer.features.first().expect("feature");
        assert_eq!(feature.options.draggable, Some(false));
        assert!(feature.handle.as_ref().is_some_and(|h| !h.editable));
        assert!(importer.context().pending_feature_options.is_empty());
    }

    #[rstest]
    fn empty_copy_discards_provisional_layer() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_features(vec![ImportedFeature::new("null", None)]);
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        importer.context_mut().set_format(ImportFormat::GeoJson);
        importer.context_mut().set_raw("{}");
        let err = block_on(importer.submit(&mut map)).expect_err("empty");
        assert_eq!(err, ImportError::EmptyResult);
        assert!(map.layers().is_empty());
        assert_eq!(map.notifications(), 1);
        assert_eq!(importer.state(), ImportState::Failed);
    }

    #[rstest]
    fn empty_copy_with_clear_purges_existing_layer() {
        let mut map = MemoryMap::new();
        let existing = map.create_layer(LayerOptions::default());
        map.insert_features(existing, vec![point_feature("old", 0.0, 0.0)]);
        let mut importer = importer(StubRemoteSource::default(), StubDecoder::default());
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::GeoJson);
        ctx.set_raw("{}");
        ctx.set_destination(Some(existing));
        ctx.clear = true;
        let err = block_on(importer.submit(&mut map)).expect_err("empty");
        assert_eq!(err, ImportError::EmptyResult);
        assert_eq!(map.layer(existing).map(|l| l.features.len()), Some(0));
        assert_eq!(map.notifications(), 1);
    }

    #[rstest]
    fn fetch_failure_discards_provisional_layer() {
        let remote = StubRemoteSource::with_error(ImportError::Timeout {
            url: "https://slow.example/".into(),
            timeout_secs: 30,
        });
        let mut map = MemoryMap::new();
        let mut importer = importer(remote, StubDecoder::default());
        importer.open(&map);
        importer.context_mut().set_format(ImportFormat::GeoJson);
        importer.context_mut().set_url("https://slow.example/");
        let err = block_on(importer.submit(&mut map)).expect_err("timeout");
        assert!(matches!(err, ImportError::Timeout { .. }));
        assert!(map.layers().is_empty());
    }

    #[rstest]
    fn link_stores_remote_data_once() {
        let mut map = MemoryMap::new().with_proxy(true);
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.0, 2.0)]);
        let mut importer = importer(StubRemoteSource::with_body("payload"), decoder);
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::Csv);
        ctx.set_url("https://r.example/x.csv");
        ctx.action = Some(ImportAction::Link);
        let report = block_on(importer.submit(&mut map)).expect("linked");
        let id = report.layer.expect("layer");
        assert_eq!(
            map.remote_data(id),
            Some(RemoteData {
                url: "https://r.example/x.csv".into(),
                format: ImportFormat::Csv,
                proxy: Some(true),
                ttl: Some(DEFAULT_REMOTE_TTL),
            })
        );
        assert!(map.last_zoom().is_some());
    }

    #[rstest]
    fn failed_link_restores_previous_remote_data() {
        let mut map = MemoryMap::new();
        let existing = map.create_layer(LayerOptions::default());
        let previous = RemoteData {
            url: "https://old.example/x.csv".into(),
            format: ImportFormat::Csv,
            proxy: None,
            ttl: None,
        };
        map.replace_remote_data(existing, Some(previous.clone()));
        let mut importer = importer(StubRemoteSource::with_body("payload"), StubDecoder::default());
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::Csv);
        ctx.set_url("https://new.example/x.csv");
        ctx.action = Some(ImportAction::Link);
        ctx.set_destination(Some(existing));
        let err = block_on(importer.submit(&mut map)).expect_err("empty");
        assert_eq!(err, ImportError::EmptyResult);
        assert_eq!(map.remote_data(existing), Some(previous));
        assert!(map.last_zoom().is_none());
        assert_eq!(map.notifications(), 1);
    }

    #[rstest]
    fn native_import_merges_documents() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_document(NativeDocument::default());
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        importer.context_mut().set_files(vec![
            ImportFile::new("a.umap", "{}"),
            ImportFile::new("b.umap", "{}"),
        ]);
        let report = block_on(importer.submit(&mut map)).expect("merged");
        assert_eq!(report.message, "Data successfully imported!");
        assert_eq!(importer.state(), ImportState::Succeeded(None));
        assert_eq!(map.notifications(), 1);
    }

    #[rstest]
    fn invalid_native_document_merges_nothing() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_error(ImportError::parse(ImportFormat::Umap, "eof"));
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        importer
            .context_mut()
            .set_files(vec![ImportFile::new("a.umap", "{")]);
        let err = block_on(importer.submit(&mut map)).expect_err("invalid");
        assert_eq!(err.user_message(), "Invalid umap data");
        assert_eq!(map.notifications(), 0);
        assert!(map.layers().is_empty());
    }

    #[rstest]
    fn staged_options_apply_to_one_submit_only() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.0, 2.0)]);
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::GeoJson);
        ctx.set_raw("{}");
        ctx.feature_options.draggable = Some(false);
        ctx.layer_options.draggable = Some(false);
        let first = block_on(importer.submit(&mut map)).expect("first import");
        assert!(importer.context().feature_options.is_empty());
        assert_eq!(importer.context().layer_options, LayerOptions::default());

        let second = block_on(importer.submit(&mut map)).expect("second import");
        assert_ne!(first.layer, second.layer);
        let layer = second.layer.and_then(|id| map.layer(id)).expect("layer");
        assert_eq!(layer.options.draggable, None);
        let feature = layer.features.first().expect("feature");
        assert_eq!(feature.options.draggable, None);
        assert!(feature.handle.as_ref().is_some_and(|h| h.editable));
    }

    #[rstest]
    fn parse_error_on_copy_discards_provisional_layer() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_error(ImportError::parse(ImportFormat::Csv, "bad row"));
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::Csv);
        ctx.set_raw("lat,lon\n1");
        ctx.feature_options.draggable = Some(false);
        let err = block_on(importer.submit(&mut map)).expect_err("parse error");
        assert_eq!(err.user_message(), "Unable to read the csv data");
        assert!(map.layers().is_empty());
        assert_eq!(map.notifications(), 1);
        assert!(importer.context().pending_feature_options.is_empty());
        assert_eq!(importer.state(), ImportState::Failed);
    }

    #[rstest]
    fn parse_error_on_link_discards_provisional_layer() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_error(ImportError::parse(ImportFormat::Csv, "bad row"));
        let mut importer = importer(StubRemoteSource::with_body("lat,lon\n1"), decoder);
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::Csv);
        ctx.set_url("https://r.example/x.csv");
        ctx.action = Some(ImportAction::Link);
        let err = block_on(importer.submit(&mut map)).expect_err("parse error");
        assert!(matches!(err, ImportError::Parse { .. }));
        assert!(map.layers().is_empty());
        assert_eq!(map.notifications(), 1);
    }

    #[rstest]
    fn link_ignores_staged_feature_options() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.0, 2.0)]);
        let mut importer = importer(StubRemoteSource::with_body("payload"), decoder);
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_format(ImportFormat::Csv);
        ctx.set_url("https://r.example/x.csv");
        ctx.action = Some(ImportAction::Link);
        ctx.feature_options.draggable = Some(false);
        let report = block_on(importer.submit(&mut map)).expect("linked");
        let layer = report.layer.and_then(|id| map.layer(id)).expect("layer");
        let feature = layer.features.first().expect("feature");
        assert_eq!(feature.options.draggable, None);
        assert!(importer.context().feature_options.is_empty());
    }

    #[rstest]
    fn link_fetches_url_even_with_files() {
        let remote = Rc::new(StubRemoteSource::with_body("payload"));
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.0, 2.0)]);
        let mut map = MemoryMap::new();
        let mut importer = Importer::new(
            PluginRegistry::from_settings(
                &crate::plugin::ImporterSettings::default(),
                &plugin_services(Rc::new(ScriptedDialog::default())),
            ),
            ImportServices::new(Rc::clone(&remote) as Rc<dyn RemoteSource>, Rc::new(decoder)),
        );
        importer.open(&map);
        let ctx = importer.context_mut();
        ctx.set_files(vec![ImportFile::new("a.csv", "lat,lon\n2,1")]);
        ctx.set_url("https://r.example/x.csv");
        ctx.action = Some(ImportAction::Link);
        let report = block_on(importer.submit(&mut map)).expect("linked");
        assert_eq!(remote.requested(), ["https://r.example/x.csv".to_owned()]);
        let id = report.layer.expect("layer");
        assert!(map.remote_data(id).is_some());
    }

    #[rstest]
    fn validation_failure_after_success_awaits_input() {
        let mut map = MemoryMap::new();
        let decoder = StubDecoder::with_features(vec![point_feature("a", 1.0, 2.0)]);
        let mut importer = importer(StubRemoteSource::default(), decoder);
        importer.open(&map);
        importer.context_mut().set_format(ImportFormat::GeoJson);
        importer.context_mut().set_raw("{}");
        block_on(importer.submit(&mut map)).expect("imported");
        assert_eq!(importer.state(), ImportState::Succeeded(Some(1)));
        importer.context_mut().raw = None;
        let err = block_on(importer.submit(&mut map)).expect_err("no source");
        assert_eq!(err, ImportError::Validation(ValidationError::MissingSource));
        assert_eq!(importer.state(), ImportState::AwaitingInput);
    }

    #[rstest]
    fn close_discards_context() {
        let map = MemoryMap::new();
        let mut importer = importer(StubRemoteSource::default(), StubDecoder::default());
        importer.open(&map);
        importer.context_mut().set_raw("x");
        importer.close();
        assert_eq!(importer.context(), &ImportContext::new());
        assert_eq!(importer.state(), ImportState::Idle);
    }
}
