//! In-memory [`MapEngine`] used by the command-line tool and tests.

use geo::{Coord, Rect};

use crate::{
    ImportedFeature, LayerId, LayerOptions, LayerSummary, MapEngine, NativeDocument, Properties,
    RemoteData,
};

/// A layer held by [`MemoryMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryLayer {
    /// Layer identifier.
    pub id: LayerId,
    /// Creation options.
    pub options: LayerOptions,
    /// Features in insertion order.
    pub features: Vec<ImportedFeature>,
    /// Remote source, for linked layers.
    pub remote: Option<RemoteData>,
    /// Whether the layer's data is loaded.
    pub loaded: bool,
}

/// Map that keeps layers in a vector and records notifications and zooms.
#[derive(Debug, Clone)]
pub struct MemoryMap {
    layers: Vec<MemoryLayer>,
    next_id: u64,
    properties: Properties,
    notifications: usize,
    last_zoom: Option<Rect<f64>>,
    viewport: Rect<f64>,
    proxy: bool,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            next_id: 1,
            properties: Properties::new(),
            notifications: 0,
            last_zoom: None,
            viewport: Rect::new(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 }),
            proxy: false,
        }
    }
}

impl MemoryMap {
    /// Empty map showing the whole world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the visible area.
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Rect<f64>) -> Self {
        self.viewport = viewport;
        self
    }

    /// Enable the caching proxy.
    #[must_use]
    pub const fn with_proxy(mut self, proxy: bool) -> Self {
        self.proxy = proxy;
        self
    }

    /// Layer by id.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&MemoryLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    fn layer_mut(&mut self, id: LayerId) -> Option<&mut MemoryLayer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    /// Mark a layer as loaded or not.
    pub fn set_loaded(&mut self, id: LayerId, loaded: bool) {
        if let Some(layer) = self.layer_mut(id) {
            layer.loaded = loaded;
        }
    }

    /// All layers in creation order.
    #[must_use]
    pub fn all_layers(&self) -> &[MemoryLayer] {
        &self.layers
    }

    /// Map-level properties merged from native documents.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Number of layers-changed notifications received.
    #[must_use]
    pub const fn notifications(&self) -> usize {
        self.notifications
    }

    /// Bounds of the most recent zoom.
    #[must_use]
    pub const fn last_zoom(&self) -> Option<Rect<f64>> {
        self.last_zoom
    }
}

impl MapEngine for MemoryMap {
    fn layers(&self) -> Vec<LayerSummary> {
        self.layers
            .iter()
            .map(|layer| LayerSummary {
                id: layer.id,
                name: layer
                    .options
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Layer {}", layer.id)),
                remote: layer.remote.is_some(),
                loaded: layer.loaded,
            })
            .collect()
    }

    fn has_layer(&self, id: LayerId) -> bool {
        self.layer(id).is_some()
    }

    fn create_layer(&mut self, options: LayerOptions) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(MemoryLayer {
            id,
            options,
            features: Vec::new(),
            remote: None,
            loaded: true,
        });
        id
    }

    fn remove_layer(&mut self, id: LayerId) {
        self.layers.retain(|layer| layer.id != id);
    }

    fn notify_layers_changed(&mut self) {
        self.notifications += 1;
    }

    fn clear_layer(&mut self, id: LayerId) {
        if let Some(layer) = self.layer_mut(id) {
            layer.features.clear();
        }
    }

    fn insert_features(
        &mut self,
        id: LayerId,
        features: Vec<ImportedFeature>,
    ) -> &mut [ImportedFeature] {
        let Some(layer) = self.layer_mut(id) else {
            return &mut [];
        };
        let start = layer.features.len();
        layer.features.extend(features);
        layer.features.get_mut(start..).unwrap_or_default()
    }

    fn remote_data(&self, id: LayerId) -> Option<RemoteData> {
        self.layer(id).and_then(|layer| layer.remote.clone())
    }

    fn replace_remote_data(
        &mut self,
        id: LayerId,
        data: Option<RemoteData>,
    ) -> Option<RemoteData> {
        let layer = self.layer_mut(id)?;
        std::mem::replace(&mut layer.remote, data)
    }

    fn merge_document(&mut self, document: NativeDocument) {
        self.properties.extend(document.properties);
        for layer in document.layers {
            let id = self.create_layer(layer.options);
            self.insert_features(id, layer.features);
        }
    }

    fn viewport(&self) -> Rect<f64> {
        self.viewport
    }

    fn zoom_to(&mut self, bounds: Rect<f64>) {
        self.last_zoom = Some(bounds);
    }

    fn proxy_enabled(&self) -> bool {
        self.proxy
    }
}
