//! Collaborator contracts the importer drives.
//!
//! The importer does not render anything itself. It talks to a
//! [`MapEngine`] that owns layers, fetches payloads through a
//! [`RemoteSource`] and turns text into features with a
//! [`FeatureDecoder`].

use std::fmt;

use async_trait::async_trait;
use geo::Rect;
use serde::{Deserialize, Serialize};

use crate::{ImportError, ImportFormat, ImportedFeature, LayerOptions, Properties};

/// Fetches remote payloads as text.
#[async_trait(?Send)]
pub trait RemoteSource {
    /// Fetch the body at `url`.
    async fn fetch_text(&self, url: &str) -> Result<String, ImportError>;
}

/// Turns payload text into features or native documents.
pub trait FeatureDecoder {
    /// Decode `text` as `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Parse`] when the payload is malformed.
    fn decode_features(
        &self,
        text: &str,
        format: ImportFormat,
    ) -> Result<Vec<ImportedFeature>, ImportError>;

    /// Decode `text` as a native document.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Parse`] when the document is malformed.
    fn decode_document(&self, text: &str) -> Result<NativeDocument, ImportError>;
}

/// Remote source persisted on a linked layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteData {
    /// Source URL, possibly with viewport placeholders.
    pub url: String,
    /// Format of the payload.
    pub format: ImportFormat,
    /// Whether requests go through the map's proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<bool>,
    /// Proxy cache lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

/// Identifier of a layer within a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listing entry for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    /// Layer identifier.
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Whether the layer mirrors a remote source.
    pub remote: bool,
    /// Whether the layer's data is loaded.
    pub loaded: bool,
}

/// One layer of a native document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerDocument {
    /// Layer options.
    pub options: LayerOptions,
    /// Layer features.
    pub features: Vec<ImportedFeature>,
}

/// A parsed native document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeDocument {
    /// Map-level properties.
    pub properties: Properties,
    /// Layers in document order.
    pub layers: Vec<LayerDocument>,
}

/// The map the importer writes into.
pub trait MapEngine {
    /// Layers in creation order.
    fn layers(&self) -> Vec<LayerSummary>;

    /// Whether `id` names an existing layer.
    fn has_layer(&self, id: LayerId) -> bool;

    /// Create a layer and return its id.
    fn create_layer(&mut self, options: LayerOptions) -> LayerId;

    /// Remove a layer from the registry.
    fn remove_layer(&mut self, id: LayerId);

    /// Tell collaborators the set of layers changed.
    fn notify_layers_changed(&mut self);

    /// Remove every feature from a layer.
    fn clear_layer(&mut self, id: LayerId);

    /// Append features to a layer, returning the inserted slice.
    fn insert_features(
        &mut self,
        id: LayerId,
        features: Vec<ImportedFeature>,
    ) -> &mut [ImportedFeature];

    /// Remote source of a layer.
    fn remote_data(&self, id: LayerId) -> Option<RemoteData>;

    /// Set or unset a layer's remote source, returning the previous value.
    fn replace_remote_data(&mut self, id: LayerId, data: Option<RemoteData>)
    -> Option<RemoteData>;

    /// Merge a native document: properties into the map, layers as new
    /// layers.
    fn merge_document(&mut self, document: NativeDocument);

    /// Currently visible area.
    fn viewport(&self) -> Rect<f64>;

    /// Fit the view to `bounds`.
    fn zoom_to(&mut self, bounds: Rect<f64>);

    /// Whether remote requests can go through a caching proxy.
    fn proxy_enabled(&self) -> bool;
}
