//! Decoded features, their rendering handles and option maps.

use geo::{BoundingRect, Centroid, Geometry, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Free-form feature properties.
pub type Properties = Map<String, Value>;

/// Per-feature display options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureOptions {
    /// Whether the feature may be dragged and edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    /// Remaining options, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureOptions {
    /// Whether no option is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draggable.is_none() && self.extra.is_empty()
    }

    /// Overlay the options set in `other`.
    pub fn merge_from(&mut self, other: &Self) {
        if other.draggable.is_some() {
            self.draggable = other.draggable;
        }
        self.extra
            .extend(other.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Options used when creating a layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerOptions {
    /// Layer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default draggability of the layer's features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    /// Styling and other options, kept verbatim.
    #[serde(flatten)]
    pub style: Map<String, Value>,
}

/// Errors raised when a feature has no usable extent.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BoundsError {
    /// The geometry has no coordinates.
    #[error("geometry is empty")]
    Empty,
    /// A coordinate is NaN or infinite.
    #[error("geometry has non-finite coordinates")]
    NonFinite,
}

/// Rendering handle of a feature with geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHandle {
    /// Feature geometry, `x` as longitude and `y` as latitude.
    pub geometry: Geometry<f64>,
    /// Whether editing is enabled.
    pub editable: bool,
}

impl FeatureHandle {
    /// Editable handle for `geometry`.
    #[must_use]
    pub const fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            editable: true,
        }
    }

    /// Extent of the geometry, falling back to its centroid as a point
    /// bound.
    ///
    /// # Errors
    ///
    /// Returns [`BoundsError::Empty`] for geometries without coordinates and
    /// [`BoundsError::NonFinite`] when the extent is not finite.
    pub fn bounds(&self) -> Result<Rect<f64>, BoundsError> {
        let rect = self
            .geometry
            .bounding_rect()
            .or_else(|| self.geometry.centroid().map(|p| Rect::new(p.0, p.0)))
            .ok_or(BoundsError::Empty)?;
        let finite = [rect.min(), rect.max()]
            .iter()
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if finite {
            Ok(rect)
        } else {
            Err(BoundsError::NonFinite)
        }
    }

    /// Turn editing off.
    pub const fn disable_edit(&mut self) {
        self.editable = false;
    }
}

/// A decoded feature ready for insertion into a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedFeature {
    /// Identifier, unique within one import.
    pub id: String,
    /// Feature properties.
    pub properties: Properties,
    /// Display options.
    pub options: FeatureOptions,
    /// Rendering handle; absent when the geometry is null.
    pub handle: Option<FeatureHandle>,
}

impl ImportedFeature {
    /// Feature with no properties; `None` geometry yields no handle.
    pub fn new(id: impl Into<String>, geometry: Option<Geometry<f64>>) -> Self {
        Self {
            id: id.into(),
            properties: Properties::new(),
            options: FeatureOptions::default(),
            handle: geometry.map(FeatureHandle::new),
        }
    }

    /// Replace the properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: FeatureOptions) -> Self {
        self.options = options;
        self
    }

    /// Value of the `name` property, if it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// Merge `pending` into the options and disable editing when the result
    /// says the feature is not draggable.
    pub fn apply_options(&mut self, pending: &FeatureOptions) {
        self.options.merge_from(pending);
        if self.options.draggable == Some(false)
            && let Some(handle) = self.handle.as_mut()
        {
            handle.disable_edit();
        }
    }
}

/// Running union of feature extents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImportBounds {
    rect: Option<Rect<f64>>,
    count: usize,
}

impl ImportBounds {
    /// Grow the union to cover `rect`.
    pub fn extend(&mut self, rect: Rect<f64>) {
        self.rect = Some(match self.rect {
            Some(current) => Rect::new(
                geo::coord! {
                    x: current.min().x.min(rect.min().x),
                    y: current.min().y.min(rect.min().y),
                },
                geo::coord! {
                    x: current.max().x.max(rect.max().x),
                    y: current.max().y.max(rect.max().y),
                },
            ),
            None => rect,
        });
        self.count += 1;
    }

    /// Union of everything added so far.
    #[must_use]
    pub const fn rect(&self) -> Option<Rect<f64>> {
        self.rect
    }

    /// Number of extents added.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}
