//! Core types for importing geographic data into a map.
//!
//! The crate holds everything that does not touch the network or the
//! filesystem:
//!
//! - [`query`] rewrites free-form Overpass expressions into complete,
//!   area-restricted queries and remote-data URLs.
//! - [`boundary`] models administrative-area picks and their search.
//! - [`plugin`] hosts the dataset plugins and their static registry.
//! - [`Importer`] validates an [`ImportContext`] and drives it through one
//!   of three submit paths against a [`MapEngine`].
//!
//! Network and parsing collaborators are expressed as the
//! [`RemoteSource`], [`FeatureDecoder`], [`BoundarySearch`] and
//! [`DatasetApi`] traits. `geoimport-data` provides the HTTP and decoding
//! implementations.
//!
//! # Example
//!
//! ```
//! use geoimport_core::{BoundaryChoice, query};
//!
//! let area = BoundaryChoice::new("3600123", "Lyon");
//! let q = query::build("amenity=bench", query::GeometryMode::Center, Some(&area)).unwrap();
//! assert_eq!(q, "[out:json];nwr[amenity=bench](area:3600123);out center;");
//! ```

pub mod boundary;
mod context;
pub mod dataset;
mod error;
mod feature;
mod format;
mod importer;
mod memory;
pub mod plugin;
mod ports;
pub mod query;
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;

pub use boundary::{BoundaryChoice, BoundaryPicker, BoundarySearch};
pub use context::{FormVisibility, ImportAction, ImportContext, SourceKind, SubmitPlan};
pub use dataset::{DatasetApi, DatasetChoice, DatasetTarget, FilterOption};
pub use error::{ImportError, ValidationError};
pub use feature::{
    BoundsError, FeatureHandle, FeatureOptions, ImportBounds, ImportedFeature, LayerOptions,
    Properties,
};
pub use format::{ImportFile, ImportFormat, UnknownFormat, detect_file_format, resolve_format};
pub use importer::{
    DEFAULT_REMOTE_TTL, DestinationChoice, ImportReport, ImportServices, ImportState, Importer,
    NEW_LAYER_LABEL,
};
pub use memory::{MemoryLayer, MemoryMap};
pub use ports::{
    FeatureDecoder, LayerDocument, LayerId, LayerSummary, MapEngine, NativeDocument, RemoteData,
    RemoteSource,
};
