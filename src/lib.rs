//! Facade crate for the geoimport engine.
//!
//! This crate re-exports the core import types and, behind the `http`
//! feature, the network and decoding collaborators.

#![forbid(unsafe_code)]

pub use geoimport_core::{
    BoundaryChoice, BoundarySearch, DatasetApi, FeatureDecoder, ImportAction, ImportContext,
    ImportError, ImportFile, ImportFormat, ImportReport, ImportServices, Importer, MapEngine,
    MemoryMap, RemoteSource, ValidationError, boundary, plugin, query,
};

#[cfg(feature = "http")]
pub use geoimport_data::{
    DecodeError, GeoDecoder, HttpClientConfig, HttpDatasetApi, HttpRemoteSource,
    PhotonBoundarySearch,
};
