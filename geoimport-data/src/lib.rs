//! Network and format adapters for the geoimport engine.
//!
//! Responsibilities:
//! - Implement the core's network ports over HTTP.
//! - Decode every import format into core features.
//!
//! Boundaries:
//! - Do not encode import rules (live in `geoimport-core`).
//! - Keep the ports async; callers own the runtime.
//!
//! Invariants:
//! - Coordinates use `x` for longitude and `y` for latitude.
//! - No global mutable state.

pub mod decode;
pub mod http;

pub use decode::{DecodeError, GeoDecoder};
pub use http::{
    HttpClient, HttpClientConfig, HttpDatasetApi, HttpRemoteSource, PhotonBoundarySearch,
    ProviderBuildError,
};
