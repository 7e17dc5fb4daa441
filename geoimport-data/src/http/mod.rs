//! HTTP adapters for the importer's network collaborators.
//!
//! # Architecture
//!
//! One [`HttpClient`] wraps a configured `reqwest` client. The adapters
//! share it by cloning and each implements one core port:
//!
//! - [`HttpRemoteSource`] fetches import payloads ([`geoimport_core::RemoteSource`]);
//! - [`PhotonBoundarySearch`] resolves area names ([`geoimport_core::BoundarySearch`]);
//! - [`HttpDatasetApi`] lists data-API filter values ([`geoimport_core::DatasetApi`]).
//!
//! The ports are async and not `Send`; callers drive them on a
//! current-thread Tokio runtime.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use geoimport_core::RemoteSource;
//! use geoimport_data::http::{HttpClient, HttpClientConfig, HttpRemoteSource};
//!
//! let config = HttpClientConfig::new()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("my-app/1.0");
//! let source = HttpRemoteSource::new(HttpClient::with_config(config)?);
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
//! let body = rt.block_on(source.fetch_text("https://example.com/data.geojson"))?;
//! # let _ = body;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod client;
mod datasets;
mod photon;
mod remote;

pub use client::{
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, HttpClient, HttpClientConfig, ProviderBuildError,
};
pub use datasets::{HttpDatasetApi, parse_filters};
pub use photon::{PhotonBoundarySearch, PhotonFeature, PhotonProperties, PhotonResponse};
pub use remote::HttpRemoteSource;
