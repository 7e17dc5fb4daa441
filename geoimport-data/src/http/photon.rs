//! Boundary search against a Photon geocoder.
//!
//! Photon answers with a GeoJSON feature collection. Only the properties
//! are read; geometry is ignored.
//!
//! See: <https://github.com/komoot/photon>

use async_trait::async_trait;
use geoimport_core::boundary::{join_label, search_request_url};
use geoimport_core::{BoundaryChoice, BoundarySearch, ImportError};
use log::debug;
use serde::Deserialize;

use super::HttpClient;

/// Photon search response.
#[derive(Debug, Default, Deserialize)]
pub struct PhotonResponse {
    /// Matching records, best first.
    #[serde(default)]
    pub features: Vec<PhotonFeature>,
}

/// One Photon record.
#[derive(Debug, Deserialize)]
pub struct PhotonFeature {
    /// Descriptive fields of the record.
    #[serde(default)]
    pub properties: PhotonProperties,
}

/// Descriptive fields used to build a candidate.
#[derive(Debug, Default, Deserialize)]
pub struct PhotonProperties {
    /// OpenStreetMap id of the record.
    pub osm_id: Option<u64>,
    /// Place name.
    pub name: Option<String>,
    /// County.
    pub county: Option<String>,
    /// State or region.
    pub state: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// ISO country code, sent by locale-filtered endpoints without `country`.
    pub countrycode: Option<String>,
}

impl PhotonResponse {
    /// Candidates in response order. Records without an `osm_id` are
    /// skipped.
    #[must_use]
    pub fn into_choices(self) -> Vec<BoundaryChoice> {
        self.features
            .into_iter()
            .filter_map(|feature| {
                let props = feature.properties;
                let osm_id = props.osm_id?;
                let label = join_label([
                    props.name.as_deref(),
                    props.county.as_deref(),
                    props.state.as_deref(),
                    props.country.as_deref().or(props.countrycode.as_deref()),
                ]);
                BoundaryChoice::from_osm_id(osm_id, label)
            })
            .collect()
    }
}

/// [`BoundarySearch`] backed by a Photon endpoint.
#[derive(Debug, Clone)]
pub struct PhotonBoundarySearch {
    client: HttpClient,
}

impl PhotonBoundarySearch {
    /// Wrap a shared client.
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl BoundarySearch for PhotonBoundarySearch {
    async fn search(
        &self,
        search_url: &str,
        text: &str,
    ) -> Result<Vec<BoundaryChoice>, ImportError> {
        let url = search_request_url(search_url, text);
        let response: PhotonResponse = self.client.get_json(&url).await?;
        let choices = response.into_choices();
        debug!("{} boundary candidates for {text:?}", choices.len());
        Ok(choices)
    }
}
