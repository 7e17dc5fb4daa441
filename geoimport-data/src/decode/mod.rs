//! Payload decoders for every import format.
//!
//! [`GeoDecoder`] implements [`FeatureDecoder`] by dispatching on
//! [`ImportFormat`]. Coordinates are always decoded with `x` as longitude
//! and `y` as latitude. Features without a usable geometry are kept with no
//! handle so the importer can count and skip them.
//!
//! # Example
//!
//! ```
//! use geoimport_core::{FeatureDecoder, ImportFormat};
//! use geoimport_data::decode::GeoDecoder;
//!
//! let features = GeoDecoder
//!     .decode_features("lat,lon,name\n45.76,4.83,bench", ImportFormat::Csv)
//!     .expect("valid csv");
//! assert_eq!(features.len(), 1);
//! assert_eq!(features.first().and_then(|f| f.name()), Some("bench"));
//! ```

mod csv;
mod geojson;
mod osm;
mod umap;
mod xml;

use geoimport_core::{FeatureDecoder, ImportError, ImportFormat, ImportedFeature, NativeDocument};
use thiserror::Error;

/// Errors raised while decoding a payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload is not well-formed XML.
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// A delimited record could not be read.
    #[error("invalid CSV: {0}")]
    Csv(#[from] ::csv::Error),
    /// A geometry type is not supported.
    #[error("unsupported geometry type `{0}`")]
    GeometryType(String),
    /// A coordinate array or tuple is malformed.
    #[error("malformed coordinates")]
    Coordinates,
    /// No latitude and longitude columns were found.
    #[error("no latitude and longitude columns found")]
    MissingLatLon,
    /// The payload's structure does not match the format.
    #[error("{0}")]
    Malformed(String),
}

impl DecodeError {
    /// Wrap the error as an import failure for `format`.
    #[must_use]
    pub fn into_import_error(self, format: ImportFormat) -> ImportError {
        ImportError::parse(format, self.to_string())
    }
}

/// Decodes every [`ImportFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoDecoder;

impl GeoDecoder {
    /// Decode `text` as `format` into features.
    ///
    /// Native documents are flattened, layer by layer.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the payload is malformed.
    pub fn decode(&self, text: &str, format: ImportFormat) -> Result<Vec<ImportedFeature>, DecodeError> {
        match format {
            ImportFormat::GeoJson => geojson::features(text),
            ImportFormat::Csv => csv::features(text),
            ImportFormat::Gpx => xml::gpx(text),
            ImportFormat::Kml => xml::kml(text),
            ImportFormat::GeoRss => xml::georss(text),
            ImportFormat::Osm if text.trim_start().starts_with('{') => osm::overpass_features(text),
            ImportFormat::Osm => xml::osm(text),
            ImportFormat::Umap => Ok(umap::document(text)?
                .layers
                .into_iter()
                .flat_map(|layer| layer.features)
                .collect()),
        }
    }
}

impl FeatureDecoder for GeoDecoder {
    fn decode_features(
        &self,
        text: &str,
        format: ImportFormat,
    ) -> Result<Vec<ImportedFeature>, ImportError> {
        self.decode(text, format)
            .map_err(|err| err.into_import_error(format))
    }

    fn decode_document(&self, text: &str) -> Result<NativeDocument, ImportError> {
        umap::document(text).map_err(|err| err.into_import_error(ImportFormat::Umap))
    }
}
