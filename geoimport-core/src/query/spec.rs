//! Query URLs and viewport substitution.

use std::fmt;
use std::str::FromStr;

use geo::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ImportFormat;

/// Placeholder tokens resolved against the viewport at fetch time, in
/// south, west, north, east order.
pub const VIEWPORT_PLACEHOLDERS: [&str; 4] = ["{south}", "{west}", "{north}", "{east}"];

/// Geometry requested from the query endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryMode {
    /// Full geometries.
    #[default]
    Geom,
    /// One centre point per element.
    Center,
}

impl GeometryMode {
    /// Output keyword for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Geom => "geom",
            Self::Center => "center",
        }
    }
}

impl fmt::Display for GeometryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown geometry mode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown geometry mode: {0}")]
pub struct UnknownGeometryMode(pub String);

impl FromStr for GeometryMode {
    type Err = UnknownGeometryMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geom" => Ok(Self::Geom),
            "center" | "centre" => Ok(Self::Center),
            _ => Err(UnknownGeometryMode(s.to_owned())),
        }
    }
}

/// A fetchable query: the endpoint URL with the encoded query attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Endpoint URL carrying the query as its `data` parameter.
    pub url: String,
    /// Format of the response.
    pub format: ImportFormat,
}

impl QuerySpec {
    /// Attach `query` to `endpoint` as the `data` parameter.
    ///
    /// The query is form-encoded except for the viewport placeholders, which
    /// stay literal so [`substitute_viewport`] can find them.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoimport_core::query::QuerySpec;
    ///
    /// let spec = QuerySpec::new(
    ///     "https://overpass.example/api/interpreter",
    ///     "[out:json];node({south},{west},{north},{east});out geom;",
    /// );
    /// assert_eq!(
    ///     spec.url,
    ///     "https://overpass.example/api/interpreter?data=%5Bout%3Ajson%5D%3Bnode%28\
    ///      {south}%2C{west}%2C{north}%2C{east}%29%3Bout+geom%3B"
    /// );
    /// ```
    #[must_use]
    pub fn new(endpoint: &str, query: &str) -> Self {
        let mut encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        for token in VIEWPORT_PLACEHOLDERS {
            let escaped: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
            encoded = encoded.replace(&escaped, token);
        }
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Self {
            url: format!("{endpoint}{separator}data={encoded}"),
            format: ImportFormat::Osm,
        }
    }
}

/// Replace the viewport placeholders in `url` with the edges of `viewport`.
///
/// `x` is longitude and `y` latitude, so south and north come from the
/// rectangle's `y` range.
#[must_use]
pub fn substitute_viewport(url: &str, viewport: &Rect<f64>) -> String {
    let (min, max) = (viewport.min(), viewport.max());
    let values = [min.y, min.x, max.y, max.x];
    VIEWPORT_PLACEHOLDERS
        .into_iter()
        .zip(values)
        .fold(url.to_owned(), |acc, (token, value)| {
            acc.replace(token, &value.to_string())
        })
}
