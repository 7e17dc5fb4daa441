//! Import formats and format inference for uploaded files.
//!
//! Each uploaded file yields at most one candidate format, looked up first by
//! MIME type and then by file extension. A batch resolves to a format only
//! when every file agrees.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Formats the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    /// GeoJSON feature collections, features or bare geometries.
    #[serde(alias = "umap-data")]
    GeoJson,
    /// Delimited text with latitude and longitude columns.
    Csv,
    /// GPS exchange format.
    Gpx,
    /// Keyhole markup language.
    Kml,
    /// OpenStreetMap data, as Overpass JSON or OSM XML.
    Osm,
    /// RSS or Atom feeds carrying GeoRSS geometries.
    GeoRss,
    /// The editor's native document format.
    Umap,
}

impl ImportFormat {
    /// Every format, in the order the format picker lists them.
    pub const ALL: [Self; 7] = [
        Self::GeoJson,
        Self::Csv,
        Self::Gpx,
        Self::Kml,
        Self::Osm,
        Self::GeoRss,
        Self::Umap,
    ];

    /// Canonical lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Csv => "csv",
            Self::Gpx => "gpx",
            Self::Kml => "kml",
            Self::Osm => "osm",
            Self::GeoRss => "georss",
            Self::Umap => "umap",
        }
    }

    /// Whether this is the editor's own document format.
    ///
    /// Native imports always merge whole documents and ignore the
    /// destination layer and the copy/link action.
    #[must_use]
    pub const fn is_native(self) -> bool {
        matches!(self, Self::Umap)
    }

    const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Kml => &["kml"],
            Self::Gpx => &["gpx"],
            Self::GeoJson => &["geojson", "json"],
            Self::Csv => &["csv", "tsv", "dsv"],
            Self::Osm => &["osm", "xml"],
            Self::GeoRss => &["georss", "rss"],
            Self::Umap => &["umap"],
        }
    }

    const fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Kml => Some("application/vnd.google-earth.kml+xml"),
            Self::Gpx => Some("application/gpx+xml"),
            Self::GeoJson => Some("application/geo+json"),
            Self::Csv => Some("text/csv"),
            Self::Osm => Some("application/vnd.openstreetmap.data+xml"),
            Self::GeoRss => Some("application/rss+xml"),
            Self::Umap => None,
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown import format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for ImportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "umap-data" {
            return Ok(Self::GeoJson);
        }
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == name)
            .ok_or_else(|| UnknownFormat(s.to_owned()))
    }
}

/// A file held in memory, as handed over by an upload control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    /// File name including extension.
    pub name: String,
    /// MIME type reported by the browser or filesystem, if any.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl ImportFile {
    /// Build a file from a name and its contents.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Attach a MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Contents decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Candidate format for a single file, if the lookup table knows it.
///
/// # Examples
///
/// ```
/// use geoimport_core::{ImportFile, ImportFormat, detect_file_format};
///
/// let file = ImportFile::new("trail.GPX", Vec::new());
/// assert_eq!(detect_file_format(&file), Some(ImportFormat::Gpx));
/// ```
#[must_use]
pub fn detect_file_format(file: &ImportFile) -> Option<ImportFormat> {
    if let Some(content_type) = file.content_type.as_deref() {
        // Parameters such as `; charset=utf-8` are not part of the type.
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let by_mime = ImportFormat::ALL
            .into_iter()
            .find(|format| format.mime_type() == Some(essence.as_str()));
        if by_mime.is_some() {
            return by_mime;
        }
    }
    let name = file.name.to_ascii_lowercase();
    ImportFormat::ALL.into_iter().find(|format| {
        format
            .extensions()
            .iter()
            .any(|ext| name.strip_suffix(ext).is_some_and(|stem| stem.ends_with('.')))
    })
}

/// Shared format of a batch of files.
///
/// Returns `None` for an empty batch, for a batch where any file has no
/// candidate, and for a batch whose files disagree.
#[must_use]
pub fn resolve_format(files: &[ImportFile]) -> Option<ImportFormat> {
    let mut candidates = files.iter().map(detect_file_format);
    let first = candidates.next()??;
    candidates
        .all(|candidate| candidate == Some(first))
        .then_some(first)
}
