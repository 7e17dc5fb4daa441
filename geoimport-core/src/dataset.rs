//! Curated dataset catalog entries and the data-API contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ImportError, ImportFormat};

/// One entry of a dataset catalog, as written in the importer settings.
///
/// Exactly one of `url`, `expression` or `data` says where the features come
/// from; see [`DatasetChoice::target`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetChoice {
    /// Label shown in the picker, also used as layer name.
    pub label: String,
    /// Direct URL of a feature file.
    #[serde(default)]
    pub url: Option<String>,
    /// Filter expression handed to the query builder.
    #[serde(default)]
    pub expression: Option<String>,
    /// Data-API dataset slug.
    #[serde(default)]
    pub data: Option<String>,
    /// Filter key the data API expects, for example `commune`.
    #[serde(default)]
    pub geographic_query: Option<String>,
    /// Format name; unknown names fall back to GeoJSON.
    #[serde(default)]
    pub format: Option<String>,
    /// Expression entries that must not fall back to the viewport.
    #[serde(default)]
    pub requires_area: bool,
    /// Attribution of the data.
    #[serde(default)]
    pub source: Option<String>,
    /// Longer description shown under the picker.
    #[serde(default)]
    pub description: Option<String>,
}

/// Where a dataset entry's features come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetTarget<'a> {
    /// A feature file at a URL.
    Url(&'a str),
    /// A filter expression to run through the query builder.
    Expression(&'a str),
    /// A data-API dataset.
    DataApi {
        /// Dataset slug.
        slug: &'a str,
        /// Filter key, when the dataset is split geographically.
        geographic_query: Option<&'a str>,
    },
}

impl DatasetChoice {
    /// Resolved format for the entry.
    ///
    /// ```
    /// use geoimport_core::{DatasetChoice, ImportFormat};
    ///
    /// let choice = DatasetChoice { format: Some("osm".into()), ..Default::default() };
    /// assert_eq!(choice.import_format(), ImportFormat::Osm);
    /// assert_eq!(DatasetChoice::default().import_format(), ImportFormat::GeoJson);
    /// ```
    #[must_use]
    pub fn import_format(&self) -> ImportFormat {
        self.format
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(ImportFormat::GeoJson)
    }

    /// Source of the entry's features, preferring a URL, then an expression,
    /// then a data-API slug.
    #[must_use]
    pub fn target(&self) -> Option<DatasetTarget<'_>> {
        if let Some(url) = non_blank(self.url.as_deref()) {
            return Some(DatasetTarget::Url(url));
        }
        if let Some(expression) = non_blank(self.expression.as_deref()) {
            return Some(DatasetTarget::Expression(expression));
        }
        non_blank(self.data.as_deref()).map(|slug| DatasetTarget::DataApi {
            slug,
            geographic_query: non_blank(self.geographic_query.as_deref()),
        })
    }
}

/// One selectable filter value offered by the data API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    /// Value sent as the query parameter.
    pub value: String,
    /// Human-readable label.
    pub label: String,
}

impl FilterOption {
    /// Construct a filter option.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_owned()
    } else {
        format!("{base}/")
    }
}

/// URL of a dataset's filter list: `<base>datasets/<slug>/filters`.
#[must_use]
pub fn filters_url(base: &str, slug: &str) -> String {
    format!("{}datasets/{slug}/filters", with_trailing_slash(base))
}

/// URL of a dataset's features, optionally filtered by `key=value`.
///
/// ```
/// use geoimport_core::dataset::data_url;
///
/// assert_eq!(
///     data_url("http://localhost:8001/api/v1/", "arbres", Some(("commune", "69123"))),
///     "http://localhost:8001/api/v1/datasets/arbres?commune=69123"
/// );
/// ```
#[must_use]
pub fn data_url(base: &str, slug: &str, filter: Option<(&str, &str)>) -> String {
    let mut url = format!("{}datasets/{slug}", with_trailing_slash(base));
    if let Some((key, value)) = filter {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(key, value)
            .finish();
        url.push('?');
        url.push_str(&query);
    }
    url
}

/// Client for the dataset data API.
#[async_trait(?Send)]
pub trait DatasetApi {
    /// Fetch the selectable filter values for `slug`.
    async fn filters(&self, base: &str, slug: &str) -> Result<Vec<FilterOption>, ImportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn deserialises_catalog_entries() {
        let choice: DatasetChoice = serde_json::from_str(
            r#"{"label": "Grass", "expression": "nwr[landuse=grass];out geom;", "format": "osm",
                "source": "OpenStreetMap", "description": "Grass areas"}"#,
        )
        .expect("valid entry");
        assert_eq!(
            choice.target(),
            Some(DatasetTarget::Expression("nwr[landuse=grass];out geom;"))
        );
        assert_eq!(choice.import_format(), ImportFormat::Osm);
        assert!(!choice.requires_area);
    }

    #[rstest]
    fn data_api_entries_expose_filter_key() {
        let choice: DatasetChoice = serde_json::from_str(
            r#"{"label": "Trees", "data": "arbres", "geographic_query": "commune", "format": "umap-data"}"#,
        )
        .expect("valid entry");
        assert_eq!(
            choice.target(),
            Some(DatasetTarget::DataApi {
                slug: "arbres",
                geographic_query: Some("commune"),
            })
        );
        assert_eq!(choice.import_format(), ImportFormat::GeoJson);
    }

    #[rstest]
    fn url_takes_precedence_and_blanks_are_ignored() {
        let choice = DatasetChoice {
            url: Some("https://d.example/x.csv".into()),
            expression: Some("a=b".into()),
            ..DatasetChoice::default()
        };
        assert_eq!(choice.target(), Some(DatasetTarget::Url("https://d.example/x.csv")));
        let blank = DatasetChoice {
            url: Some("  ".into()),
            ..DatasetChoice::default()
        };
        assert_eq!(blank.target(), None);
    }

    #[rstest]
    #[case("http://api.example/v1", "http://api.example/v1/datasets/arbres/filters")]
    #[case("http://api.example/v1/", "http://api.example/v1/datasets/arbres/filters")]
    fn filter_urls(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(filters_url(base, "arbres"), expected);
    }

    #[rstest]
    fn data_url_encodes_values() {
        assert_eq!(
            data_url("http://api.example/", "arbres", Some(("commune", "Saint Didier"))),
            "http://api.example/datasets/arbres?commune=Saint+Didier"
        );
        assert_eq!(
            data_url("http://api.example/", "arbres", None),
            "http://api.example/datasets/arbres"
        );
    }
}
