//! Data-API client for curated datasets.

use async_trait::async_trait;
use geoimport_core::dataset::filters_url;
use geoimport_core::{DatasetApi, FilterOption, ImportError};
use serde_json::{Map, Value};

use super::HttpClient;

/// Keys under which a filter list may be nested.
const WRAPPER_KEYS: [&str; 4] = ["filters", "results", "items", "data"];

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn from_entry(entry: &Value) -> Option<FilterOption> {
    if let Some(value) = scalar(entry) {
        return Some(FilterOption::new(value.clone(), value));
    }
    let object = entry.as_object()?;
    let value = object
        .get("value")
        .or_else(|| object.get("id"))
        .and_then(scalar)?;
    let label = object
        .get("label")
        .or_else(|| object.get("name"))
        .and_then(scalar)
        .unwrap_or_else(|| value.clone());
    Some(FilterOption::new(value, label))
}

fn from_map(map: &Map<String, Value>) -> Vec<FilterOption> {
    map.iter()
        .map(|(key, entry)| match entry {
            Value::Object(object) => {
                let value = object
                    .get("value")
                    .or_else(|| object.get("id"))
                    .and_then(scalar)
                    .unwrap_or_else(|| key.clone());
                let label = object
                    .get("label")
                    .or_else(|| object.get("name"))
                    .and_then(scalar)
                    .unwrap_or_else(|| value.clone());
                FilterOption::new(value, label)
            }
            other => FilterOption::new(key, scalar(other).unwrap_or_else(|| key.clone())),
        })
        .collect()
}

/// Decode a filter list in any of the shapes the data API serves.
///
/// Accepted shapes: an array of `{value|id, label|name}` objects or plain
/// scalars; an object mapping keys to labels or to such objects; and either
/// of those nested under `filters`, `results`, `items` or `data`.
///
/// ```
/// use geoimport_core::FilterOption;
/// use geoimport_data::http::parse_filters;
///
/// let json = serde_json::json!({"results": [{"id": 69123, "label": "Lyon"}]});
/// assert_eq!(parse_filters(&json), vec![FilterOption::new("69123", "Lyon")]);
/// ```
#[must_use]
pub fn parse_filters(body: &Value) -> Vec<FilterOption> {
    match body {
        Value::Array(entries) => entries.iter().filter_map(from_entry).collect(),
        Value::Object(map) => {
            let nested = WRAPPER_KEYS
                .iter()
                .find_map(|key| map.get(*key).filter(|v| v.is_array() || v.is_object()));
            match nested {
                Some(inner) => parse_filters(inner),
                None => from_map(map),
            }
        }
        _ => Vec::new(),
    }
}

/// [`DatasetApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDatasetApi {
    client: HttpClient,
}

impl HttpDatasetApi {
    /// Wrap a shared client.
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl DatasetApi for HttpDatasetApi {
    async fn filters(&self, base: &str, slug: &str) -> Result<Vec<FilterOption>, ImportError> {
        let body: Value = self.client.get_json(&filters_url(base, slug)).await?;
        Ok(parse_filters(&body))
    }
}
