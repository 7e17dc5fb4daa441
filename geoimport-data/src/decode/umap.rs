//! Native map documents.
//!
//! A document is a JSON object of type `umap` with map-level `properties`
//! and a `layers` array of feature collections. Each layer's options live
//! under `_umap_options`.

use geoimport_core::{LayerDocument, LayerOptions, NativeDocument, Properties};
use serde_json::Value;

use super::DecodeError;
use super::geojson::{OPTIONS_KEY, collection};

fn layer(value: &Value) -> Result<LayerDocument, DecodeError> {
    let options = match value.get(OPTIONS_KEY) {
        Some(raw @ Value::Object(_)) => serde_json::from_value::<LayerOptions>(raw.clone())?,
        _ => LayerOptions::default(),
    };
    Ok(LayerDocument {
        options,
        features: collection(value)?,
    })
}

/// Decode a native document.
pub(super) fn document(text: &str) -> Result<NativeDocument, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(root) = &value else {
        return Err(DecodeError::Malformed("document is not an object".to_owned()));
    };
    match root.get("type").and_then(Value::as_str) {
        Some("umap") => {}
        Some(other) => {
            return Err(DecodeError::Malformed(format!(
                "expected a umap document, found {other}"
            )));
        }
        None => return Err(DecodeError::Malformed("missing document type".to_owned())),
    }
    let properties = match root.get("properties") {
        Some(Value::Object(map)) => map.clone(),
        _ => Properties::new(),
    };
    let layers = match root.get("layers") {
        Some(Value::Array(layers)) => layers.iter().map(layer).collect::<Result<_, _>>()?,
        Some(_) => return Err(DecodeError::Malformed("layers is not an array".to_owned())),
        None => Vec::new(),
    };
    Ok(NativeDocument { properties, layers })
}
