//! GeoJSON features and geometries.
//!
//! Feature collections, single features and bare geometries are accepted.
//! An `_umap_options` object in a feature's properties becomes its
//! [`FeatureOptions`].

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use geoimport_core::{FeatureOptions, ImportedFeature, Properties};
use serde_json::Value;

use super::DecodeError;

/// Property key carrying per-feature options.
pub(super) const OPTIONS_KEY: &str = "_umap_options";

fn position(value: &Value) -> Result<Coord<f64>, DecodeError> {
    let pair = value.as_array().ok_or(DecodeError::Coordinates)?;
    match pair.as_slice() {
        [x, y, ..] => Ok(Coord {
            x: x.as_f64().ok_or(DecodeError::Coordinates)?,
            y: y.as_f64().ok_or(DecodeError::Coordinates)?,
        }),
        _ => Err(DecodeError::Coordinates),
    }
}

fn positions(value: &Value) -> Result<Vec<Coord<f64>>, DecodeError> {
    value
        .as_array()
        .ok_or(DecodeError::Coordinates)?
        .iter()
        .map(position)
        .collect()
}

fn nested<T>(
    value: &Value,
    each: impl Fn(&Value) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    value
        .as_array()
        .ok_or(DecodeError::Coordinates)?
        .iter()
        .map(each)
        .collect()
}

fn polygon(value: &Value) -> Result<Polygon<f64>, DecodeError> {
    let mut rings = nested(value, |ring| positions(ring).map(LineString::from))?.into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Decode a GeoJSON geometry object. `null` yields `None`.
///
/// # Errors
///
/// Returns [`DecodeError::GeometryType`] for unknown types and
/// [`DecodeError::Coordinates`] for malformed coordinate arrays.
pub(super) fn geometry(value: &Value) -> Result<Option<Geometry<f64>>, DecodeError> {
    if value.is_null() {
        return Ok(None);
    }
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
    if kind == "GeometryCollection" {
        let members = value
            .get("geometries")
            .map(|list| nested(list, geometry))
            .transpose()?
            .unwrap_or_default();
        let members: Vec<Geometry<f64>> = members.into_iter().flatten().collect();
        return Ok(Some(Geometry::GeometryCollection(GeometryCollection(members))));
    }
    let coords = value.get("coordinates").ok_or(DecodeError::Coordinates)?;
    let decoded: Geometry<f64> = match kind {
        "Point" => Point::from(position(coords)?).into(),
        "MultiPoint" => MultiPoint::from(positions(coords)?).into(),
        "LineString" => LineString::from(positions(coords)?).into(),
        "MultiLineString" => {
            MultiLineString::new(nested(coords, |line| positions(line).map(LineString::from))?)
                .into()
        }
        "Polygon" => polygon(coords)?.into(),
        "MultiPolygon" => MultiPolygon::new(nested(coords, polygon)?).into(),
        other => return Err(DecodeError::GeometryType(other.to_owned())),
    };
    Ok(Some(decoded))
}

fn feature_id(value: Option<&Value>, index: usize) -> String {
    match value {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => (index + 1).to_string(),
    }
}

/// Decode one `Feature` object; `index` numbers features without an id.
pub(super) fn feature(value: &Value, index: usize) -> Result<ImportedFeature, DecodeError> {
    let geometry = geometry(value.get("geometry").unwrap_or(&Value::Null))?;
    let mut properties: Properties = match value.get("properties") {
        Some(Value::Object(map)) => map.clone(),
        _ => Properties::new(),
    };
    let options = match properties.remove(OPTIONS_KEY) {
        Some(raw @ Value::Object(_)) => serde_json::from_value::<FeatureOptions>(raw)?,
        _ => FeatureOptions::default(),
    };
    Ok(ImportedFeature::new(feature_id(value.get("id"), index), geometry)
        .with_properties(properties)
        .with_options(options))
}

/// Decode the `features` array of a collection.
pub(super) fn collection(value: &Value) -> Result<Vec<ImportedFeature>, DecodeError> {
    match value.get("features") {
        Some(Value::Array(features)) => features
            .iter()
            .enumerate()
            .map(|(index, item)| feature(item, index))
            .collect(),
        Some(_) => Err(DecodeError::Malformed("features is not an array".to_owned())),
        None => Ok(Vec::new()),
    }
}

/// Decode a GeoJSON document into features.
pub(super) fn features(text: &str) -> Result<Vec<ImportedFeature>, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => collection(&value),
        Some("Feature") => Ok(vec![feature(&value, 0)?]),
        Some(_) => Ok(vec![ImportedFeature::new("1", geometry(&value)?)]),
        None => Err(DecodeError::Malformed("missing GeoJSON type".to_owned())),
    }
}
