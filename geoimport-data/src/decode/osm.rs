//! OpenStreetMap elements, as served by Overpass.
//!
//! Overpass JSON deserialises straight into [`OsmElement`]; OSM XML is
//! mapped onto the same types by the XML reader. Assembly into features
//! then follows one set of rules:
//!
//! - untagged nodes are way vertices and produce no feature;
//! - ways use their inline geometry, then their node references, then their
//!   `center`; closed area-like ways become polygons;
//! - multipolygon and boundary relations stitch their outer and inner
//!   members into polygons, other relations become multi-lines, and a
//!   relation without member geometry falls back to its `center`.
//!
//! See: <https://wiki.openstreetmap.org/wiki/OSM_JSON>

use std::collections::{BTreeMap, HashMap, HashSet};

use geo::{Contains, Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use geoimport_core::{ImportedFeature, Properties};
use serde::Deserialize;
use serde_json::Value;

use super::DecodeError;

/// Tag map of an element.
pub(super) type Tags = BTreeMap<String, String>;

/// Keys whose presence marks a closed way as an area.
const AREA_KEYS: [&str; 10] = [
    "building", "landuse", "leisure", "natural", "amenity", "place", "boundary", "historic",
    "tourism", "shop",
];

/// A latitude and longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub(super) struct LatLon {
    pub(super) lat: f64,
    pub(super) lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(point: LatLon) -> Self {
        Self {
            x: point.lon,
            y: point.lat,
        }
    }
}

/// Overpass JSON response.
#[derive(Debug, Default, Deserialize)]
pub(super) struct OverpassResponse {
    #[serde(default)]
    pub(super) elements: Vec<OsmElement>,
}

/// One element of a response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(super) enum OsmElement {
    Node(OsmNode),
    Way(OsmWay),
    Relation(OsmRelation),
    /// `area`, `count` and other derived elements.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsmNode {
    pub(super) id: u64,
    pub(super) lat: Option<f64>,
    pub(super) lon: Option<f64>,
    #[serde(default)]
    pub(super) tags: Tags,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsmWay {
    pub(super) id: u64,
    #[serde(default)]
    pub(super) nodes: Vec<u64>,
    #[serde(default)]
    pub(super) geometry: Vec<LatLon>,
    pub(super) center: Option<LatLon>,
    #[serde(default)]
    pub(super) tags: Tags,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsmMember {
    #[serde(rename = "type")]
    pub(super) kind: String,
    #[serde(rename = "ref")]
    pub(super) reference: u64,
    #[serde(default)]
    pub(super) role: String,
    #[serde(default)]
    pub(super) geometry: Vec<LatLon>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsmRelation {
    pub(super) id: u64,
    #[serde(default)]
    pub(super) members: Vec<OsmMember>,
    pub(super) center: Option<LatLon>,
    #[serde(default)]
    pub(super) tags: Tags,
}

/// Coordinates of the nodes and ways seen in one payload.
#[derive(Default)]
struct Index {
    nodes: HashMap<u64, Coord<f64>>,
    ways: HashMap<u64, Vec<Coord<f64>>>,
    members: HashSet<u64>,
}

impl Index {
    fn build(elements: &[OsmElement]) -> Self {
        let mut index = Self::default();
        for element in elements {
            if let OsmElement::Node(OsmNode {
                id,
                lat: Some(lat),
                lon: Some(lon),
                ..
            }) = element
            {
                index.nodes.insert(*id, Coord { x: *lon, y: *lat });
            }
        }
        for element in elements {
            match element {
                OsmElement::Way(way) => {
                    let coords = index.way_coords(way);
                    index.ways.insert(way.id, coords);
                }
                OsmElement::Relation(relation) => index.members.extend(
                    relation
                        .members
                        .iter()
                        .filter(|member| member.kind == "way")
                        .map(|member| member.reference),
                ),
                _ => {}
            }
        }
        index
    }

    fn way_coords(&self, way: &OsmWay) -> Vec<Coord<f64>> {
        if way.geometry.is_empty() {
            way.nodes
                .iter()
                .filter_map(|id| self.nodes.get(id).copied())
                .collect()
        } else {
            way.geometry.iter().copied().map(Coord::from).collect()
        }
    }

    fn member_coords(&self, member: &OsmMember) -> Vec<Coord<f64>> {
        if member.geometry.is_empty() {
            self.ways.get(&member.reference).cloned().unwrap_or_default()
        } else {
            member.geometry.iter().copied().map(Coord::from).collect()
        }
    }
}

fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 4 && coords.first() == coords.last()
}

fn is_area(tags: &Tags) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("yes") => true,
        Some("no") => false,
        _ => AREA_KEYS.iter().any(|key| tags.contains_key(*key)),
    }
}

/// Join way segments end to end into closed rings. Segments that never
/// close are dropped.
fn stitch(mut segments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();
    while let Some(mut ring) = segments.pop() {
        while !is_closed(&ring) {
            let Some(end) = ring.last().copied() else {
                break;
            };
            let Some(at) = segments
                .iter()
                .position(|seg| seg.first() == Some(&end) || seg.last() == Some(&end))
            else {
                break;
            };
            let mut segment = segments.swap_remove(at);
            if segment.first() != Some(&end) {
                segment.reverse();
            }
            ring.extend(segment.into_iter().skip(1));
        }
        if is_closed(&ring) {
            rings.push(LineString::from(ring));
        }
    }
    rings
}

fn area_geometry(relation: &OsmRelation, index: &Index) -> Option<Geometry<f64>> {
    let segments = |role: &str| -> Vec<Vec<Coord<f64>>> {
        relation
            .members
            .iter()
            .filter(|member| member.kind == "way" && member.role == role)
            .map(|member| index.member_coords(member))
            .filter(|coords| coords.len() >= 2)
            .collect()
    };
    let mut outers = segments("outer");
    outers.extend(segments(""));
    let mut polygons: Vec<Polygon<f64>> = stitch(outers)
        .into_iter()
        .map(|ring| Polygon::new(ring, Vec::new()))
        .collect();
    for inner in stitch(segments("inner")) {
        let Some(first) = inner.0.first().copied() else {
            continue;
        };
        if let Some(host) = polygons
            .iter_mut()
            .find(|polygon| polygon.contains(&Point::from(first)))
        {
            host.interiors_push(inner);
        }
    }
    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Geometry::Polygon),
        _ => Some(MultiPolygon::new(polygons).into()),
    }
}

fn relation_geometry(relation: &OsmRelation, index: &Index) -> Option<Geometry<f64>> {
    let kind = relation.tags.get("type").map(String::as_str);
    let area = matches!(kind, Some("multipolygon" | "boundary"))
        .then(|| area_geometry(relation, index))
        .flatten();
    if area.is_some() {
        return area;
    }
    let lines: Vec<LineString<f64>> = relation
        .members
        .iter()
        .filter(|member| member.kind == "way")
        .map(|member| index.member_coords(member))
        .filter(|coords| coords.len() >= 2)
        .map(LineString::from)
        .collect();
    if lines.is_empty() {
        relation
            .center
            .map(|center| Point::from(Coord::from(center)).into())
    } else {
        Some(MultiLineString::new(lines).into())
    }
}

fn way_geometry(way: &OsmWay, index: &Index) -> Option<Geometry<f64>> {
    let coords = index.ways.get(&way.id).cloned().unwrap_or_default();
    if coords.len() >= 2 {
        let line = LineString::from(coords);
        return Some(if is_closed(&line.0) && is_area(&way.tags) {
            Polygon::new(line, Vec::new()).into()
        } else {
            line.into()
        });
    }
    way.center
        .map(|center| Point::from(Coord::from(center)).into())
}

fn properties(tags: &Tags) -> Properties {
    tags.iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}

fn feature(kind: &str, id: u64, tags: &Tags, geometry: Option<Geometry<f64>>) -> ImportedFeature {
    ImportedFeature::new(format!("{kind}/{id}"), geometry).with_properties(properties(tags))
}

/// Assemble elements into features, in payload order.
pub(super) fn assemble(elements: &[OsmElement]) -> Vec<ImportedFeature> {
    let index = Index::build(elements);
    elements
        .iter()
        .filter_map(|element| match element {
            OsmElement::Node(node) if !node.tags.is_empty() => {
                let geometry = node
                    .lat
                    .zip(node.lon)
                    .map(|(lat, lon)| Point::new(lon, lat).into());
                Some(feature("node", node.id, &node.tags, geometry))
            }
            OsmElement::Way(way) if !way.tags.is_empty() || !index.members.contains(&way.id) => {
                Some(feature("way", way.id, &way.tags, way_geometry(way, &index)))
            }
            OsmElement::Relation(relation) => Some(feature(
                "relation",
                relation.id,
                &relation.tags,
                relation_geometry(relation, &index),
            )),
            _ => None,
        })
        .collect()
}

/// Decode an Overpass JSON response.
pub(super) fn overpass_features(text: &str) -> Result<Vec<ImportedFeature>, DecodeError> {
    let response: OverpassResponse = serde_json::from_str(text)?;
    Ok(assemble(&response.elements))
}
