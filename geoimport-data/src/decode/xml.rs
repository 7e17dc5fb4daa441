//! XML formats: GPX, KML, GeoRSS and OSM XML.
//!
//! Payloads are first read into a small element tree with namespace
//! prefixes dropped, then walked per format.

use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, Point, Polygon};
use geoimport_core::{ImportedFeature, Properties};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

use super::DecodeError;
use super::osm::{self, LatLon, OsmElement, OsmMember, OsmNode, OsmRelation, OsmWay, Tags};

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, DecodeError> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            attrs.push((key, attr.unescape_value()?.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attrs,
            ..Self::default()
        })
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn text(&self) -> Option<&str> {
        Some(self.text.trim()).filter(|t| !t.is_empty())
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Self::text)
    }

    /// Elements named in `names`, in document order, without descending
    /// into matches.
    fn collect<'a>(&'a self, names: &[&str], out: &mut Vec<&'a Self>) {
        for child in &self.children {
            if names.contains(&child.name.as_str()) {
                out.push(child);
            } else {
                child.collect(names, out);
            }
        }
    }

    fn find_all<'a>(&'a self, names: &[&str]) -> Vec<&'a Self> {
        let mut out = Vec::new();
        self.collect(names, &mut out);
        out
    }

    /// Leaf children with text, as string properties.
    fn text_properties(&self) -> Properties {
        self.children
            .iter()
            .filter(|c| c.children.is_empty())
            .filter_map(|c| c.text().map(|t| (c.name.clone(), Value::String(t.to_owned()))))
            .collect()
    }
}

/// Read `text` into a tree under an unnamed root.
fn parse(text: &str) -> Result<Element, DecodeError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut stack = vec![Element::default()];
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .filter(|_| !stack.is_empty())
                    .ok_or_else(|| DecodeError::Malformed("unbalanced closing tag".to_owned()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::Text(content) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&content.unescape()?);
                }
            }
            Event::CData(content) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(root),
        _ => Err(DecodeError::Malformed("unclosed element".to_owned())),
    }
}

fn number(raw: &str) -> Result<f64, DecodeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(DecodeError::Coordinates)
}

/// Point from `lat` and `lon` attributes.
fn attr_coord(element: &Element) -> Result<Option<Coord<f64>>, DecodeError> {
    match (element.attr("lat"), element.attr("lon")) {
        (Some(lat), Some(lon)) => Ok(Some(Coord {
            x: number(lon)?,
            y: number(lat)?,
        })),
        _ => Ok(None),
    }
}

fn numbered(features: Vec<(Option<Geometry<f64>>, Properties)>) -> Vec<ImportedFeature> {
    features
        .into_iter()
        .enumerate()
        .map(|(index, (geometry, properties))| {
            ImportedFeature::new((index + 1).to_string(), geometry).with_properties(properties)
        })
        .collect()
}

// --- GPX ---

fn gpx_line(points: &[&Element]) -> Result<LineString<f64>, DecodeError> {
    let coords = points
        .iter()
        .filter_map(|p| attr_coord(p).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::from(coords))
}

fn gpx_geometry(element: &Element) -> Result<Option<Geometry<f64>>, DecodeError> {
    Ok(match element.name.as_str() {
        "wpt" => attr_coord(element)?.map(|c| Point::from(c).into()),
        "rte" => {
            let line = gpx_line(&element.children_named("rtept").collect::<Vec<_>>())?;
            (line.0.len() >= 2).then(|| line.into())
        }
        _ => {
            let mut segments = element
                .children_named("trkseg")
                .map(|seg| gpx_line(&seg.children_named("trkpt").collect::<Vec<_>>()))
                .filter(|line| line.as_ref().map_or(true, |l| l.0.len() >= 2))
                .collect::<Result<Vec<_>, _>>()?;
            match segments.len() {
                0 => None,
                1 => segments.pop().map(Geometry::LineString),
                _ => Some(MultiLineString::new(segments).into()),
            }
        }
    })
}

/// Decode waypoints, routes and tracks.
pub(super) fn gpx(text: &str) -> Result<Vec<ImportedFeature>, DecodeError> {
    let root = parse(text)?;
    let items = root
        .find_all(&["wpt", "rte", "trk"])
        .into_iter()
        .map(|el| Ok::<_, DecodeError>((gpx_geometry(el)?, el.text_properties())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(numbered(items))
}

// --- KML ---

const KML_GEOMETRIES: [&str; 5] = ["Point", "LineString", "LinearRing", "Polygon", "MultiGeometry"];

/// Whitespace-separated `lon,lat[,alt]` tuples.
fn kml_coords(element: &Element) -> Result<Vec<Coord<f64>>, DecodeError> {
    element
        .child_text("coordinates")
        .unwrap_or_default()
        .split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            match (parts.next(), parts.next()) {
                (Some(x), Some(y)) => Ok(Coord {
                    x: number(x)?,
                    y: number(y)?,
                }),
                _ => Err(DecodeError::Coordinates),
            }
        })
        .collect()
}

fn kml_ring(boundary: &Element) -> Result<Option<LineString<f64>>, DecodeError> {
    boundary
        .child("LinearRing")
        .map(|ring| kml_coords(ring).map(LineString::from))
        .transpose()
}

fn kml_geometry(element: &Element) -> Result<Option<Geometry<f64>>, DecodeError> {
    Ok(match element.name.as_str() {
        "Point" => kml_coords(element)?
            .first()
            .map(|c| Point::from(*c).into()),
        "LineString" | "LinearRing" => Some(LineString::from(kml_coords(element)?).into()),
        "Polygon" => {
            let Some(exterior) = element
                .child("outerBoundaryIs")
                .map(kml_ring)
                .transpose()?
                .flatten()
            else {
                return Ok(None);
            };
            let interiors = element
                .children_named("innerBoundaryIs")
                .map(kml_ring)
                .collect::<Result<Vec<_>, _>>()?;
            Some(Polygon::new(exterior, interiors.into_iter().flatten().collect()).into())
        }
        "MultiGeometry" => {
            let members = element
                .children
                .iter()
                .map(kml_geometry)
                .collect::<Result<Vec<_>, _>>()?;
            let members: Vec<Geometry<f64>> = members.into_iter().flatten().collect();
            Some(Geometry::GeometryCollection(GeometryCollection(members)))
        }
        _ => None,
    })
}

fn kml_properties(placemark: &Element) -> Properties {
    let mut properties = Properties::new();
    for key in ["name", "description"] {
        if let Some(text) = placemark.child_text(key) {
            properties.insert(key.to_owned(), Value::String(text.to_owned()));
        }
    }
    if let Some(extended) = placemark.child("ExtendedData") {
        for data in extended.find_all(&["Data", "SimpleData"]) {
            let value = data.child_text("value").or_else(|| data.text());
            if let (Some(name), Some(value)) = (data.attr("name"), value) {
                properties.insert(name.to_owned(), Value::String(value.to_owned()));
            }
        }
    }
    properties
}

/// Decode placemarks.
pub(super) fn kml(text: &str) -> Result<Vec<ImportedFeature>, DecodeError> {
    let root = parse(text)?;
    let items = root
        .find_all(&["Placemark"])
        .into_iter()
        .map(|placemark| {
            let geometry = placemark
                .children
                .iter()
                .find(|c| KML_GEOMETRIES.contains(&c.name.as_str()))
                .map(kml_geometry)
                .transpose()?
                .flatten();
            Ok::<_, DecodeError>((geometry, kml_properties(placemark)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(numbered(items))
}

// --- GeoRSS ---

/// Whitespace-separated `lat lon` pairs.
fn lat_lon_pairs(raw: &str) -> Result<Vec<Coord<f64>>, DecodeError> {
    let values = raw
        .split_whitespace()
        .map(number)
        .collect::<Result<Vec<_>, _>>()?;
    let pairs = values.chunks_exact(2);
    if !pairs.remainder().is_empty() {
        return Err(DecodeError::Coordinates);
    }
    Ok(pairs
        .filter_map(|pair| match pair {
            [lat, lon] => Some(Coord { x: *lon, y: *lat }),
            _ => None,
        })
        .collect())
}

fn georss_geometry(item: &Element) -> Result<Option<Geometry<f64>>, DecodeError> {
    if let Some(raw) = item.child_text("point") {
        return Ok(lat_lon_pairs(raw)?.first().map(|c| Point::from(*c).into()));
    }
    if let Some(raw) = item.child_text("line") {
        return Ok(Some(LineString::from(lat_lon_pairs(raw)?).into()));
    }
    if let Some(raw) = item.child_text("polygon") {
        let ring = LineString::from(lat_lon_pairs(raw)?);
        return Ok(Some(Polygon::new(ring, Vec::new()).into()));
    }
    if let Some(place) = item.child("where") {
        if let Some(raw) = place.find_all(&["posList"]).first().and_then(|e| e.text()) {
            return Ok(Some(LineString::from(lat_lon_pairs(raw)?).into()));
        }
        if let Some(raw) = place.find_all(&["pos"]).first().and_then(|e| e.text()) {
            return Ok(lat_lon_pairs(raw)?.first().map(|c| Point::from(*c).into()));
        }
    }
    let holder = item.child("Point").unwrap_or(item);
    match (holder.child_text("lat"), holder.child_text("long")) {
        (Some(lat), Some(lon)) => Ok(Some(Point::new(number(lon)?, number(lat)?).into())),
        _ => Ok(None),
    }
}

fn georss_properties(item: &Element) -> Properties {
    let mut properties = Properties::new();
    for key in ["title", "description", "summary"] {
        if let Some(text) = item.child_text(key) {
            properties.insert(key.to_owned(), Value::String(text.to_owned()));
        }
    }
    if let Some(link) = item
        .child("link")
        .and_then(|link| link.text().or_else(|| link.attr("href")))
    {
        properties.insert("link".to_owned(), Value::String(link.to_owned()));
    }
    properties
}

/// Decode RSS items and Atom entries.
pub(super) fn georss(text: &str) -> Result<Vec<ImportedFeature>, DecodeError> {
    let root = parse(text)?;
    let items = root
        .find_all(&["item", "entry"])
        .into_iter()
        .map(|item| Ok::<_, DecodeError>((georss_geometry(item)?, georss_properties(item))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(numbered(items))
}

// --- OSM XML ---

fn osm_id(element: &Element, attr: &str) -> Result<u64, DecodeError> {
    element
        .attr(attr)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| DecodeError::Malformed(format!("{} without a valid {attr}", element.name)))
}

fn osm_tags(element: &Element) -> Tags {
    element
        .children_named("tag")
        .filter_map(|tag| Some((tag.attr("k")?.to_owned(), tag.attr("v")?.to_owned())))
        .collect()
}

fn lat_lon(element: &Element) -> Result<Option<LatLon>, DecodeError> {
    Ok(attr_coord(element)?.map(|c| LatLon { lat: c.y, lon: c.x }))
}

fn nd_geometry(element: &Element) -> Result<Vec<LatLon>, DecodeError> {
    element
        .children_named("nd")
        .filter_map(|nd| lat_lon(nd).transpose())
        .collect()
}

fn center(element: &Element) -> Result<Option<LatLon>, DecodeError> {
    Ok(element.child("center").map(lat_lon).transpose()?.flatten())
}

fn osm_element(element: &Element) -> Result<OsmElement, DecodeError> {
    Ok(match element.name.as_str() {
        "node" => OsmElement::Node(OsmNode {
            id: osm_id(element, "id")?,
            lat: element.attr("lat").map(number).transpose()?,
            lon: element.attr("lon").map(number).transpose()?,
            tags: osm_tags(element),
        }),
        "way" => OsmElement::Way(OsmWay {
            id: osm_id(element, "id")?,
            nodes: element
                .children_named("nd")
                .map(|nd| osm_id(nd, "ref"))
                .collect::<Result<_, _>>()?,
            geometry: nd_geometry(element)?,
            center: center(element)?,
            tags: osm_tags(element),
        }),
        _ => OsmElement::Relation(OsmRelation {
            id: osm_id(element, "id")?,
            members: element
                .children_named("member")
                .map(|member| {
                    Ok::<_, DecodeError>(OsmMember {
                        kind: member.attr("type").unwrap_or_default().to_owned(),
                        reference: osm_id(member, "ref")?,
                        role: member.attr("role").unwrap_or_default().to_owned(),
                        geometry: nd_geometry(member)?,
                    })
                })
                .collect::<Result<_, _>>()?,
            center: center(element)?,
            tags: osm_tags(element),
        }),
    })
}

/// Decode an `<osm>` document.
pub(super) fn osm(text: &str) -> Result<Vec<ImportedFeature>, DecodeError> {
    let root = parse(text)?;
    let elements = root
        .find_all(&["node", "way", "relation"])
        .into_iter()
        .map(osm_element)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(osm::assemble(&elements))
}
