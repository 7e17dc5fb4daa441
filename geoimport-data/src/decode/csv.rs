//! Delimited text with latitude and longitude columns.
//!
//! The delimiter is sniffed from the header line. Every column becomes a
//! string property; rows whose coordinates do not parse are kept without
//! geometry.

use ::csv::{ReaderBuilder, StringRecord, Trim};
use geo::{Geometry, Point};
use geoimport_core::{ImportedFeature, Properties};
use serde_json::Value;

use super::DecodeError;

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const LAT_NAMES: [&str; 3] = ["lat", "latitude", "y"];
const LON_NAMES: [&str; 5] = ["lon", "lng", "long", "longitude", "x"];

/// Most frequent candidate delimiter on the first line; `,` when none.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    DELIMITERS
        .iter()
        .copied()
        .map(|delim| (header.bytes().filter(|b| *b == delim).count(), delim))
        .filter(|(count, _)| *count > 0)
        .max_by_key(|(count, _)| *count)
        .map_or(b',', |(_, delim)| delim)
}

fn column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|name| h.trim().eq_ignore_ascii_case(name)))
}

/// Parse a coordinate, accepting a decimal comma.
fn coordinate(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn point(record: &StringRecord, lat: usize, lon: usize) -> Option<Geometry<f64>> {
    let lat = coordinate(record.get(lat)?)?;
    let lon = coordinate(record.get(lon)?)?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
        .then(|| Point::new(lon, lat).into())
}

/// Decode delimited text into point features numbered from 1.
pub(super) fn features(text: &str) -> Result<Vec<ImportedFeature>, DecodeError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let (Some(lat), Some(lon)) = (column(&headers, &LAT_NAMES), column(&headers, &LON_NAMES))
    else {
        return Err(DecodeError::MissingLatLon);
    };
    reader
        .records()
        .enumerate()
        .map(|(index, record)| {
            let record = record?;
            let properties: Properties = headers
                .iter()
                .zip(record.iter())
                .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
                .collect();
            Ok(
                ImportedFeature::new((index + 1).to_string(), point(&record, lat, lon))
                    .with_properties(properties),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("lat,lon,name", b',')]
    #[case("lat;lon;name", b';')]
    #[case("lat\tlon\tname", b'\t')]
    #[case("lat|lon|name", b'|')]
    #[case("name", b',')]
    fn sniffs_delimiter(#[case] header: &str, #[case] expected: u8) {
        assert_eq!(sniff_delimiter(header), expected);
    }

    #[rstest]
    fn semicolon_file_with_decimal_commas() {
        let features = features("Name;Latitude;Longitude\nBench;45,76;4,83\nBroken;n/a;4.8\n")
            .expect("valid csv");
        let [bench, broken] = features.as_slice() else {
            panic!("expected two features, got {features:?}");
        };
        assert_eq!(bench.id, "1");
        assert_eq!(
            bench.handle.as_ref().map(|h| h.geometry.clone()),
            Some(Point::new(4.83, 45.76).into())
        );
        assert_eq!(bench.properties.get("Name"), Some(&Value::from("Bench")));
        assert!(broken.handle.is_none());
    }

    #[rstest]
    fn out_of_range_coordinates_have_no_geometry() {
        let features = features("y,x\n95,10\n").expect("valid csv");
        assert!(features.iter().all(|f| f.handle.is_none()));
    }

    #[rstest]
    fn missing_columns_fail() {
        assert!(matches!(
            features("name,city\nbench,Lyon\n"),
            Err(DecodeError::MissingLatLon)
        ));
    }
}
