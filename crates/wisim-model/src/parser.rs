//! Spatial scenario document parsing.
//!
//! Scenario documents are GeoJSON-style feature collections: a top-level
//! collection-type marker plus a `features` array. Parsing has two failure
//! layers. Document-level problems (unreadable file, invalid JSON, wrong
//! collection type) abort with a [`DocumentError`] before any feature is
//! produced. Feature-level problems (unsupported geometry type, malformed
//! coordinates) drop only the offending feature with a logged diagnostic;
//! the rest of the document still parses, and returned order matches
//! document order.

use crate::feature::{Category, Feature, Geometry};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wisim_common::Position;

/// Top-level type marker every scenario document must carry.
const COLLECTION_TYPE: &str = "FeatureCollection";

/// Errors that abort parsing of the whole document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("scenario document not found: {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scenario document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("wrong collection type '{0}', expected 'FeatureCollection'")]
    WrongCollectionType(String),
}

/// Why an individual feature was dropped. Never fatal to the document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("unsupported geometry type '{0}'")]
    UnsupportedGeometryType(String),

    #[error("point needs at least 2 coordinate values, found {0}")]
    ShortPoint(usize),

    #[error("polygon ring {ring} vertex {vertex} needs at least 2 coordinate values")]
    ShortPolygonVertex { ring: usize, vertex: usize },

    #[error("coordinates must be nested numeric arrays")]
    MalformedCoordinates,
}

/// Result of parsing a document: retained features in document order, plus
/// how many entries were dropped.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub features: Vec<Feature>,
    pub dropped: usize,
}

// ============================================================================
// JSON Schema Types
// ============================================================================

/// Root structure of a scenario document.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "type", default)]
    doc_type: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

/// One entry of the `features` array, before validation.
///
/// Ids may be strings or numbers depending on the authoring tool; numbers
/// are stringified, and entries without an id get a positional one.
#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<RawProperties>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawProperties {
    #[serde(default)]
    category: Option<String>,
    #[serde(default, rename = "experiment", alias = "experimentId")]
    experiment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type", default)]
    geom_type: String,
    #[serde(default)]
    coordinates: Value,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a scenario document from a file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParseOutcome, DocumentError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text)
}

/// Parse a scenario document from a string.
pub fn parse_str(text: &str) -> Result<ParseOutcome, DocumentError> {
    let raw: RawDocument = serde_json::from_str(text)?;

    if raw.doc_type != COLLECTION_TYPE {
        return Err(DocumentError::WrongCollectionType(raw.doc_type));
    }

    let mut features = Vec::with_capacity(raw.features.len());
    let mut dropped = 0;

    for (index, raw_feature) in raw.features.into_iter().enumerate() {
        let id = feature_id(raw_feature.id.as_ref(), index);
        match validate_feature(raw_feature, id) {
            Ok(feature) => features.push(feature),
            Err((id, err)) => {
                dropped += 1;
                warn!("Dropping feature '{}' (index {}): {}", id, index, err);
            }
        }
    }

    debug!(
        "Parsed {} features from document ({} dropped)",
        features.len(),
        dropped
    );

    Ok(ParseOutcome { features, dropped })
}

/// Resolve the document id of a feature entry.
fn feature_id(id: Option<&Value>, index: usize) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("feature-{}", index),
    }
}

/// Validate one raw feature entry into a typed [`Feature`].
///
/// Returns the id alongside the error so the caller can report which entry
/// was dropped.
fn validate_feature(raw: RawFeature, id: String) -> Result<Feature, (String, FeatureError)> {
    let (category, experiment_id) = match raw.properties {
        Some(props) => (
            props
                .category
                .as_deref()
                .map(Category::parse)
                .unwrap_or(Category::Unknown),
            props.experiment_id.unwrap_or_default(),
        ),
        None => (Category::Unknown, String::new()),
    };

    let geometry = match raw.geometry {
        Some(g) => match validate_geometry(g) {
            Ok(geom) => Some(geom),
            Err(err) => return Err((id, err)),
        },
        None => None,
    };

    Ok(Feature {
        id,
        experiment_id,
        category,
        geometry,
    })
}

fn validate_geometry(raw: RawGeometry) -> Result<Geometry, FeatureError> {
    match raw.geom_type.as_str() {
        "Point" => parse_point(&raw.coordinates).map(Geometry::Point),
        "Polygon" => parse_polygon(&raw.coordinates).map(|rings| Geometry::Polygon { rings }),
        other => Err(FeatureError::UnsupportedGeometryType(other.to_string())),
    }
}

/// A point is an array of at least two numbers; extra values (elevation)
/// are ignored.
fn parse_point(coordinates: &Value) -> Result<Position, FeatureError> {
    let values = coordinates
        .as_array()
        .ok_or(FeatureError::MalformedCoordinates)?;
    if values.len() < 2 {
        return Err(FeatureError::ShortPoint(values.len()));
    }
    let x = values[0].as_f64().ok_or(FeatureError::MalformedCoordinates)?;
    let y = values[1].as_f64().ok_or(FeatureError::MalformedCoordinates)?;
    Ok(Position::new(x, y))
}

/// A polygon is an array of rings, each ring an array of vertices, each
/// vertex an array of at least two numbers.
fn parse_polygon(coordinates: &Value) -> Result<Vec<Vec<Position>>, FeatureError> {
    let raw_rings = coordinates
        .as_array()
        .ok_or(FeatureError::MalformedCoordinates)?;

    let mut rings = Vec::with_capacity(raw_rings.len());
    for (ring_index, raw_ring) in raw_rings.iter().enumerate() {
        let raw_vertices = raw_ring
            .as_array()
            .ok_or(FeatureError::MalformedCoordinates)?;

        let mut ring = Vec::with_capacity(raw_vertices.len());
        for (vertex_index, raw_vertex) in raw_vertices.iter().enumerate() {
            let values = raw_vertex
                .as_array()
                .ok_or(FeatureError::MalformedCoordinates)?;
            if values.len() < 2 {
                return Err(FeatureError::ShortPolygonVertex {
                    ring: ring_index,
                    vertex: vertex_index,
                });
            }
            let x = values[0].as_f64().ok_or(FeatureError::MalformedCoordinates)?;
            let y = values[1].as_f64().ok_or(FeatureError::MalformedCoordinates)?;
            ring.push(Position::new(x, y));
        }
        rings.push(ring);
    }
    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_feature(id: &str, category: &str, x: f64, y: f64) -> String {
        format!(
            r#"{{"type": "Feature", "id": "{}", "properties": {{"category": "{}"}},
                "geometry": {{"type": "Point", "coordinates": [{}, {}]}}}}"#,
            id, category, x, y
        )
    }

    fn collection(features: &[String]) -> String {
        format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        )
    }

    #[test]
    fn test_parse_simple_collection() {
        let doc = collection(&[
            point_feature("ap-0", "AccessPoint", 5.0, 15.0),
            point_feature("door-0", "Door", 0.0, 10.0),
            point_feature("seat-0", "Seat", 12.0, 8.0),
        ]);

        let outcome = parse_str(&doc).unwrap();
        assert_eq!(outcome.features.len(), 3);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.features[0].id, "ap-0");
        assert_eq!(outcome.features[0].category, Category::AccessPoint);
        assert_eq!(
            outcome.features[0].geometry.as_ref().and_then(|g| g.as_point()),
            Some(Position::new(5.0, 15.0))
        );
        assert_eq!(outcome.features[1].category, Category::Door);
        assert_eq!(outcome.features[2].category, Category::Seat);
    }

    #[test]
    fn test_wrong_collection_type_is_fatal() {
        let doc = r#"{"type": "GeometryCollection", "features": []}"#;
        match parse_str(doc) {
            Err(DocumentError::WrongCollectionType(found)) => {
                assert_eq!(found, "GeometryCollection");
            }
            other => panic!("expected WrongCollectionType, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_collection_type_is_fatal() {
        let doc = r#"{"features": []}"#;
        assert!(matches!(
            parse_str(doc),
            Err(DocumentError::WrongCollectionType(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(
            parse_str("{not json"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_file_not_found() {
        let err = parse_file("/nonexistent/floor.geojson").unwrap_err();
        assert!(matches!(err, DocumentError::NotFound { .. }));
    }

    #[test]
    fn test_unknown_category_parses() {
        let doc = collection(&[point_feature("x", "escalator", 1.0, 1.0)]);
        let outcome = parse_str(&doc).unwrap();
        assert_eq!(outcome.features.len(), 1);
        assert_eq!(outcome.features[0].category, Category::Unknown);
    }

    #[test]
    fn test_one_bad_feature_does_not_abort_the_document() {
        // Nine good features and one whose polygon has a single-coordinate
        // vertex.
        let mut features: Vec<String> = (0..9)
            .map(|i| point_feature(&format!("f{}", i), "Wall", i as f64, 0.0))
            .collect();
        features.insert(
            4,
            r#"{"type": "Feature", "id": "bad", "properties": {"category": "Room"},
                "geometry": {"type": "Polygon", "coordinates": [[[5.0], [1.0, 2.0]]]}}"#
                .to_string(),
        );

        let outcome = parse_str(&collection(&features)).unwrap();
        assert_eq!(outcome.features.len(), 9);
        assert_eq!(outcome.dropped, 1);
        // Order of the retained features matches document order.
        let ids: Vec<&str> = outcome.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8"]);
    }

    #[test]
    fn test_single_coordinate_point_is_dropped() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"id": "p", "properties": {"category": "Seat"},
             "geometry": {"type": "Point", "coordinates": [5.0]}}
        ]}"#;
        let outcome = parse_str(doc).unwrap();
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_unsupported_geometry_type_is_dropped() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"id": "line", "properties": {"category": "Wall"},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
        ]}"#;
        let outcome = parse_str(doc).unwrap();
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_missing_geometry_is_not_an_error() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"id": "ap", "properties": {"category": "AccessPoint"}}
        ]}"#;
        let outcome = parse_str(doc).unwrap();
        assert_eq!(outcome.features.len(), 1);
        assert!(outcome.features[0].geometry.is_none());
    }

    #[test]
    fn test_duplicate_ids_are_permitted() {
        let doc = collection(&[
            point_feature("dup", "Wall", 0.0, 0.0),
            point_feature("dup", "Wall", 1.0, 1.0),
        ]);
        let outcome = parse_str(&doc).unwrap();
        assert_eq!(outcome.features.len(), 2);
        assert_eq!(outcome.features[0].id, "dup");
        assert_eq!(outcome.features[1].id, "dup");
    }

    #[test]
    fn test_numeric_and_missing_ids() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"id": 17, "properties": {"category": "Wall"}},
            {"properties": {"category": "Wall"}}
        ]}"#;
        let outcome = parse_str(doc).unwrap();
        assert_eq!(outcome.features[0].id, "17");
        assert_eq!(outcome.features[1].id, "feature-1");
    }

    #[test]
    fn test_polygon_parses_rings_in_order() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"id": "room", "properties": {"category": "Room"},
             "geometry": {"type": "Polygon", "coordinates":
                [[[0.0, 0.0], [10.0, 0.0], [10.0, 5.0], [0.0, 5.0], [0.0, 0.0]]]}}
        ]}"#;
        let outcome = parse_str(doc).unwrap();
        match outcome.features[0].geometry.as_ref() {
            Some(Geometry::Polygon { rings }) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][1], Position::new(10.0, 0.0));
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_experiment_id_is_captured() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"id": "a", "properties": {"category": "Seat", "experiment": "exp-3"}},
            {"id": "b", "properties": {"category": "Seat", "experimentId": "exp-4"}}
        ]}"#;
        let outcome = parse_str(doc).unwrap();
        assert_eq!(outcome.features[0].experiment_id, "exp-3");
        assert_eq!(outcome.features[1].experiment_id, "exp-4");
    }
}
