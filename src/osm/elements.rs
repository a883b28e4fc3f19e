//! Conversion of Overpass JSON elements into features.

use geo::{Coord, LineString, Point, Polygon};
use hashbrown::HashMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::geometry::rings::assemble_multipolygon;
use crate::models::{Feature, GeoLayer, OsmType};

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Set by Overpass when a query timed out or ran out of memory
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(p: LatLon) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub member_type: String,
    #[serde(rename = "ref")]
    pub id: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        geometry: Vec<Option<LatLon>>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
}

fn properties(osm_type: OsmType, id: i64, tags: &HashMap<String, String>) -> Map<String, Value> {
    let mut props: Map<String, Value> = tags
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    props.insert("element_type".to_string(), Value::String(osm_type.to_string()));
    props.insert("osmid".to_string(), Value::from(id));
    props
}

fn coords(geometry: &[Option<LatLon>]) -> Vec<Coord<f64>> {
    geometry.iter().flatten().map(|&p| p.into()).collect()
}

/// Whether a closed way with these tags describes an area rather than a line
pub fn is_area(tags: &HashMap<String, String>) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("yes") => return true,
        Some("no") => return false,
        _ => {}
    }

    const ALWAYS: &[&str] = &[
        "building",
        "building:part",
        "landuse",
        "amenity",
        "leisure",
        "shop",
        "tourism",
        "boundary",
        "place",
        "historic",
        "military",
        "office",
        "public_transport",
        "area:highway",
    ];
    if ALWAYS.iter().any(|k| tags.contains_key(*k)) {
        return true;
    }

    let in_list = |key: &str, values: &[&str]| {
        tags.get(key)
            .map(|v| values.contains(&v.as_str()))
            .unwrap_or(false)
    };

    if let Some(natural) = tags.get("natural") {
        return !matches!(
            natural.as_str(),
            "coastline" | "cliff" | "ridge" | "arete" | "tree_row"
        );
    }

    in_list("waterway", &["riverbank", "dock", "boatyard", "dam"])
        || in_list("highway", &["services", "rest_area", "escape", "elevator", "platform"])
        || in_list("railway", &["station", "turntable", "roundhouse", "platform"])
        || in_list(
            "barrier",
            &["city_wall", "ditch", "hedge", "retaining_wall", "spikes"],
        )
        || in_list("power", &["plant", "substation", "generator", "transformer"])
        || in_list("man_made", &["pier", "bridge", "wastewater_plant", "works"])
        || in_list("aeroway", &["aerodrome", "apron", "hangar", "terminal", "helipad"])
}

/// Features for a tag query: points, lines, areas and multipolygon relations
pub fn to_features(elements: &[Element]) -> GeoLayer {
    let mut features = Vec::new();

    for element in elements {
        match element {
            Element::Node { id, lat, lon, tags } => {
                // Untagged nodes are way vertices, not features
                if tags.is_empty() {
                    continue;
                }
                features.push(Feature {
                    geometry: Point::new(*lon, *lat).into(),
                    properties: properties(OsmType::Node, *id, tags),
                });
            }
            Element::Way {
                id, geometry, tags, ..
            } => {
                let ring = coords(geometry);
                if ring.len() < 2 {
                    continue;
                }
                let closed = ring.len() >= 4 && ring.first() == ring.last();
                let geometry = if closed && is_area(tags) {
                    Polygon::new(LineString::new(ring), vec![]).into()
                } else {
                    LineString::new(ring).into()
                };
                features.push(Feature {
                    geometry,
                    properties: properties(OsmType::Way, *id, tags),
                });
            }
            Element::Relation { id, members, tags } => {
                if tags.get("type").map(String::as_str) != Some("multipolygon") {
                    debug!("Skipping relation {} that is not a multipolygon", id);
                    continue;
                }

                let mut outer = Vec::new();
                let mut inner = Vec::new();
                for member in members.iter().filter(|m| m.member_type == "way") {
                    let fragment = coords(&member.geometry);
                    match member.role.as_str() {
                        "inner" => inner.push(fragment),
                        "outer" | "" => outer.push(fragment),
                        _ => {}
                    }
                }

                match assemble_multipolygon(outer, inner) {
                    Some(mp) => features.push(Feature {
                        geometry: mp.into(),
                        properties: properties(OsmType::Relation, *id, tags),
                    }),
                    None => debug!("Could not assemble geometry for relation {}", id),
                }
            }
        }
    }

    GeoLayer::new(features)
}

/// Network edges: ways split at every node shared with another way.
///
/// Each edge carries the way tags plus `osmid`, `u` and `v` (end node ids).
pub fn to_edges(elements: &[Element]) -> GeoLayer {
    let mut degree: HashMap<i64, usize> = HashMap::new();
    for element in elements {
        if let Element::Way { nodes, .. } = element {
            for node in nodes {
                *degree.entry(*node).or_insert(0) += 1;
            }
        }
    }

    let mut features = Vec::new();

    for element in elements {
        let Element::Way {
            id,
            nodes,
            geometry,
            tags,
        } = element
        else {
            continue;
        };

        let aligned = nodes.len() == geometry.len() && geometry.iter().all(Option::is_some);
        if !aligned {
            // Without per-node coordinates the way is kept whole
            let line = coords(geometry);
            if line.len() >= 2 {
                let mut props = properties(OsmType::Way, *id, tags);
                if let (Some(u), Some(v)) = (nodes.first(), nodes.last()) {
                    props.insert("u".to_string(), Value::from(*u));
                    props.insert("v".to_string(), Value::from(*v));
                }
                features.push(Feature {
                    geometry: LineString::new(line).into(),
                    properties: props,
                });
            }
            continue;
        }

        let line = coords(geometry);
        let mut start = 0;
        for i in 1..nodes.len() {
            let is_split = i == nodes.len() - 1 || degree.get(&nodes[i]).copied().unwrap_or(0) > 1;
            if !is_split {
                continue;
            }

            let mut props = properties(OsmType::Way, *id, tags);
            props.insert("u".to_string(), Value::from(nodes[start]));
            props.insert("v".to_string(), Value::from(nodes[i]));
            features.push(Feature {
                geometry: LineString::new(line[start..=i].to_vec()).into(),
                properties: props,
            });
            start = i;
        }
    }

    GeoLayer::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Geometry;

    fn parse(json: &str) -> Vec<Element> {
        serde_json::from_str::<OverpassResponse>(json)
            .unwrap()
            .elements
    }

    #[test]
    fn test_closed_building_way_is_polygon() {
        let elements = parse(
            r#"{"elements": [{
                "type": "way", "id": 1, "nodes": [1, 2, 3, 1],
                "geometry": [
                    {"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 1.0},
                    {"lat": 1.0, "lon": 1.0}, {"lat": 0.0, "lon": 0.0}
                ],
                "tags": {"building": "yes"}
            }]}"#,
        );
        let layer = to_features(&elements);
        assert_eq!(layer.len(), 1);
        assert!(matches!(layer.features[0].geometry, Geometry::Polygon(_)));
        assert_eq!(layer.features[0].property("building").unwrap(), "yes");
        assert_eq!(layer.features[0].property("osmid").unwrap(), 1);
    }

    #[test]
    fn test_closed_coastline_is_line() {
        let mut tags = HashMap::new();
        tags.insert("natural".to_string(), "coastline".to_string());
        assert!(!is_area(&tags));
        tags.insert("area".to_string(), "yes".to_string());
        assert!(is_area(&tags));
    }

    #[test]
    fn test_untagged_nodes_skipped() {
        let elements = parse(
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": 1.0, "lon": 2.0},
                {"type": "node", "id": 2, "lat": 1.0, "lon": 2.0, "tags": {"amenity": "bench"}}
            ]}"#,
        );
        let layer = to_features(&elements);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.features[0].property("element_type").unwrap(), "node");
    }

    #[test]
    fn test_multipolygon_relation() {
        let elements = parse(
            r#"{"elements": [{
                "type": "relation", "id": 9, "tags": {"type": "multipolygon", "natural": "water"},
                "members": [
                    {"type": "way", "ref": 1, "role": "outer", "geometry": [
                        {"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 4.0}, {"lat": 4.0, "lon": 4.0}
                    ]},
                    {"type": "way", "ref": 2, "role": "outer", "geometry": [
                        {"lat": 4.0, "lon": 4.0}, {"lat": 4.0, "lon": 0.0}, {"lat": 0.0, "lon": 0.0}
                    ]},
                    {"type": "way", "ref": 3, "role": "inner", "geometry": [
                        {"lat": 1.0, "lon": 1.0}, {"lat": 1.0, "lon": 2.0},
                        {"lat": 2.0, "lon": 2.0}, {"lat": 1.0, "lon": 1.0}
                    ]}
                ]
            }]}"#,
        );
        let layer = to_features(&elements);
        assert_eq!(layer.len(), 1);
        let Geometry::MultiPolygon(mp) = &layer.features[0].geometry else {
            panic!("expected multipolygon");
        };
        assert_eq!(mp.0[0].interiors().len(), 1);
    }

    #[test]
    fn test_route_relation_skipped() {
        let elements = parse(
            r#"{"elements": [{"type": "relation", "id": 9, "tags": {"type": "route"}, "members": []}]}"#,
        );
        assert!(to_features(&elements).is_empty());
    }

    #[test]
    fn test_ways_split_at_intersections() {
        // Way 10 runs 1-2-3, way 11 crosses it at node 2
        let elements = parse(
            r#"{"elements": [
                {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"highway": "primary"},
                 "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 1.0}, {"lat": 0.0, "lon": 2.0}]},
                {"type": "way", "id": 11, "nodes": [4, 2], "tags": {"highway": "residential"},
                 "geometry": [{"lat": 1.0, "lon": 1.0}, {"lat": 0.0, "lon": 1.0}]}
            ]}"#,
        );
        let edges = to_edges(&elements);
        assert_eq!(edges.len(), 3);

        let primary: Vec<_> = edges
            .iter()
            .filter(|f| f.property("osmid").unwrap() == 10)
            .collect();
        assert_eq!(primary.len(), 2);
        assert_eq!(primary[0].property("u").unwrap(), 1);
        assert_eq!(primary[0].property("v").unwrap(), 2);
        assert_eq!(primary[1].property("u").unwrap(), 2);
        assert_eq!(primary[1].property("v").unwrap(), 3);
    }

    #[test]
    fn test_remark_is_parsed() {
        let response: OverpassResponse =
            serde_json::from_str(r#"{"elements": [], "remark": "runtime error: timeout"}"#)
                .unwrap();
        assert!(response.remark.unwrap().contains("timeout"));
    }
}
