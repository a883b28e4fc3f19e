//! Geometry collections returned for each layer.

use chrono::Utc;
use geo::{BoundingRect, Geometry, GeometryCollection, Rect};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single geometry with its OSM tags or derived attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    fn to_geojson(&self, layer: &str) -> geojson::Feature {
        let mut properties = self.properties.clone();
        properties.insert("layer".to_string(), Value::String(layer.to_string()));
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// A named thematic geometry collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoLayer {
    pub features: Vec<Feature>,
}

impl GeoLayer {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box of all features
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let collection: GeometryCollection<f64> = self
            .features
            .iter()
            .map(|f| f.geometry.clone())
            .collect();
        collection.bounding_rect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn to_geojson(&self, name: &str) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(|f| f.to_geojson(name)).collect(),
            foreign_members: None,
        }
    }
}

impl FromIterator<Feature> for GeoLayer {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Layer name → clipped geometry collection
#[derive(Debug, Clone, Default)]
pub struct Layers {
    layers: BTreeMap<String, GeoLayer>,
}

impl Layers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, layer: GeoLayer) {
        self.layers.insert(name.into(), layer);
    }

    pub fn get(&self, name: &str) -> Option<&GeoLayer> {
        self.layers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeoLayer)> {
        self.layers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// One FeatureCollection holding every layer, each feature tagged with `layer`
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let features = self
            .layers
            .iter()
            .flat_map(|(name, layer)| layer.features.iter().map(move |f| f.to_geojson(name)))
            .collect();

        let mut foreign = Map::new();
        foreign.insert(
            "fetched_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign),
        }
    }
}

impl IntoIterator for Layers {
    type Item = (String, GeoLayer);
    type IntoIter = std::collections::btree_map::IntoIter<String, GeoLayer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.into_iter()
    }
}
