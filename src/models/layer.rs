//! Per-layer fetch options and the layer classification derived from names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Tag value selector: `true` matches any value of the key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Any(bool),
    One(String),
    Many(Vec<String>),
}

/// Tag filter, either a bare key or a key → selector map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    Key(String),
    Map(BTreeMap<String, TagValue>),
}

impl Tags {
    /// Normalize to a key → selector map (`"building"` becomes `{building: true}`)
    pub fn to_map(&self) -> BTreeMap<String, TagValue> {
        match self {
            Tags::Key(key) => BTreeMap::from([(key.clone(), TagValue::Any(true))]),
            Tags::Map(map) => map.clone(),
        }
    }
}

/// How a layer is fetched, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Perimeter,
    Hillshade,
    LevelCurves,
    /// Way network (streets, railway, waterway)
    Network,
    Coastline,
    /// Generic tag query, or a single OSM object when `osmid` is set
    Features,
}

impl LayerKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "perimeter" => LayerKind::Perimeter,
            "hillshade" => LayerKind::Hillshade,
            "level_curves" => LayerKind::LevelCurves,
            "streets" | "railway" | "waterway" => LayerKind::Network,
            "coastline" => LayerKind::Coastline,
            _ => LayerKind::Features,
        }
    }

    pub fn is_elevation(self) -> bool {
        matches!(self, LayerKind::Hillshade | LayerKind::LevelCurves)
    }
}

/// Options recognized for a layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerConfig {
    /// Extra buffer around the perimeter, metres
    pub dilate: Option<f64>,
    /// Added to `dilate` when building the clip region, metres
    pub perimeter_tolerance: f64,
    pub tags: Option<Tags>,
    /// Fetch this single OSM object instead of running a tag query
    pub osmid: Option<String>,
    /// Overpass way filter, e.g. `["highway"~"primary|secondary"]`
    pub custom_filter: Option<String>,
    /// Path to an ESRI ASCII elevation grid
    pub elevation: Option<PathBuf>,
    pub vert_exag: f64,
    pub azdeg: f64,
    pub altdeg: f64,
    /// Cells kept around the perimeter when masking elevation
    pub pad: usize,
    pub min_height: f64,
    pub max_height: Option<f64>,
    pub n_curves: usize,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            dilate: None,
            perimeter_tolerance: 0.0,
            tags: None,
            osmid: None,
            custom_filter: None,
            elevation: None,
            vert_exag: 1.0,
            azdeg: 90.0,
            altdeg: 80.0,
            pad: 1,
            min_height: 30.0,
            max_height: None,
            n_curves: 100,
        }
    }
}

impl LayerConfig {
    pub fn with_tags(tags: Tags) -> Self {
        Self {
            tags: Some(tags),
            ..Default::default()
        }
    }

    /// Buffer distance for the clip region
    pub fn clip_distance(&self) -> f64 {
        self.dilate.unwrap_or(0.0) + self.perimeter_tolerance
    }
}

/// Options for computing the perimeter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerimeterConfig {
    /// Build a circle/rectangle of this radius (metres) around the query point
    pub radius: Option<f64>,
    /// Rectangle width / height
    pub ratio: f64,
    pub circle: bool,
    pub dilate: Option<f64>,
    /// Rectangle rotation, degrees counter-clockwise
    pub rotation: f64,
    /// Resolve text queries as OSM ids
    pub by_osmid: bool,
}

impl Default for PerimeterConfig {
    fn default() -> Self {
        Self {
            radius: None,
            ratio: 1.0,
            circle: false,
            dilate: None,
            rotation: 0.0,
            by_osmid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_kind_from_name() {
        assert_eq!(LayerKind::from_name("streets"), LayerKind::Network);
        assert_eq!(LayerKind::from_name("waterway"), LayerKind::Network);
        assert_eq!(LayerKind::from_name("building"), LayerKind::Features);
        assert_eq!(LayerKind::from_name("coastline"), LayerKind::Coastline);
        assert!(LayerKind::from_name("level_curves").is_elevation());
        assert!(!LayerKind::from_name("water").is_elevation());
    }

    #[test]
    fn test_bare_key_tags() {
        let tags = Tags::Key("building".to_string());
        let map = tags.to_map();
        assert_eq!(map.get("building"), Some(&TagValue::Any(true)));
    }

    #[test]
    fn test_layer_config_from_toml() {
        let config: LayerConfig = toml::from_str(
            r#"
            perimeter_tolerance = 2.0
            dilate = 100.0
            tags = { natural = ["water", "bay"], place = "sea" }
            "#,
        )
        .unwrap();
        assert_eq!(config.clip_distance(), 102.0);
        assert_eq!(config.n_curves, 100);
        let map = config.tags.unwrap().to_map();
        assert_eq!(
            map.get("natural"),
            Some(&TagValue::Many(vec!["water".into(), "bay".into()]))
        );
        assert_eq!(map.get("place"), Some(&TagValue::One("sea".into())));
    }

    #[test]
    fn test_perimeter_options_rejected_in_layer() {
        let result: Result<LayerConfig, _> = toml::from_str("circle = true\nradius = 500.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_dilate_is_zero() {
        assert_eq!(LayerConfig::default().clip_distance(), 0.0);
    }
}
