//! OpenStreetMap data sources: Nominatim for geocoding, Overpass for features.

pub mod elements;
mod nominatim;
mod overpass;

use async_trait::async_trait;
use geo::{MultiPolygon, Point, Rect};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{GeoLayer, TagValue};

pub use nominatim::NominatimClient;
pub use overpass::{default_network_filter, tag_query, OverpassClient};

/// Resolves place names and OSM ids
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Point (lon/lat) for a place name
    async fn geocode(&self, query: &str) -> Result<Point<f64>>;

    /// Boundary polygon for a place name, or for an OSM id such as `R123` when
    /// `by_osmid` is set
    async fn geocode_to_polygon(&self, query: &str, by_osmid: bool) -> Result<MultiPolygon<f64>>;
}

/// Fetches OSM geometries inside a bounding box
#[async_trait]
pub trait OsmSource: Send + Sync {
    /// Nodes, ways and relations matching any of the tag selectors
    async fn features(
        &self,
        bbox: Rect<f64>,
        tags: &BTreeMap<String, TagValue>,
    ) -> Result<GeoLayer>;

    /// Ways matching an Overpass filter, split into edges at intersections
    async fn network(&self, bbox: Rect<f64>, custom_filter: &str) -> Result<GeoLayer>;
}
