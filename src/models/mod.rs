//! Core data models: queries, layer options and fetched features.

pub mod feature;
pub mod layer;
pub mod osm;
pub mod query;

pub use feature::{Feature, GeoLayer, Layers};
pub use layer::{LayerConfig, LayerKind, PerimeterConfig, TagValue, Tags};
pub use osm::{OsmRef, OsmType};
pub use query::{parse_query, Query, QueryKind};
