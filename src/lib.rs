//! Perimap - fetch OpenStreetMap layers clipped to a perimeter
//!
//! A query (coordinates, place name, OSM id or polygon) is turned into a
//! perimeter, and each configured layer is fetched from Nominatim, Overpass
//! or a local elevation grid and clipped to it.

pub mod config;
pub mod elevation;
pub mod error;
pub mod geometry;
pub mod models;
pub mod osm;
pub mod pipeline;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{GeoLayer, Layers, Query};
pub use pipeline::Fetcher;
