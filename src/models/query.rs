//! What the caller asks for: a point, a place name, an OSM object or a region.

use geo::{MultiPolygon, Point};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

use super::OsmRef;
use crate::error::{Error, Result};

static OSM_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[NWR][0-9]+$").expect("static regex"));

/// Classification of a [`Query`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Coordinates,
    Address,
    OsmId,
    Polygon,
}

/// Input to perimeter computation
#[derive(Debug, Clone)]
pub enum Query {
    /// Geographic point (lat/lon)
    Coordinates { lat: f64, lon: f64 },
    /// Free-form place name, resolved through the geocoder
    Address(String),
    /// OSM id string such as `R123456`
    OsmId(String),
    /// Region supplied by the caller, EPSG:4326
    Polygon(MultiPolygon<f64>),
}

impl Query {
    /// Build a text query. Only a complete id such as `R123` is an OSM id;
    /// postcodes and road numbers (`E1 6AN`, `M25`) stay addresses.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if OSM_ID_PATTERN.is_match(s.trim()) {
            Query::OsmId(s)
        } else {
            Query::Address(s)
        }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            Query::Coordinates { .. } => QueryKind::Coordinates,
            Query::Address(_) => QueryKind::Address,
            Query::OsmId(_) => QueryKind::OsmId,
            Query::Polygon(_) => QueryKind::Polygon,
        }
    }

    /// Point for coordinate queries, `None` otherwise
    pub fn point(&self) -> Option<Point<f64>> {
        match self {
            Query::Coordinates { lat, lon } => Some(Point::new(*lon, *lat)),
            _ => None,
        }
    }

    /// Typed OSM reference for OSM-id queries
    pub fn osm_ref(&self) -> Result<Option<OsmRef>> {
        match self {
            Query::OsmId(s) => s.parse().map(Some),
            _ => Ok(None),
        }
    }

    /// Text sent to the geocoder
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Query::Address(s) | Query::OsmId(s) => Some(s),
            _ => None,
        }
    }
}

impl From<(f64, f64)> for Query {
    /// `(lat, lon)` pair
    fn from((lat, lon): (f64, f64)) -> Self {
        Query::Coordinates { lat, lon }
    }
}

impl From<MultiPolygon<f64>> for Query {
    fn from(region: MultiPolygon<f64>) -> Self {
        Query::Polygon(region)
    }
}

impl FromStr for Query {
    type Err = Error;

    /// Parse command-line text: `"lat,lon"` or a place name / OSM id
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Geocode(String::new()));
        }

        if let Some((a, b)) = s.split_once(',') {
            if let (Ok(lat), Ok(lon)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
                    return Ok(Query::Coordinates { lat, lon });
                }
            }
        }

        Ok(Query::text(s))
    }
}

/// Classify a query
pub fn parse_query(query: &Query) -> QueryKind {
    query.kind()
}
