//! Typed OpenStreetMap object references.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    /// Single-letter prefix used by Nominatim's `osm_ids` parameter
    pub fn prefix(self) -> char {
        match self {
            OsmType::Node => 'N',
            OsmType::Way => 'W',
            OsmType::Relation => 'R',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'N' => Some(OsmType::Node),
            'W' => Some(OsmType::Way),
            'R' => Some(OsmType::Relation),
            _ => None,
        }
    }
}

impl std::fmt::Display for OsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

/// An OSM object id such as `R123456`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsmRef {
    pub osm_type: OsmType,
    pub id: i64,
}

impl OsmRef {
    pub fn new(osm_type: OsmType, id: i64) -> Self {
        Self { osm_type, id }
    }
}

impl std::fmt::Display for OsmRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.osm_type.prefix(), self.id)
    }
}

impl FromStr for OsmRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let osm_type = chars
            .next()
            .and_then(OsmType::from_prefix)
            .ok_or_else(|| Error::InvalidOsmId(s.to_string()))?;

        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidOsmId(s.to_string()));
        }

        let id = digits
            .parse()
            .map_err(|_| Error::InvalidOsmId(s.to_string()))?;

        Ok(Self { osm_type, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relation() {
        let r: OsmRef = "R2192363".parse().unwrap();
        assert_eq!(r.osm_type, OsmType::Relation);
        assert_eq!(r.id, 2192363);
        assert_eq!(r.to_string(), "R2192363");
    }

    #[test]
    fn test_reject_unknown_prefix() {
        assert!(matches!(
            "X12".parse::<OsmRef>(),
            Err(Error::InvalidOsmId(_))
        ));
    }

    #[test]
    fn test_reject_trailing_garbage() {
        assert!("W12a".parse::<OsmRef>().is_err());
        assert!("N".parse::<OsmRef>().is_err());
    }
}
