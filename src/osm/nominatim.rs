//! Nominatim geocoder client.

use async_trait::async_trait;
use geo::{Geometry, MultiPolygon, Point};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::Geocoder;
use crate::config::GlobalConfig;
use crate::error::{Error, Result};
use crate::models::OsmRef;

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    geojson: Option<geojson::Geometry>,
}

/// Polygon or MultiPolygon geometry of a result, if it has one
fn place_polygon(place: &Place) -> Option<MultiPolygon<f64>> {
    let geometry = Geometry::<f64>::try_from(place.geojson.clone()?).ok()?;
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    }
}

pub struct NominatimClient {
    client: Client,
    base: Url,
}

impl NominatimClient {
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut base = Url::parse(&config.nominatim_url)?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base.join(path)?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .extend_pairs(params);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Vec<Place>> {
        debug!("Nominatim request: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Nominatim request failed with status {}", status);
            return Err(Error::Service {
                service: "Nominatim",
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Point<f64>> {
        let url = self.endpoint("search", &[("q", query), ("limit", "1")])?;
        let places = self.get(url).await?;

        let place = places
            .first()
            .ok_or_else(|| Error::Geocode(query.to_string()))?;

        let lat: f64 = place
            .lat
            .parse()
            .map_err(|_| Error::Geocode(query.to_string()))?;
        let lon: f64 = place
            .lon
            .parse()
            .map_err(|_| Error::Geocode(query.to_string()))?;

        info!("Geocoded '{}' to ({}, {})", query, lat, lon);
        Ok(Point::new(lon, lat))
    }

    async fn geocode_to_polygon(&self, query: &str, by_osmid: bool) -> Result<MultiPolygon<f64>> {
        let url = if by_osmid {
            let osm_ref: OsmRef = query.parse()?;
            let id = osm_ref.to_string();
            self.endpoint("lookup", &[("osm_ids", id.as_str()), ("polygon_geojson", "1")])?
        } else {
            self.endpoint(
                "search",
                &[("q", query), ("polygon_geojson", "1"), ("limit", "50")],
            )?
        };

        let places = self.get(url).await?;

        // Point results (e.g. a node for a city centre) are skipped in favour of the
        // first result that has an area
        let (place, polygon) = places
            .iter()
            .find_map(|p| place_polygon(p).map(|mp| (p, mp)))
            .ok_or_else(|| Error::Geocode(query.to_string()))?;

        info!("Resolved '{}' to the boundary of {}", query, place.display_name);
        Ok(polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> NominatimClient {
        NominatimClient::new(&GlobalConfig::default()).unwrap()
    }

    #[test]
    fn test_search_url() {
        let url = client()
            .endpoint("search", &[("q", "Porto Alegre, Brazil"), ("limit", "1")])
            .unwrap();
        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("format".into(), "json".into())));
        assert!(pairs.contains(&("q".into(), "Porto Alegre, Brazil".into())));
    }

    #[test]
    fn test_base_path_kept() {
        let config = GlobalConfig {
            nominatim_url: "http://localhost:8080/nominatim".to_string(),
            ..Default::default()
        };
        let client = NominatimClient::new(&config).unwrap();
        let url = client.endpoint("lookup", &[]).unwrap();
        assert_eq!(url.path(), "/nominatim/lookup");
    }

    #[test]
    fn test_point_results_have_no_polygon() {
        let places: Vec<Place> = serde_json::from_str(
            r#"[
                {"lat": "1.0", "lon": "2.0", "display_name": "a node",
                 "geojson": {"type": "Point", "coordinates": [2.0, 1.0]}},
                {"lat": "1.0", "lon": "2.0", "display_name": "an area",
                 "geojson": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
            ]"#,
        )
        .unwrap();
        assert!(place_polygon(&places[0]).is_none());
        assert_eq!(place_polygon(&places[1]).unwrap().0.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_osm_id_rejected_before_request() {
        let result = client().geocode_to_polygon("Q123", true).await;
        assert!(matches!(result, Err(Error::InvalidOsmId(_))));
    }
}
