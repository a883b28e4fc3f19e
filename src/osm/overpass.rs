//! Overpass API client.

use async_trait::async_trait;
use geo::Rect;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::elements::{to_edges, to_features, OverpassResponse};
use super::OsmSource;
use crate::config::GlobalConfig;
use crate::error::{Error, Result};
use crate::models::{GeoLayer, TagValue};

/// Filter used for network layers when the config gives none
pub fn default_network_filter(layer: &str) -> &'static str {
    match layer {
        "railway" => r#"["railway"]"#,
        "waterway" => r#"["waterway"]"#,
        _ => r#"["highway"]["area"!~"yes"]"#,
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn bbox_clause(bbox: &Rect<f64>) -> String {
    // Overpass wants (south, west, north, east)
    format!(
        "({},{},{},{})",
        bbox.min().y,
        bbox.min().x,
        bbox.max().y,
        bbox.max().x
    )
}

fn tag_selector(key: &str, value: &TagValue) -> Option<String> {
    let key = escape(key);
    match value {
        TagValue::Any(true) => Some(format!(r#"["{key}"]"#)),
        TagValue::Any(false) => None,
        TagValue::One(v) => Some(format!(r#"["{key}"="{}"]"#, escape(v))),
        TagValue::Many(values) if values.is_empty() => None,
        TagValue::Many(values) => {
            let alternatives = values
                .iter()
                .map(|v| escape(&regex::escape(v)))
                .collect::<Vec<_>>()
                .join("|");
            Some(format!(r#"["{key}"~"^({alternatives})$"]"#))
        }
    }
}

/// Overpass QL for nodes, ways and relations matching any of the tags
pub fn tag_query(bbox: &Rect<f64>, tags: &BTreeMap<String, TagValue>, timeout: u64) -> String {
    let area = bbox_clause(bbox);
    let mut clauses = String::new();
    for (key, value) in tags {
        if let Some(selector) = tag_selector(key, value) {
            for kind in ["node", "way", "relation"] {
                clauses.push_str(&format!("{kind}{selector}{area};"));
            }
        }
    }
    format!("[out:json][timeout:{timeout}];({clauses});out body geom;")
}

fn network_query(bbox: &Rect<f64>, custom_filter: &str, timeout: u64) -> String {
    format!(
        "[out:json][timeout:{timeout}];(way{custom_filter}{};);out body geom;",
        bbox_clause(bbox)
    )
}

/// Fetches OSM elements from an Overpass interpreter endpoint
pub struct OverpassClient {
    client: Client,
    endpoint: Url,
    timeout: u64,
}

impl OverpassClient {
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(&config.overpass_url)?,
            timeout: config.overpass_timeout,
        })
    }

    async fn run(&self, query: String) -> Result<OverpassResponse> {
        debug!("Overpass query: {}", query);

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("data", &query)
            .finish();

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Overpass query failed with status {}", status);
            return Err(Error::Service {
                service: "Overpass",
                status,
                body,
            });
        }

        let data: OverpassResponse = response.json().await?;
        if let Some(remark) = &data.remark {
            warn!("Overpass remark: {}", remark);
        }
        info!("Overpass returned {} elements", data.elements.len());

        Ok(data)
    }
}

#[async_trait]
impl OsmSource for OverpassClient {
    async fn features(
        &self,
        bbox: Rect<f64>,
        tags: &BTreeMap<String, TagValue>,
    ) -> Result<GeoLayer> {
        if tags.values().all(|v| tag_selector("", v).is_none()) {
            return Ok(GeoLayer::default());
        }
        let data = self.run(tag_query(&bbox, tags, self.timeout)).await?;
        Ok(to_features(&data.elements))
    }

    async fn network(&self, bbox: Rect<f64>, custom_filter: &str) -> Result<GeoLayer> {
        let data = self
            .run(network_query(&bbox, custom_filter, self.timeout))
            .await?;
        Ok(to_edges(&data.elements))
    }
}
