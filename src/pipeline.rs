//! Perimeter → per-layer fetch and clip → named layers.

use geo::MultiPolygon;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::GlobalConfig;
use crate::elevation::{
    get_elevation, get_hillshade, get_level_curves, mask_elevation, ReliefParams,
};
use crate::error::{Error, Result};
use crate::geometry::{self, bbox, clip_layer, perimeter_with_tolerance};
use crate::models::{
    Feature, GeoLayer, LayerConfig, LayerKind, Layers, PerimeterConfig, Query, TagValue, Tags,
};
use crate::osm::{default_network_filter, Geocoder, NominatimClient, OsmSource, OverpassClient};

/// Name of the layer holding the perimeter itself
pub const PERIMETER_LAYER: &str = "perimeter";

/// Fetches layers from a geocoder and an OSM source
pub struct Fetcher<G, S> {
    geocoder: G,
    source: S,
}

impl Fetcher<NominatimClient, OverpassClient> {
    /// Fetcher backed by the configured Nominatim and Overpass endpoints
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        Ok(Self::new(
            NominatimClient::new(config)?,
            OverpassClient::new(config)?,
        ))
    }
}

impl<G: Geocoder, S: OsmSource> Fetcher<G, S> {
    pub fn new(geocoder: G, source: S) -> Self {
        Self { geocoder, source }
    }

    pub async fn get_perimeter(
        &self,
        query: &Query,
        options: &PerimeterConfig,
    ) -> Result<MultiPolygon<f64>> {
        geometry::get_perimeter(query, options, &self.geocoder).await
    }

    /// Fetch one layer and clip it to the perimeter grown by the layer's
    /// `dilate` + `perimeter_tolerance`.
    pub async fn get_layer(
        &self,
        name: &str,
        perimeter: &MultiPolygon<f64>,
        config: &LayerConfig,
    ) -> Result<GeoLayer> {
        let kind = LayerKind::from_name(name);
        let region = perimeter_with_tolerance(perimeter, config.clip_distance());
        let bbox = bbox(&region).ok_or(Error::EmptyPerimeter)?;

        let layer = match kind {
            LayerKind::Perimeter => perimeter_layer(perimeter),
            LayerKind::Hillshade | LayerKind::LevelCurves => {
                let path = config
                    .elevation
                    .as_ref()
                    .ok_or_else(|| Error::MissingElevation(name.to_string()))?;
                let grid = mask_elevation(&get_elevation(path)?, perimeter, config.pad)?;
                let params = ReliefParams::from(config);
                if kind == LayerKind::Hillshade {
                    get_hillshade(&grid, &params)
                } else {
                    get_level_curves(&grid, &params)
                }
            }
            LayerKind::Network => {
                let filter = config
                    .custom_filter
                    .as_deref()
                    .unwrap_or_else(|| default_network_filter(name));
                self.source.network(bbox, filter).await?
            }
            LayerKind::Coastline => {
                let tags = match &config.tags {
                    Some(tags) => tags.to_map(),
                    None => BTreeMap::from([(
                        "natural".to_string(),
                        TagValue::One("coastline".to_string()),
                    )]),
                };
                self.source.features(bbox, &tags).await?
            }
            LayerKind::Features => match (&config.osmid, &config.tags) {
                (Some(osmid), _) => {
                    let object = self.geocoder.geocode_to_polygon(osmid, true).await?;
                    GeoLayer::new(vec![Feature::new(object).with_property("osmid", osmid.as_str())])
                }
                (None, Some(tags)) => self.source.features(bbox, &tags.to_map()).await?,
                (None, None) => {
                    return Err(Error::Config(format!(
                        "layer '{name}' needs `tags`, `osmid` or a known layer name"
                    )))
                }
            },
        };

        let fetched = layer.len();
        let clipped = clip_layer(layer, &region);
        debug!(
            "Layer '{}': kept {} of {} features after clipping",
            name,
            clipped.len(),
            fetched
        );
        Ok(clipped)
    }

    /// Compute the perimeter and fetch every layer in turn
    pub async fn get_layers(
        &self,
        query: &Query,
        options: &PerimeterConfig,
        layers: &BTreeMap<String, LayerConfig>,
    ) -> Result<Layers> {
        self.get_layers_with_progress(query, options, layers, |_| {})
            .await
    }

    /// As [`Fetcher::get_layers`], calling `on_layer` after each layer is done
    pub async fn get_layers_with_progress<F>(
        &self,
        query: &Query,
        options: &PerimeterConfig,
        layers: &BTreeMap<String, LayerConfig>,
        mut on_layer: F,
    ) -> Result<Layers>
    where
        F: FnMut(&str),
    {
        let perimeter = self.get_perimeter(query, options).await?;
        info!("Perimeter has {} polygon(s)", perimeter.0.len());

        let mut result = Layers::new();
        result.insert(PERIMETER_LAYER, perimeter_layer(&perimeter));

        for (name, config) in layers {
            if name == PERIMETER_LAYER {
                continue;
            }
            info!("Fetching layer '{}'", name);
            let layer = self.get_layer(name, &perimeter, config).await?;
            info!("Layer '{}': {} features", name, layer.len());
            result.insert(name.clone(), layer);
            on_layer(name);
        }

        Ok(result)
    }
}

fn perimeter_layer(perimeter: &MultiPolygon<f64>) -> GeoLayer {
    GeoLayer::new(vec![Feature::new(perimeter.clone())])
}

/// A small default layer set: streets, buildings and water
pub fn default_layers() -> BTreeMap<String, LayerConfig> {
    BTreeMap::from([
        ("streets".to_string(), LayerConfig::default()),
        (
            "building".to_string(),
            LayerConfig::with_tags(Tags::Key("building".to_string())),
        ),
        (
            "water".to_string(),
            LayerConfig::with_tags(Tags::Map(BTreeMap::from([(
                "natural".to_string(),
                TagValue::Many(vec!["water".to_string(), "bay".to_string()]),
            )]))),
        ),
    ])
}
