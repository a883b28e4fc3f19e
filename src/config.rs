//! TOML configuration: service endpoints, perimeter options and layers.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::models::{LayerConfig, LayerKind, PerimeterConfig};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub global: GlobalConfig,
    pub perimeter: PerimeterConfig,
    pub layers: BTreeMap<String, LayerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GlobalConfig {
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    /// HTTP timeout, seconds
    pub timeout_secs: u64,
    /// Server-side Overpass timeout, seconds
    pub overpass_timeout: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org/".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            user_agent: concat!("perimap/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 300,
            overpass_timeout: 180,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.global.nominatim_url)?;
        Url::parse(&self.global.overpass_url)?;

        if let Some(radius) = self.perimeter.radius {
            if radius <= 0.0 {
                return Err(Error::Config(format!(
                    "perimeter radius must be positive, got {radius}"
                )));
            }
        }

        for (name, layer) in &self.layers {
            let kind = LayerKind::from_name(name);
            if kind == LayerKind::Perimeter {
                if layer.dilate.is_some() {
                    warn!("[layers.perimeter] dilate is ignored; set it under [perimeter]");
                }
                continue;
            }
            if !kind.is_elevation() {
                continue;
            }
            if layer.n_curves == 0 {
                return Err(Error::Config(format!("layer '{name}': n_curves must be at least 1")));
            }
            if let Some(max) = layer.max_height {
                if max < layer.min_height {
                    return Err(Error::Config(format!(
                        "layer '{name}': max_height {max} is below min_height {}",
                        layer.min_height
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tags;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(config.layers.is_empty());
        assert_eq!(config.global.overpass_timeout, 180);
        assert_eq!(config.perimeter.ratio, 1.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[global]
overpass_url = "http://localhost:12345/api/interpreter"

[perimeter]
radius = 1100.0
circle = true

[layers.streets]
custom_filter = '["highway"~"motorway|trunk|primary"]'
perimeter_tolerance = 5.0

[layers.building]
tags = {{ building = true }}

[layers.water]
tags = {{ natural = ["water", "bay"] }}
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.perimeter.radius, Some(1100.0));
        assert!(config.perimeter.circle);
        assert_eq!(config.layers.len(), 3);
        assert_eq!(
            config.layers["streets"].custom_filter.as_deref(),
            Some(r#"["highway"~"motorway|trunk|primary"]"#)
        );
        assert!(matches!(config.layers["building"].tags, Some(Tags::Map(_))));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = Config::from_toml("[global]\nnominatim_url = \"not a url\"\n");
        assert!(matches!(result, Err(Error::Url(_))));
    }

    #[test]
    fn test_perimeter_options_under_layers_rejected() {
        let result = Config::from_toml("[layers.perimeter]\ncircle = true\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_unknown_perimeter_key_rejected() {
        let result = Config::from_toml("[perimeter]\nradius = 500.0\ncircel = true\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_relief_options_only_checked_for_elevation_layers() {
        let config = Config::from_toml(
            "[layers.building]\ntags = \"building\"\nmin_height = 100.0\nmax_height = 50.0\n",
        )
        .unwrap();
        assert_eq!(config.layers.len(), 1);
    }

    #[test]
    fn test_inverted_heights_rejected() {
        let result = Config::from_toml(
            "[layers.level_curves]\nmin_height = 100.0\nmax_height = 50.0\n",
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
