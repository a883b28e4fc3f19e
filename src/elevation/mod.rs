//! Elevation-derived layers: shaded relief and level curves.

mod contours;
mod grid;
mod hillshade;

pub use contours::{contour_levels, get_level_curves};
pub use grid::{get_elevation, mask_elevation, ElevationGrid};
pub use hillshade::{get_hillshade, shade, SHADE_BANDS};

use crate::models::LayerConfig;

/// Rendering parameters shared by the elevation layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliefParams {
    pub vert_exag: f64,
    /// Light azimuth, degrees clockwise from north
    pub azdeg: f64,
    /// Light altitude above the horizon, degrees
    pub altdeg: f64,
    pub min_height: f64,
    pub max_height: Option<f64>,
    pub n_curves: usize,
}

impl Default for ReliefParams {
    fn default() -> Self {
        Self::from(&LayerConfig::default())
    }
}

impl From<&LayerConfig> for ReliefParams {
    fn from(config: &LayerConfig) -> Self {
        Self {
            vert_exag: config.vert_exag,
            azdeg: config.azdeg,
            altdeg: config.altdeg,
            min_height: config.min_height,
            max_height: config.max_height,
            n_curves: config.n_curves,
        }
    }
}
