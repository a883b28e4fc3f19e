//! Shaded relief from an elevation grid.

use geo::{Coord, MultiPolygon, Polygon, Rect};
use tracing::debug;

use super::{ElevationGrid, ReliefParams};
use crate::models::{Feature, GeoLayer};

/// Number of shade levels in the polygonized output
pub const SHADE_BANDS: usize = 8;

/// Illumination of each cell, normalised to 0..1 (NaN where there is no data).
///
/// Cells below `min_height` are dropped and values above `max_height` clamped
/// before the surface normals are computed.
pub fn shade(grid: &ElevationGrid, params: &ReliefParams) -> Vec<f64> {
    let (nrows, ncols) = (grid.nrows, grid.ncols);
    let z: Vec<f64> = grid
        .values
        .iter()
        .map(|&v| {
            if !v.is_finite() || v < params.min_height {
                f64::NAN
            } else {
                let v = params.max_height.map_or(v, |max| v.min(max));
                v * params.vert_exag
            }
        })
        .collect();
    let at = |r: usize, c: usize| z[r * ncols + c];

    let (dx, dy) = grid.cell_metres();

    let az = (90.0 - params.azdeg).to_radians();
    let alt = params.altdeg.to_radians();
    let light = [az.cos() * alt.cos(), az.sin() * alt.cos(), alt.sin()];

    let mut intensity = vec![f64::NAN; z.len()];
    for r in 0..nrows {
        for c in 0..ncols {
            let centre = at(r, c);
            if !centre.is_finite() {
                continue;
            }

            let west = (c > 0).then(|| at(r, c - 1)).filter(|v| v.is_finite());
            let east = (c + 1 < ncols).then(|| at(r, c + 1)).filter(|v| v.is_finite());
            let north = (r > 0).then(|| at(r - 1, c)).filter(|v| v.is_finite());
            let south = (r + 1 < nrows).then(|| at(r + 1, c)).filter(|v| v.is_finite());

            let dzdx = slope(west, centre, east, dx);
            let dzdy = slope(south, centre, north, dy);

            let norm = (dzdx * dzdx + dzdy * dzdy + 1.0).sqrt();
            let normal = [-dzdx / norm, -dzdy / norm, 1.0 / norm];
            intensity[r * ncols + c] =
                normal[0] * light[0] + normal[1] * light[1] + normal[2] * light[2];
        }
    }

    let (lo, hi) = intensity
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if hi - lo > 1e-12 {
        for v in intensity.iter_mut().filter(|v| v.is_finite()) {
            *v = (*v - lo) / (hi - lo);
        }
    } else {
        for v in intensity.iter_mut().filter(|v| v.is_finite()) {
            *v = v.clamp(0.0, 1.0);
        }
    }

    intensity
}

/// Central difference where both neighbours exist, one-sided otherwise
fn slope(before: Option<f64>, centre: f64, after: Option<f64>, step: f64) -> f64 {
    match (before, after) {
        (Some(b), Some(a)) => (a - b) / (2.0 * step),
        (None, Some(a)) => (a - centre) / step,
        (Some(b), None) => (centre - b) / step,
        (None, None) => 0.0,
    }
}

fn band_of(value: f64) -> usize {
    ((value * SHADE_BANDS as f64) as usize).min(SHADE_BANDS - 1)
}

/// Shaded relief as polygons, one feature per shade band.
///
/// Each feature carries `shade` (band midpoint, 0 = darkest) and `band`.
pub fn get_hillshade(grid: &ElevationGrid, params: &ReliefParams) -> GeoLayer {
    let shades = shade(grid, params);
    let mut bands: Vec<Vec<Polygon<f64>>> = vec![Vec::new(); SHADE_BANDS];

    let top = grid.yllcorner + grid.nrows as f64 * grid.cellsize;
    for r in 0..grid.nrows {
        let y_max = top - r as f64 * grid.cellsize;
        let y_min = y_max - grid.cellsize;

        // Runs of equal band along the row become one rectangle
        let mut c = 0;
        while c < grid.ncols {
            let v = shades[r * grid.ncols + c];
            if !v.is_finite() {
                c += 1;
                continue;
            }
            let band = band_of(v);
            let start = c;
            while c < grid.ncols {
                let next = shades[r * grid.ncols + c];
                if !next.is_finite() || band_of(next) != band {
                    break;
                }
                c += 1;
            }

            let x_min = grid.xllcorner + start as f64 * grid.cellsize;
            let x_max = grid.xllcorner + c as f64 * grid.cellsize;
            bands[band].push(
                Rect::new(Coord { x: x_min, y: y_min }, Coord { x: x_max, y: y_max }).to_polygon(),
            );
        }
    }

    let features: Vec<Feature> = bands
        .into_iter()
        .enumerate()
        .filter(|(_, polygons)| !polygons.is_empty())
        .map(|(band, polygons)| {
            let shade = (band as f64 + 0.5) / SHADE_BANDS as f64;
            Feature::new(MultiPolygon::new(polygons))
                .with_property("shade", shade)
                .with_property("band", band as u64)
        })
        .collect();

    debug!("Hillshade produced {} shade bands", features.len());
    GeoLayer::new(features)
}
