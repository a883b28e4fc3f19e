//! Level curves by marching squares.

use geo::{Coord, LineString, MultiLineString};
use hashbrown::HashMap;
use tracing::debug;

use super::{ElevationGrid, ReliefParams};
use crate::models::{Feature, GeoLayer};

/// A grid edge between two neighbouring cell centres: `(row, col, vertical)`.
/// Horizontal edges join `(row, col)` and `(row, col + 1)`, vertical edges join
/// `(row, col)` and `(row + 1, col)`.
type EdgeKey = (usize, usize, bool);

/// Evenly spaced levels from `min_height` to `max_height` (or the grid maximum)
pub fn contour_levels(grid: &ElevationGrid, params: &ReliefParams) -> Vec<f64> {
    let Some((_, grid_max)) = grid.min_max() else {
        return Vec::new();
    };
    let lo = params.min_height;
    let hi = params.max_height.unwrap_or(grid_max);

    if params.n_curves == 0 || hi < lo {
        return Vec::new();
    }
    if params.n_curves == 1 {
        return vec![lo];
    }

    let step = (hi - lo) / (params.n_curves - 1) as f64;
    (0..params.n_curves).map(|i| lo + i as f64 * step).collect()
}

fn edge_point(grid: &ElevationGrid, (r, c, vertical): EdgeKey, level: f64) -> Coord<f64> {
    let (r2, c2) = if vertical { (r + 1, c) } else { (r, c + 1) };
    let (v1, v2) = (grid.get(r, c), grid.get(r2, c2));
    let (p1, p2) = (grid.cell_center(r, c), grid.cell_center(r2, c2));
    let t = if v2 != v1 { (level - v1) / (v2 - v1) } else { 0.5 };
    Coord {
        x: p1.x + t * (p2.x - p1.x),
        y: p1.y + t * (p2.y - p1.y),
    }
}

/// Segments of one level, as pairs of crossed edges
fn segments(grid: &ElevationGrid, level: f64) -> Vec<(EdgeKey, EdgeKey)> {
    let mut out = Vec::new();
    if grid.nrows < 2 || grid.ncols < 2 {
        return out;
    }

    for r in 0..grid.nrows - 1 {
        for c in 0..grid.ncols - 1 {
            let tl = grid.get(r, c);
            let tr = grid.get(r, c + 1);
            let br = grid.get(r + 1, c + 1);
            let bl = grid.get(r + 1, c);
            if ![tl, tr, br, bl].iter().all(|v| v.is_finite()) {
                continue;
            }

            let top = (r, c, false);
            let bottom = (r + 1, c, false);
            let left = (r, c, true);
            let right = (r, c + 1, true);

            let case = (tl >= level) as u8 * 8
                + (tr >= level) as u8 * 4
                + (br >= level) as u8 * 2
                + (bl >= level) as u8;

            match case {
                0 | 15 => {}
                1 | 14 => out.push((left, bottom)),
                2 | 13 => out.push((bottom, right)),
                3 | 12 => out.push((left, right)),
                4 | 11 => out.push((top, right)),
                6 | 9 => out.push((top, bottom)),
                7 | 8 => out.push((left, top)),
                5 | 10 => {
                    // Saddle: the cell average decides which diagonal is connected
                    let centre_high = (tl + tr + br + bl) / 4.0 >= level;
                    let tl_high = case == 10;
                    if centre_high == tl_high {
                        // High corners tl/br joined through the centre
                        out.push((top, right));
                        out.push((left, bottom));
                    } else {
                        out.push((left, top));
                        out.push((bottom, right));
                    }
                }
                _ => unreachable!("case index is four bits"),
            }
        }
    }

    out
}

/// Join segments sharing an edge into polylines
fn stitch(segments: &[(EdgeKey, EdgeKey)]) -> Vec<Vec<EdgeKey>> {
    let mut by_edge: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        by_edge.entry(*a).or_default().push(i);
        by_edge.entry(*b).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut lines = Vec::new();

    let mut walk = |from: EdgeKey, used: &mut Vec<bool>| -> Vec<EdgeKey> {
        let mut path = Vec::new();
        let mut current = from;
        while let Some(&next) = by_edge
            .get(&current)
            .and_then(|ids| ids.iter().find(|&&i| !used[i]))
        {
            used[next] = true;
            let (a, b) = segments[next];
            current = if a == current { b } else { a };
            path.push(current);
        }
        path
    };

    for i in 0..segments.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let (a, b) = segments[i];

        let forward = walk(b, &mut used);
        let backward = walk(a, &mut used);

        let mut line: Vec<EdgeKey> = backward.into_iter().rev().collect();
        line.push(a);
        line.push(b);
        line.extend(forward);
        lines.push(line);
    }

    lines
}

/// Contour lines for one level
pub fn level_curve(grid: &ElevationGrid, level: f64) -> MultiLineString<f64> {
    let lines = stitch(&segments(grid, level))
        .into_iter()
        .map(|keys| {
            keys.into_iter()
                .map(|key| edge_point(grid, key, level))
                .collect::<LineString<f64>>()
        })
        .collect();
    MultiLineString::new(lines)
}

/// Level curves as one feature per level, each with an `elevation` property
pub fn get_level_curves(grid: &ElevationGrid, params: &ReliefParams) -> GeoLayer {
    let levels = contour_levels(grid, params);
    let features: Vec<Feature> = levels
        .iter()
        .filter_map(|&level| {
            let curves = level_curve(grid, level);
            (!curves.0.is_empty())
                .then(|| Feature::new(curves).with_property("elevation", level))
        })
        .collect();

    debug!(
        "Level curves: {} of {} levels have contours",
        features.len(),
        levels.len()
    );
    GeoLayer::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Geometry;

    /// Single peak in the middle of a 5x5 grid
    fn peak() -> ElevationGrid {
        let values = (0..5)
            .flat_map(|r: i32| {
                (0..5).map(move |c: i32| 100.0 - 20.0 * ((r - 2).abs().max((c - 2).abs())) as f64)
            })
            .collect();
        ElevationGrid::new(5, 5, 0.0, 0.0, 1.0, values).unwrap()
    }

    #[test]
    fn test_levels_are_evenly_spaced() {
        let grid = peak();
        let params = ReliefParams {
            min_height: 60.0,
            max_height: Some(90.0),
            n_curves: 4,
            ..Default::default()
        };
        assert_eq!(contour_levels(&grid, &params), vec![60.0, 70.0, 80.0, 90.0]);
    }

    #[test]
    fn test_levels_default_to_grid_maximum() {
        let grid = peak();
        let params = ReliefParams {
            min_height: 80.0,
            max_height: None,
            n_curves: 3,
            ..Default::default()
        };
        assert_eq!(contour_levels(&grid, &params), vec![80.0, 90.0, 100.0]);
    }

    #[test]
    fn test_ring_around_peak_is_closed() {
        let grid = peak();
        let curves = level_curve(&grid, 90.0);
        assert_eq!(curves.0.len(), 1);
        let ring = &curves.0[0];
        assert_eq!(ring.0.first(), ring.0.last());
        // Crossings halfway between the 100 m summit and the 80 m ring
        for c in ring.coords() {
            let d = (c.x - 2.5).abs().max((c.y - 2.5).abs());
            assert!((d - 0.5).abs() < 1e-9, "vertex {:?}", c);
        }
    }

    #[test]
    fn test_open_line_across_slope() {
        // Plane rising west to east, contour runs north-south
        let values = (0..3)
            .flat_map(|_| (0..4).map(|c: usize| c as f64 * 10.0))
            .collect();
        let grid = ElevationGrid::new(4, 3, 0.0, 0.0, 1.0, values).unwrap();
        let curves = level_curve(&grid, 15.0);
        assert_eq!(curves.0.len(), 1);
        let line = &curves.0[0];
        assert_eq!(line.0.len(), 3);
        for c in line.coords() {
            assert!((c.x - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_nodata_cells_break_lines() {
        let mut grid = peak();
        grid.values[2 * 5 + 2] = f64::NAN;
        let curves = level_curve(&grid, 90.0);
        assert!(curves.0.is_empty());
    }

    #[test]
    fn test_layer_has_one_feature_per_level() {
        let grid = peak();
        let params = ReliefParams {
            min_height: 65.0,
            max_height: Some(95.0),
            n_curves: 4,
            ..Default::default()
        };
        let layer = get_level_curves(&grid, &params);
        assert_eq!(layer.len(), 4);
        for feature in layer.iter() {
            assert!(matches!(feature.geometry, Geometry::MultiLineString(_)));
            assert!(feature.property("elevation").unwrap().is_f64());
        }
    }
}
