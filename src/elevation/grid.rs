//! Regular lon/lat elevation rasters.

use geo::{BoundingRect, Coord, Intersects, MultiPolygon, Point, Rect};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Elevation raster, row 0 at the north edge. Missing cells are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    pub ncols: usize,
    pub nrows: usize,
    /// Longitude of the west edge
    pub xllcorner: f64,
    /// Latitude of the south edge
    pub yllcorner: f64,
    /// Cell size, degrees
    pub cellsize: f64,
    pub values: Vec<f64>,
}

impl ElevationGrid {
    pub fn new(
        ncols: usize,
        nrows: usize,
        xllcorner: f64,
        yllcorner: f64,
        cellsize: f64,
        values: Vec<f64>,
    ) -> Result<Self> {
        if ncols == 0 || nrows == 0 {
            return Err(Error::Elevation("grid has no cells".to_string()));
        }
        if values.len() != ncols * nrows {
            return Err(Error::Elevation(format!(
                "expected {} values, found {}",
                ncols * nrows,
                values.len()
            )));
        }
        if !(cellsize > 0.0) {
            return Err(Error::Elevation(format!("invalid cellsize {cellsize}")));
        }
        Ok(Self {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
            values,
        })
    }

    /// Parse an ESRI ASCII grid (`.asc`)
    pub fn from_ascii(content: &str) -> Result<Self> {
        let mut tokens = content.split_whitespace().peekable();

        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut center = false;
        let mut cellsize = None;
        let mut nodata = None;

        while let Some(token) = tokens.peek() {
            if token.parse::<f64>().is_ok() {
                break;
            }
            let key = token.to_ascii_lowercase();
            tokens.next();
            let value = tokens
                .next()
                .ok_or_else(|| Error::Elevation(format!("missing value for '{key}'")))?;
            let number: f64 = value
                .parse()
                .map_err(|_| Error::Elevation(format!("bad value '{value}' for '{key}'")))?;

            match key.as_str() {
                "ncols" => ncols = Some(number as usize),
                "nrows" => nrows = Some(number as usize),
                "xllcorner" => xll = Some(number),
                "yllcorner" => yll = Some(number),
                "xllcenter" => {
                    xll = Some(number);
                    center = true;
                }
                "yllcenter" => {
                    yll = Some(number);
                    center = true;
                }
                "cellsize" => cellsize = Some(number),
                "nodata_value" => nodata = Some(number),
                _ => return Err(Error::Elevation(format!("unknown header '{key}'"))),
            }
        }

        let missing = |name: &str| Error::Elevation(format!("missing header '{name}'"));
        let ncols = ncols.ok_or_else(|| missing("ncols"))?;
        let nrows = nrows.ok_or_else(|| missing("nrows"))?;
        let cellsize = cellsize.ok_or_else(|| missing("cellsize"))?;
        let mut xll = xll.ok_or_else(|| missing("xllcorner"))?;
        let mut yll = yll.ok_or_else(|| missing("yllcorner"))?;
        if center {
            xll -= cellsize / 2.0;
            yll -= cellsize / 2.0;
        }

        let values = tokens
            .map(|t| {
                let v: f64 = t
                    .parse()
                    .map_err(|_| Error::Elevation(format!("bad cell value '{t}'")))?;
                Ok(match nodata {
                    Some(nd) if v == nd => f64::NAN,
                    _ => v,
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Self::new(ncols, nrows, xll, yll, cellsize, values)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.ncols + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.ncols + col] = value;
    }

    /// Lon/lat of a cell centre
    pub fn cell_center(&self, row: usize, col: usize) -> Coord<f64> {
        Coord {
            x: self.xllcorner + (col as f64 + 0.5) * self.cellsize,
            y: self.yllcorner + (self.nrows as f64 - row as f64 - 0.5) * self.cellsize,
        }
    }

    /// Finite values only
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied().filter(|v| v.is_finite())
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.valid_values().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Cell size in metres (east-west, north-south) at the grid's mid latitude
    pub fn cell_metres(&self) -> (f64, f64) {
        let mid_lat = self.yllcorner + self.nrows as f64 * self.cellsize / 2.0;
        let dy = self.cellsize * 111_320.0;
        let dx = dy * mid_lat.to_radians().cos();
        (dx, dy)
    }

    /// Sub-grid of rows `r0..r1` and columns `c0..c1`
    fn crop(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> Self {
        let mut values = Vec::with_capacity((r1 - r0) * (c1 - c0));
        for r in r0..r1 {
            values.extend_from_slice(&self.values[r * self.ncols + c0..r * self.ncols + c1]);
        }
        Self {
            ncols: c1 - c0,
            nrows: r1 - r0,
            xllcorner: self.xllcorner + c0 as f64 * self.cellsize,
            yllcorner: self.yllcorner + (self.nrows - r1) as f64 * self.cellsize,
            cellsize: self.cellsize,
            values,
        }
    }
}

/// Load an elevation grid from an ESRI ASCII file
pub fn get_elevation<P: AsRef<Path>>(path: P) -> Result<ElevationGrid> {
    let path = path.as_ref();
    info!("Loading elevation grid from {}", path.display());
    let content = fs::read_to_string(path)?;
    let grid = ElevationGrid::from_ascii(&content)?;
    debug!("Elevation grid is {}x{} cells", grid.ncols, grid.nrows);
    Ok(grid)
}

/// Crop a grid to the perimeter and blank out cells outside it.
///
/// Cells whose centre lies within `pad` cells (per axis) of the perimeter are
/// kept, so derived layers reach the perimeter edge.
pub fn mask_elevation(
    grid: &ElevationGrid,
    perimeter: &MultiPolygon<f64>,
    pad: usize,
) -> Result<ElevationGrid> {
    let rect = perimeter
        .bounding_rect()
        .ok_or_else(|| Error::Elevation("perimeter is empty".to_string()))?;

    let margin = pad as f64 * grid.cellsize;
    let top = grid.yllcorner + grid.nrows as f64 * grid.cellsize;

    let col_of = |x: f64| ((x - grid.xllcorner) / grid.cellsize).floor();
    let row_of = |y: f64| ((top - y) / grid.cellsize).floor();

    let c0 = col_of(rect.min().x - margin).max(0.0) as usize;
    let c1 = (col_of(rect.max().x + margin) + 1.0).clamp(0.0, grid.ncols as f64) as usize;
    let r0 = row_of(rect.max().y + margin).max(0.0) as usize;
    let r1 = (row_of(rect.min().y - margin) + 1.0).clamp(0.0, grid.nrows as f64) as usize;

    if c0 >= c1 || r0 >= r1 {
        return Err(Error::Elevation(
            "elevation grid does not cover the perimeter".to_string(),
        ));
    }

    let mut masked = grid.crop(r0, r1, c0, c1);
    for r in 0..masked.nrows {
        for c in 0..masked.ncols {
            let center = masked.cell_center(r, c);
            let keep = if pad == 0 {
                perimeter.intersects(&Point::from(center))
            } else {
                let reach = Coord {
                    x: margin,
                    y: margin,
                };
                perimeter.intersects(&Rect::new(center - reach, center + reach))
            };
            if !keep {
                masked.set(r, c, f64::NAN);
            }
        }
    }

    if masked.valid_values().next().is_none() {
        return Err(Error::Elevation(
            "no elevation data inside the perimeter".to_string(),
        ));
    }

    Ok(masked)
}
