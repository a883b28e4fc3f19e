//! Perimeter construction: circles and rectangles around a point, or a
//! geocoded region, optionally dilated.

use geo::{Area, Buffer, Coord, LineString, MultiPolygon, Point, Polygon, Rotate};
use tracing::{debug, info};

use super::Utm;
use crate::error::{Error, Result};
use crate::models::{OsmRef, PerimeterConfig, Query};
use crate::osm::Geocoder;

/// Circle or rectangle of `radius` metres around a lon/lat point.
///
/// The rectangle has half-width `radius * ratio` and half-height `radius`, and
/// is rotated `rotation` degrees counter-clockwise about its centre.
pub fn get_boundary(
    point: Point<f64>,
    radius: f64,
    ratio: f64,
    circle: bool,
    rotation: f64,
) -> MultiPolygon<f64> {
    let utm = Utm::for_point(point);
    let center = Point::from(utm.forward(point.0));

    let projected = if circle {
        center.buffer(radius)
    } else {
        let (x, y) = (center.x(), center.y());
        let dx = radius * ratio;
        let dy = radius;
        let rect = Polygon::new(
            LineString::from(vec![
                Coord { x: x - dx, y: y - dy },
                Coord { x: x + dx, y: y - dy },
                Coord { x: x + dx, y: y + dy },
                Coord { x: x - dx, y: y + dy },
                Coord { x: x - dx, y: y - dy },
            ]),
            vec![],
        );
        MultiPolygon::new(vec![rect.rotate_around_point(rotation, center)])
    };

    utm.unproject(&projected)
}

/// Buffer a lon/lat region by `distance` metres
pub fn dilate(region: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    let Some(utm) = Utm::for_geometry(region) else {
        return region.clone();
    };
    let buffered = utm.project(region).buffer(distance);
    utm.unproject(&buffered)
}

/// Compute the perimeter for a query.
///
/// With a radius the perimeter is a circle or rectangle around the query point
/// (geocoded unless the query is a coordinate pair). Without one it is the
/// caller's polygon, or the OSM polygon the geocoder returns for the query.
pub async fn get_perimeter<G>(
    query: &Query,
    options: &PerimeterConfig,
    geocoder: &G,
) -> Result<MultiPolygon<f64>>
where
    G: Geocoder + ?Sized,
{
    let perimeter = match (options.radius, query) {
        (Some(radius), _) => {
            let point = match query.point() {
                Some(p) => p,
                None => geocode_point(query, geocoder).await?,
            };
            debug!(
                "Building {} boundary of {} m around ({}, {})",
                if options.circle { "circular" } else { "rectangular" },
                radius,
                point.y(),
                point.x()
            );
            get_boundary(
                point,
                radius,
                options.ratio,
                options.circle,
                options.rotation,
            )
        }
        (None, Query::Polygon(region)) => region.clone(),
        (None, Query::Coordinates { lat, lon }) => {
            return Err(Error::Geocode(format!(
                "{lat},{lon} (a coordinate query needs a radius)"
            )))
        }
        (None, _) => {
            let text = query.as_text().unwrap_or_default();
            let by_osmid = options.by_osmid || query.osm_ref()?.is_some();
            if by_osmid {
                text.parse::<OsmRef>()?;
            }
            info!("Fetching perimeter polygon for '{}'", text);
            geocoder.geocode_to_polygon(text, by_osmid).await?
        }
    };

    let perimeter = match options.dilate {
        Some(distance) if distance != 0.0 => dilate(&perimeter, distance),
        _ => perimeter,
    };

    if perimeter.0.is_empty() || perimeter.unsigned_area() <= 0.0 {
        return Err(Error::EmptyPerimeter);
    }

    Ok(perimeter)
}

async fn geocode_point<G>(query: &Query, geocoder: &G) -> Result<Point<f64>>
where
    G: Geocoder + ?Sized,
{
    match query {
        Query::Polygon(region) => {
            use geo::Centroid;
            region.centroid().ok_or(Error::EmptyPerimeter)
        }
        _ => {
            let text = query.as_text().unwrap_or_default();
            geocoder.geocode(text).await
        }
    }
}
