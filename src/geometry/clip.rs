//! Clipping fetched geometries against the perimeter.

use geo::{
    BooleanOps, BoundingRect, Geometry, GeometryCollection, Intersects, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Polygon, Rect,
};

use super::boundary::dilate;
use crate::models::{Feature, GeoLayer};

/// Perimeter buffered by `distance` metres and unioned into one region
pub fn perimeter_with_tolerance(perimeter: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    let region = if distance != 0.0 {
        dilate(perimeter, distance)
    } else {
        perimeter.clone()
    };
    unary_union(&region)
}

/// Merge overlapping parts of a region
pub fn unary_union(region: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    region
        .0
        .iter()
        .fold(MultiPolygon::new(vec![]), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon.clone()]))
        })
}

/// Bounding box of a region as a rectangle, `None` if the region is empty
pub fn bbox(region: &MultiPolygon<f64>) -> Option<Rect<f64>> {
    region.bounding_rect()
}

/// Bounding box of a region as a polygon
pub fn bbox_polygon(region: &MultiPolygon<f64>) -> Option<Polygon<f64>> {
    bbox(region).map(|rect| rect.to_polygon())
}

/// Intersect a geometry with the region, `None` if nothing is left
pub fn clip_geometry(geometry: &Geometry<f64>, region: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(p) => region.intersects(p).then(|| Geometry::Point(*p)),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<_> = mp.iter().filter(|p| region.intersects(*p)).copied().collect();
            simplify_points(kept)
        }
        Geometry::Line(line) => clip_lines(
            MultiLineString::new(vec![LineString::from(vec![line.start, line.end])]),
            region,
        ),
        Geometry::LineString(ls) => clip_lines(MultiLineString::new(vec![ls.clone()]), region),
        Geometry::MultiLineString(mls) => clip_lines(mls.clone(), region),
        Geometry::Polygon(p) => clip_polygons(&MultiPolygon::new(vec![p.clone()]), region),
        Geometry::MultiPolygon(mp) => clip_polygons(mp, region),
        Geometry::Rect(r) => clip_polygons(&MultiPolygon::new(vec![r.to_polygon()]), region),
        Geometry::Triangle(t) => clip_polygons(&MultiPolygon::new(vec![t.to_polygon()]), region),
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<Geometry<f64>> =
                gc.iter().filter_map(|g| clip_geometry(g, region)).collect();
            match parts.len() {
                0 => None,
                1 => parts.into_iter().next(),
                _ => Some(Geometry::GeometryCollection(GeometryCollection::from(parts))),
            }
        }
    }
}

/// Clip every feature of a layer, dropping those that end up empty
pub fn clip_layer(layer: GeoLayer, region: &MultiPolygon<f64>) -> GeoLayer {
    layer
        .features
        .into_iter()
        .filter_map(|feature| {
            let geometry = clip_geometry(&feature.geometry, region)?;
            Some(Feature {
                geometry,
                properties: feature.properties,
            })
        })
        .collect()
}

fn clip_lines(lines: MultiLineString<f64>, region: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    let mut clipped = region.clip(&lines, false);
    clipped.0.retain(|ls| ls.0.len() >= 2);
    match clipped.0.len() {
        0 => None,
        1 => clipped.0.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(clipped)),
    }
}

fn clip_polygons(polygons: &MultiPolygon<f64>, region: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    let mut clipped = region.intersection(polygons);
    clipped.0.retain(|p| p.exterior().0.len() >= 4);
    match clipped.0.len() {
        0 => None,
        1 => clipped.0.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(clipped)),
    }
}

fn simplify_points(points: Vec<geo::Point<f64>>) -> Option<Geometry<f64>> {
    match points.len() {
        0 => None,
        1 => Some(Geometry::Point(points[0])),
        _ => Some(Geometry::MultiPoint(MultiPoint::new(points))),
    }
}
