//! WGS84 ↔ UTM projection, used whenever distances are expressed in metres.

use geo::{Centroid, Coord, MapCoords, Point};

const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A UTM zone (transverse Mercator on the WGS84 ellipsoid)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utm {
    pub zone: u8,
    pub south: bool,
}

impl Utm {
    /// Zone containing a lon/lat point
    pub fn for_point(point: Point<f64>) -> Self {
        let zone = (((point.x() + 180.0) / 6.0).floor() as i64).clamp(0, 59) as u8 + 1;
        Self {
            zone,
            south: point.y() < 0.0,
        }
    }

    /// Zone containing the centroid of a geometry, `None` for empty geometries
    pub fn for_geometry<G: Centroid<Output = Option<Point<f64>>>>(geometry: &G) -> Option<Self> {
        geometry.centroid().map(Self::for_point)
    }

    fn central_meridian(&self) -> f64 {
        (self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    fn false_northing(&self) -> f64 {
        if self.south {
            FALSE_NORTHING_SOUTH
        } else {
            0.0
        }
    }

    /// Project a lon/lat coordinate to easting/northing
    pub fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let e2 = F * (2.0 - F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = c.y.to_radians();
        let lambda = (c.x - self.central_meridian()).to_radians();

        let (sin_phi, cos_phi) = phi.sin_cos();
        let n = A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let cc = ep2 * cos_phi * cos_phi;
        let a = lambda * cos_phi;

        let m = A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let x = K0
            * n
            * (a + (1.0 - t + cc) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * cc - 58.0 * ep2) * a.powi(5) / 120.0)
            + FALSE_EASTING;

        let y = K0
            * (m + n
                * phi.tan()
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * cc + 4.0 * cc * cc) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * cc - 330.0 * ep2) * a.powi(6)
                        / 720.0))
            + self.false_northing();

        Coord { x, y }
    }

    /// Inverse of [`Utm::forward`]
    pub fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        let e2 = F * (2.0 - F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let x = c.x - FALSE_EASTING;
        let m = (c.y - self.false_northing()) / K0;
        let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let c1 = ep2 * cos1 * cos1;
        let t1 = phi1.tan().powi(2);
        let n1 = A / (1.0 - e2 * sin1 * sin1).sqrt();
        let r1 = A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = x / (n1 * K0);

        let phi = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lambda = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;

        Coord {
            x: self.central_meridian() + lambda.to_degrees(),
            y: phi.to_degrees(),
        }
    }

    pub fn project<G>(&self, geometry: &G) -> G
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.map_coords(|c| self.forward(c))
    }

    pub fn unproject<G>(&self, geometry: &G) -> G
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.map_coords(|c| self.inverse(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, polygon};

    #[test]
    fn test_zone_selection() {
        let utm = Utm::for_point(Point::new(2.17, 41.39));
        assert_eq!(utm.zone, 31);
        assert!(!utm.south);

        let utm = Utm::for_point(Point::new(-51.2, -30.0));
        assert_eq!(utm.zone, 22);
        assert!(utm.south);

        assert_eq!(Utm::for_point(Point::new(180.0, 0.0)).zone, 60);
    }

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let utm = Utm { zone: 31, south: false };
        let c = utm.forward(coord! { x: 3.0, y: 0.0 });
        assert!((c.x - 500_000.0).abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);
    }

    #[test]
    fn test_round_trip() {
        let utm = Utm::for_point(Point::new(2.17557, 41.39491));
        let original = coord! { x: 2.17557, y: 41.39491 };
        let back = utm.inverse(utm.forward(original));
        assert!((back.x - original.x).abs() < 1e-7);
        assert!((back.y - original.y).abs() < 1e-7);
    }

    #[test]
    fn test_round_trip_south() {
        let utm = Utm::for_point(Point::new(-51.2, -30.03));
        let original = coord! { x: -51.2, y: -30.03 };
        let back = utm.inverse(utm.forward(original));
        assert!((back.x - original.x).abs() < 1e-7);
        assert!((back.y - original.y).abs() < 1e-7);
    }

    #[test]
    fn test_distances_are_metric() {
        // One arc-minute of latitude is roughly 1852 m
        let utm = Utm { zone: 31, south: false };
        let a = utm.forward(coord! { x: 3.0, y: 45.0 });
        let b = utm.forward(coord! { x: 3.0, y: 45.0 + 1.0 / 60.0 });
        let d = (b.y - a.y) * (1.0 / K0);
        assert!((d - 1852.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn test_project_geometry() {
        let poly = polygon![
            (x: 2.0, y: 41.0),
            (x: 2.01, y: 41.0),
            (x: 2.01, y: 41.01),
            (x: 2.0, y: 41.01),
        ];
        let utm = Utm::for_geometry(&poly).unwrap();
        let back = utm.unproject(&utm.project(&poly));
        for (a, b) in poly.exterior().coords().zip(back.exterior().coords()) {
            assert!((a.x - b.x).abs() < 1e-7 && (a.y - b.y).abs() < 1e-7);
        }
    }
}
