//! Perimeter construction and clipping.
//!
//! Distances are given in metres; geometries are projected to the local UTM
//! zone for buffering and returned in lon/lat.

pub mod boundary;
pub mod clip;
mod projection;
pub mod rings;

pub use boundary::{dilate, get_boundary, get_perimeter};
pub use clip::{bbox, bbox_polygon, clip_geometry, clip_layer, perimeter_with_tolerance};
pub use projection::Utm;
