//! Assembles polygons from the unordered way fragments of multipolygon relations.

use geo::{Contains, Coord, LineString, MultiPolygon, Polygon};

/// Join fragments end-to-end into closed rings.
///
/// Fragments that cannot be closed into a ring of at least four coordinates are
/// dropped.
pub fn merge_rings(fragments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut result = Vec::new();
    let mut remaining: Vec<Vec<Coord<f64>>> = fragments
        .into_iter()
        .filter(|f| f.len() >= 2)
        .collect();

    while !remaining.is_empty() {
        let mut current = remaining.remove(0);

        // Keep joining until the ring closes or nothing else connects
        while current.first() != current.last() {
            let start = current[0];
            let end = current[current.len() - 1];

            let Some(i) = remaining.iter().position(|f| {
                let (s, e) = (f[0], f[f.len() - 1]);
                s == end || e == end || s == start || e == start
            }) else {
                break;
            };

            let mut fragment = remaining.remove(i);
            let (s, e) = (fragment[0], fragment[fragment.len() - 1]);

            if s == end {
                fragment.remove(0);
                current.extend(fragment);
            } else if e == end {
                fragment.reverse();
                fragment.remove(0);
                current.extend(fragment);
            } else if e == start {
                fragment.pop();
                fragment.extend(current);
                current = fragment;
            } else {
                fragment.reverse();
                fragment.pop();
                fragment.extend(current);
                current = fragment;
            }
        }

        if current.first() != current.last() {
            continue;
        }
        if current.len() >= 4 {
            result.push(LineString::new(current));
        }
    }

    result
}

/// Build polygons from outer and inner fragments.
///
/// Each inner ring becomes a hole of the first outer ring containing it; inner
/// rings outside every outer ring are ignored.
pub fn assemble_multipolygon(
    outer: Vec<Vec<Coord<f64>>>,
    inner: Vec<Vec<Coord<f64>>>,
) -> Option<MultiPolygon<f64>> {
    let outers = merge_rings(outer);
    if outers.is_empty() {
        return None;
    }

    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); outers.len()];
    let shells: Vec<Polygon<f64>> = outers
        .iter()
        .map(|ring| Polygon::new(ring.clone(), vec![]))
        .collect();

    for ring in merge_rings(inner) {
        let hole = Polygon::new(ring.clone(), vec![]);
        if let Some(i) = shells.iter().position(|shell| shell.contains(&hole)) {
            holes[i].push(ring);
        }
    }

    let polygons = outers
        .into_iter()
        .zip(holes)
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
        .collect();

    Some(MultiPolygon::new(polygons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Coord};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn test_closed_ring_passes_through() {
        let ring = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        assert_eq!(merge_rings(vec![ring]).len(), 1);
    }

    #[test]
    fn test_split_ring_merges() {
        let s1 = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)];
        let s2 = vec![c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        assert_eq!(merge_rings(vec![s2, s1]).len(), 1);
    }

    #[test]
    fn test_reversed_fragment_merges() {
        let s1 = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)];
        // Same second half, drawn in the opposite direction
        let s2 = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0)];
        let rings = merge_rings(vec![s1, s2]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].0.len(), 5);
    }

    #[test]
    fn test_gap_is_dropped() {
        let s1 = vec![c(0.0, 0.0), c(1.0, 0.0)];
        let s2 = vec![c(1.0, 1.0), c(0.0, 1.0)];
        assert!(merge_rings(vec![s1, s2]).is_empty());
    }

    #[test]
    fn test_inner_ring_becomes_hole() {
        let outer = vec![c(0.0, 0.0), c(4.0, 0.0), c(4.0, 4.0), c(0.0, 4.0), c(0.0, 0.0)];
        let inner = vec![c(1.0, 1.0), c(2.0, 1.0), c(2.0, 2.0), c(1.0, 2.0), c(1.0, 1.0)];
        let mp = assemble_multipolygon(vec![outer], vec![inner]).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!((mp.unsigned_area() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_outer_yields_none() {
        let inner = vec![c(1.0, 1.0), c(2.0, 1.0), c(2.0, 2.0), c(1.0, 1.0)];
        assert!(assemble_multipolygon(vec![], vec![inner]).is_none());
    }
}
