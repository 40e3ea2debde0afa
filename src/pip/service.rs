//! Membership classification: is a coordinate on tribal land?

use geo::Intersects;
use std::sync::Arc;
use tracing::debug;

use super::{BoundaryIndex, TribalBoundary};
use crate::models::Coordinate;

/// First boundary, in iteration order, whose area includes the coordinate.
///
/// The point is built as (lon, lat). Points on a boundary line count as inside.
pub fn find_containing(
    coordinate: Coordinate,
    boundaries: &[TribalBoundary],
) -> Option<&TribalBoundary> {
    let point = coordinate.to_point();
    boundaries.iter().find(|b| b.geometry.intersects(&point))
}

/// Linear scan over the boundaries, stopping at the first match.
pub fn is_on_tribal_land(coordinate: Coordinate, boundaries: &[TribalBoundary]) -> bool {
    find_containing(coordinate, boundaries).is_some()
}

/// Point-in-Polygon lookup service backed by the R-tree index
pub struct PipService {
    index: BoundaryIndex,
}

impl PipService {
    /// Create a new PIP service from a spatial index
    pub fn new(index: BoundaryIndex) -> Self {
        Self { index }
    }

    pub fn from_boundaries(boundaries: Vec<TribalBoundary>) -> Self {
        Self::new(BoundaryIndex::build(boundaries))
    }

    /// Tribal area containing the coordinate, first in load order.
    pub fn lookup(&self, coordinate: Coordinate) -> Option<Arc<TribalBoundary>> {
        let found = self.index.lookup_first(coordinate.lon, coordinate.lat);
        if let Some(area) = &found {
            debug!("Point {} is within: {} ({})", coordinate, area.name, area.id);
        }
        found
    }

    pub fn is_on_tribal_land(&self, coordinate: Coordinate) -> bool {
        self.index.contains(coordinate.lon, coordinate.lat)
    }

    /// Get the spatial index (for stats/debugging)
    pub fn index(&self) -> &BoundaryIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn boundary(id: &str, poly: geo::Polygon<f64>) -> TribalBoundary {
        TribalBoundary {
            id: id.to_string(),
            name: id.to_string(),
            geometry: MultiPolygon::new(vec![poly]),
        }
    }

    fn test_boundaries() -> Vec<TribalBoundary> {
        vec![
            boundary(
                "alaska",
                polygon![(x: -150.0, y: 60.0), (x: -149.0, y: 60.0), (x: -149.0, y: 61.0), (x: -150.0, y: 60.0)],
            ),
            boundary(
                "four-corners",
                polygon![(x: -111.0, y: 34.0), (x: -109.0, y: 34.0), (x: -109.0, y: 36.0), (x: -111.0, y: 36.0), (x: -111.0, y: 34.0)],
            ),
            boundary(
                "overlap",
                polygon![(x: -110.5, y: 34.5), (x: -109.5, y: 34.5), (x: -109.5, y: 35.5), (x: -110.5, y: 35.5), (x: -110.5, y: 34.5)],
            ),
        ]
    }

    #[test]
    fn test_point_inside_test_polygon() {
        let c = Coordinate::new(35.0, -110.0).unwrap();
        assert!(is_on_tribal_land(c, &test_boundaries()));
    }

    #[test]
    fn test_origin_outside() {
        let c = Coordinate::new(0.0, 0.0).unwrap();
        assert!(!is_on_tribal_land(c, &test_boundaries()));
    }

    #[test]
    fn test_empty_boundary_set() {
        let white_house = Coordinate::new(38.8977, -77.0365).unwrap();
        assert!(!is_on_tribal_land(white_house, &[]));
        assert!(!PipService::from_boundaries(vec![]).is_on_tribal_land(white_house));
    }

    #[test]
    fn test_axis_order_matters() {
        // (lat=-110, lon=35) is not a valid latitude; (lat=35, lon=-110) is inside.
        // A swapped point (x=35, y=-110) would miss the polygon entirely.
        let swapped = Coordinate { lat: -110.0, lon: 35.0 };
        assert!(!is_on_tribal_land(swapped, &test_boundaries()));
    }

    #[test]
    fn test_first_match_in_iteration_order() {
        let c = Coordinate::new(35.0, -110.0).unwrap();
        let boundaries = test_boundaries();
        assert_eq!(find_containing(c, &boundaries).unwrap().id, "four-corners");
    }

    #[test]
    fn test_order_independence() {
        let points = [
            Coordinate::new(35.0, -110.0).unwrap(),
            Coordinate::new(0.0, 0.0).unwrap(),
            Coordinate::new(60.2, -149.8).unwrap(),
            Coordinate::new(34.0, -111.0).unwrap(),
            Coordinate::new(61.0, -149.0).unwrap(),
        ];

        let forward = test_boundaries();
        let mut reversed = test_boundaries();
        reversed.reverse();
        let mut rotated = test_boundaries();
        rotated.rotate_left(1);

        for p in points {
            let expected = is_on_tribal_land(p, &forward);
            assert_eq!(is_on_tribal_land(p, &reversed), expected, "{}", p);
            assert_eq!(is_on_tribal_land(p, &rotated), expected, "{}", p);
            assert_eq!(
                PipService::from_boundaries(reversed.clone()).is_on_tribal_land(p),
                expected,
                "{}",
                p
            );
        }
    }

    #[test]
    fn test_service_matches_linear_scan() {
        let service = PipService::from_boundaries(test_boundaries());
        let boundaries = test_boundaries();
        for lat in [33.5, 34.0, 34.7, 35.0, 36.0, 36.5, 60.5] {
            for lon in [-150.0, -149.5, -111.0, -110.0, -109.6, -109.0, -108.0] {
                let c = Coordinate::new(lat, lon).unwrap();
                assert_eq!(
                    service.is_on_tribal_land(c),
                    is_on_tribal_land(c, &boundaries),
                    "{}",
                    c
                );
                assert_eq!(
                    service.lookup(c).map(|b| b.id.clone()),
                    find_containing(c, &boundaries).map(|b| b.id.clone()),
                    "{}",
                    c
                );
            }
        }
    }

    #[test]
    fn test_boundary_line_counts_as_inside() {
        let c = Coordinate::new(34.0, -110.0).unwrap();
        assert!(is_on_tribal_land(c, &test_boundaries()));
    }
}
