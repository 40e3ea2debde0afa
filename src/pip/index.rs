//! Spatial index for fast tribal boundary lookups.

use geo::{Intersects, Point};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

use super::TribalBoundary;

/// Wrapper for R-tree indexing of tribal boundaries
#[derive(Clone)]
pub struct IndexedBoundary {
    pub boundary: Arc<TribalBoundary>,
    /// Position in load order, used to break ties between overlapping areas
    order: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBoundary {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedBoundary {
    pub fn new(order: usize, boundary: TribalBoundary) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = boundary.bbox()?;
        Some(Self {
            boundary: Arc::new(boundary),
            order,
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// Spatial index for tribal boundaries using R-tree
pub struct BoundaryIndex {
    tree: RTree<IndexedBoundary>,
}

impl BoundaryIndex {
    /// Build spatial index from tribal boundaries
    pub fn build(boundaries: Vec<TribalBoundary>) -> Self {
        info!(
            "Building spatial index for {} boundaries...",
            boundaries.len()
        );

        let indexed: Vec<IndexedBoundary> = boundaries
            .into_iter()
            .enumerate()
            .filter_map(|(order, b)| IndexedBoundary::new(order, b))
            .collect();

        let tree = RTree::bulk_load(indexed);

        info!("Spatial index built with {} entries", tree.size());

        Self { tree }
    }

    /// Find all boundaries containing a point, in load order.
    ///
    /// Points on a boundary line count as contained.
    pub fn lookup(&self, lon: f64, lat: f64) -> Vec<Arc<TribalBoundary>> {
        let mut hits = self.candidates(lon, lat);
        hits.sort_by_key(|ib| ib.order);
        hits.into_iter()
            .map(|ib| Arc::clone(&ib.boundary))
            .collect()
    }

    /// First boundary in load order containing the point.
    pub fn lookup_first(&self, lon: f64, lat: f64) -> Option<Arc<TribalBoundary>> {
        self.candidates(lon, lat)
            .into_iter()
            .min_by_key(|ib| ib.order)
            .map(|ib| Arc::clone(&ib.boundary))
    }

    /// Whether any boundary contains the point.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let point = Point::new(lon, lat);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .any(|ib| ib.boundary.geometry.intersects(&point))
    }

    // R-tree envelope candidates, then exact containment
    fn candidates(&self, lon: f64, lat: f64) -> Vec<&IndexedBoundary> {
        let point = Point::new(lon, lat);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .filter(|ib| ib.boundary.geometry.intersects(&point))
            .collect()
    }

    /// Get total number of indexed boundaries
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
