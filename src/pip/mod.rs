//! Point-in-Polygon (PIP) tribal land lookup.
//!
//! Loads tribal area boundaries once per run (GeoJSON, shapefile or zipped
//! TIGER/Line layer) and answers membership queries using an R-tree spatial
//! index.

mod boundary;
mod geometry;
mod index;
mod service;
mod shp;
mod source;
mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use boundary::{FieldMapping, TribalBoundary};
pub use geometry::SourceCrs;
pub use index::BoundaryIndex;
pub use service::{find_containing, is_on_tribal_land, PipService};
pub use source::{BoundaryLoader, BoundarySource};
pub use store::BoundaryStore;

/// Where to get the dataset by hand when loading fails.
pub const MANUAL_SOURCES: &[&str] = &[
    "Census TIGER/Line: https://www.census.gov/geographies/mapping-files/time-series/geo/tiger-line-file.html",
    "BIA GIS: https://biamaps.doi.gov/",
];

/// Boundary loading failures. All of these abort the run.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("boundary download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("boundary file is not valid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[error("invalid shapefile attribute table: {0}")]
    Dbase(#[from] shapefile::dbase::Error),
    #[error("invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive has no {0}")]
    MissingLayerFile(String),
    #[error("unsupported coordinate reference system '{0}'; convert to EPSG:4326 first")]
    UnsupportedCrs(String),
    #[error("coordinate ({x}, {y}) is not longitude/latitude; the file looks projected")]
    NotGeographic { x: f64, y: f64 },
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("no tribal boundaries found in {0}")]
    Empty(String),
}
