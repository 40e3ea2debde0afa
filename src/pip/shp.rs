//! ESRI shapefile boundaries, loose or zipped as Census TIGER/Line ships them.

use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use geo::{LineString, MultiPolygon, Polygon};
use shapefile::dbase::{self, FieldValue, Record};
use shapefile::{PolygonRing, Shape, ShapeReader};
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use super::boundary::{FieldMapping, UNKNOWN_AREA};
use super::geometry::{build_ring, SourceCrs};
use super::{BoundaryError, TribalBoundary};

/// Raw bytes of one shapefile layer
pub(crate) struct ShapefileParts {
    shp: Vec<u8>,
    dbf: Vec<u8>,
    /// `.prj` WKT; absent means lon/lat
    prj: Option<String>,
}

impl ShapefileParts {
    /// A `.shp` plus its `.dbf` and optional `.prj` siblings.
    pub fn from_path(path: &Path) -> Result<Self, BoundaryError> {
        let shp = read_file(path)?;
        let dbf = read_file(&path.with_extension("dbf"))?;

        let prj_path = path.with_extension("prj");
        let prj = if prj_path.exists() {
            Some(String::from_utf8_lossy(&read_file(&prj_path)?).into_owned())
        } else {
            None
        };

        Ok(Self { shp, dbf, prj })
    }

    /// The first layer found in a zip archive.
    pub fn from_zip<R: Read + Seek>(reader: R) -> Result<Self, BoundaryError> {
        let mut archive = ZipArchive::new(reader)?;
        let names: Vec<String> = archive
            .file_names()
            .filter(|n| !n.starts_with("__MACOSX"))
            .map(str::to_string)
            .collect();

        let shp_name = names
            .iter()
            .find(|n| has_extension(n, "shp"))
            .cloned()
            .ok_or_else(|| BoundaryError::MissingLayerFile("*.shp".to_string()))?;
        let stem = &shp_name[..shp_name.len() - ".shp".len()];
        let sibling = |ext: &str| {
            names
                .iter()
                .find(|n| n.len() == shp_name.len() && n.starts_with(stem) && has_extension(n, ext))
                .cloned()
        };

        let dbf_name = sibling("dbf")
            .ok_or_else(|| BoundaryError::MissingLayerFile(format!("{}.dbf", stem)))?;
        let prj_name = sibling("prj");
        debug!("Reading layer {} from archive", shp_name);

        let shp = read_member(&mut archive, &shp_name)?;
        let dbf = read_member(&mut archive, &dbf_name)?;
        let prj = match prj_name {
            Some(name) => Some(String::from_utf8_lossy(&read_member(&mut archive, &name)?).into_owned()),
            None => None,
        };

        Ok(Self { shp, dbf, prj })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, BoundaryError> {
    fs::read(path).map_err(|source| BoundaryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, BoundaryError> {
    let mut file = archive.by_name(name)?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf).map_err(ZipError::Io)?;
    Ok(buf)
}

fn has_extension(name: &str, ext: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.len() > ext.len() + 1 && name.ends_with(&format!(".{}", ext))
}

/// Extract tribal boundaries from a shapefile layer.
///
/// Same rules as GeoJSON: records without an identifier or without polygon
/// geometry are dropped.
pub(crate) fn extract_shapefile_boundaries(
    parts: ShapefileParts,
    fields: &FieldMapping,
) -> Result<Vec<TribalBoundary>, BoundaryError> {
    let crs = match &parts.prj {
        Some(wkt) => SourceCrs::from_wkt(wkt)?,
        None => SourceCrs::Geographic,
    };
    if crs != SourceCrs::Geographic {
        info!("Reprojecting boundaries from {:?} to lon/lat", crs);
    }

    let shapes = ShapeReader::new(Cursor::new(parts.shp))?;
    let records = dbase::Reader::new(Cursor::new(parts.dbf))?;
    let mut reader = shapefile::Reader::new(shapes, records);

    let mut boundaries = Vec::new();
    for (i, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item?;

        let Some(id) = field_string(&record, &fields.id) else {
            debug!("Skipping record {} without '{}'", i, fields.id);
            continue;
        };

        let geometry = match &shape {
            Shape::Polygon(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y), crs)?,
            Shape::PolygonM(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y), crs)?,
            Shape::PolygonZ(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y), crs)?,
            _ => None,
        };
        let Some(geometry) = geometry else {
            debug!("Skipping record {} ({}): not a polygon", i, id);
            continue;
        };

        let name = field_string(&record, &fields.name).unwrap_or_else(|| UNKNOWN_AREA.to_string());
        boundaries.push(TribalBoundary { id, name, geometry });
    }

    Ok(boundaries)
}

fn field_string(record: &Record, name: &str) -> Option<String> {
    match record.get(name)? {
        FieldValue::Character(Some(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(n.to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Each outer ring starts a polygon; inner rings become holes of the
/// polygon before them.
fn rings_to_multipolygon<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> (f64, f64),
    crs: SourceCrs,
) -> Result<Option<MultiPolygon<f64>>, BoundaryError> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in rings {
        let (points, outer) = match ring {
            PolygonRing::Outer(points) => (points, true),
            PolygonRing::Inner(points) => (points, false),
        };
        let Some(line) = build_ring(points.iter().map(&xy), crs)? else {
            continue;
        };

        // A hole with nothing before it is treated as an exterior
        if outer || exterior.is_none() {
            if let Some(previous) = exterior.take() {
                polygons.push(Polygon::new(previous, std::mem::take(&mut holes)));
            }
            exterior = Some(line);
        } else {
            holes.push(line);
        }
    }
    if let Some(last) = exterior {
        polygons.push(Polygon::new(last, holes));
    }

    if polygons.is_empty() {
        return Ok(None);
    }
    Ok(Some(MultiPolygon::new(polygons)))
}
