use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;

use super::BoundaryError;

const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Projection names that identify spherical Web Mercator in WKT
const WEB_MERCATOR_WKT_MARKERS: &[&str] = &[
    "MERCATOR_AUXILIARY_SPHERE",
    "PSEUDO-MERCATOR",
    "PSEUDO_MERCATOR",
    "WEB_MERCATOR",
];

/// Coordinate reference system declared by a boundary source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCrs {
    /// Longitude/latitude degrees (WGS84, CRS84, NAD83)
    Geographic,
    /// Spherical Web Mercator metres
    WebMercator,
}

impl SourceCrs {
    /// Interpret a GeoJSON `crs.properties.name`. Absent means geographic.
    pub fn from_name(name: Option<&str>) -> Result<Self, BoundaryError> {
        let Some(name) = name else {
            return Ok(SourceCrs::Geographic);
        };
        let upper = name.to_ascii_uppercase();
        let code = upper.rsplit(|c: char| c == ':' || c == '/').next().unwrap_or("");

        match code {
            "4326" | "CRS84" | "4269" | "4617" => Ok(SourceCrs::Geographic),
            "3857" | "900913" | "102100" | "102113" | "3785" => Ok(SourceCrs::WebMercator),
            _ => Err(BoundaryError::UnsupportedCrs(name.to_string())),
        }
    }

    /// Interpret a shapefile `.prj` WKT string.
    pub fn from_wkt(wkt: &str) -> Result<Self, BoundaryError> {
        let upper = wkt.trim().to_ascii_uppercase();

        if upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS") {
            return Ok(SourceCrs::Geographic);
        }
        if upper.starts_with("PROJCS") || upper.starts_with("PROJCRS") {
            let web_mercator = WEB_MERCATOR_WKT_MARKERS
                .iter()
                .any(|marker| upper.contains(*marker));
            if web_mercator {
                return Ok(SourceCrs::WebMercator);
            }
        }

        let name = wkt.split('"').nth(1).unwrap_or(wkt.trim());
        Err(BoundaryError::UnsupportedCrs(name.to_string()))
    }

    fn to_lon_lat(self, x: f64, y: f64) -> Coord<f64> {
        match self {
            SourceCrs::Geographic => Coord { x, y },
            SourceCrs::WebMercator => {
                let lon = (x / EARTH_RADIUS_M).to_degrees();
                let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2)
                    .to_degrees();
                Coord { x: lon, y: lat }
            }
        }
    }
}

/// Convert a GeoJSON geometry object into a lon/lat multipolygon.
///
/// Returns `Ok(None)` for non-areal geometry types and for geometries whose
/// rings are all degenerate.
pub fn geometry_to_multipolygon(
    geometry: &Value,
    crs: SourceCrs,
) -> Result<Option<MultiPolygon<f64>>, BoundaryError> {
    let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("");
    let coordinates = geometry.get("coordinates");

    let polygons: Vec<Polygon<f64>> = match (kind, coordinates) {
        ("Polygon", Some(rings)) => parse_polygon(rings, crs)?.into_iter().collect(),
        ("MultiPolygon", Some(Value::Array(parts))) => {
            let mut polygons = Vec::with_capacity(parts.len());
            for part in parts {
                if let Some(p) = parse_polygon(part, crs)? {
                    polygons.push(p);
                }
            }
            polygons
        }
        ("GeometryCollection", _) => {
            let mut polygons = Vec::new();
            if let Some(Value::Array(members)) = geometry.get("geometries") {
                for member in members {
                    if let Some(mp) = geometry_to_multipolygon(member, crs)? {
                        polygons.extend(mp.0);
                    }
                }
            }
            polygons
        }
        _ => return Ok(None),
    };

    if polygons.is_empty() {
        return Ok(None);
    }
    Ok(Some(MultiPolygon::new(polygons)))
}

/// First ring is the exterior, the rest are holes.
fn parse_polygon(rings: &Value, crs: SourceCrs) -> Result<Option<Polygon<f64>>, BoundaryError> {
    let Value::Array(rings) = rings else {
        return Err(malformed("polygon is not an array of rings"));
    };

    let mut parsed = Vec::with_capacity(rings.len());
    for ring in rings {
        parsed.push(parse_ring(ring, crs)?);
    }

    let mut parsed = parsed.into_iter();
    let Some(exterior) = parsed.next().flatten() else {
        return Ok(None);
    };
    let interiors: Vec<LineString<f64>> = parsed.flatten().collect();

    Ok(Some(Polygon::new(exterior, interiors)))
}

fn parse_ring(ring: &Value, crs: SourceCrs) -> Result<Option<LineString<f64>>, BoundaryError> {
    let Value::Array(positions) = ring else {
        return Err(malformed("ring is not an array of positions"));
    };

    let mut points = Vec::with_capacity(positions.len());
    for position in positions {
        let point = match position.as_array().map(|p| p.as_slice()) {
            Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(malformed("non-numeric position")),
            },
            _ => return Err(malformed("position needs at least two numbers")),
        };
        points.push(point);
    }

    build_ring(points, crs)
}

/// Reproject a ring to lon/lat and close it. Rings with fewer than three
/// distinct positions come back as `None`.
pub(crate) fn build_ring(
    points: impl IntoIterator<Item = (f64, f64)>,
    crs: SourceCrs,
) -> Result<Option<LineString<f64>>, BoundaryError> {
    let points = points.into_iter();
    let mut coords = Vec::with_capacity(points.size_hint().0 + 1);
    for (x, y) in points {
        let coord = crs.to_lon_lat(x, y);
        if !(-180.0..=180.0).contains(&coord.x) || !(-90.0..=90.0).contains(&coord.y) {
            return Err(BoundaryError::NotGeographic {
                x: coord.x,
                y: coord.y,
            });
        }
        coords.push(coord);
    }

    // Close the ring if needed
    if coords.len() >= 3 && coords.first() != coords.last() {
        coords.push(coords[0]);
    }

    if coords.len() < 4 {
        return Ok(None);
    }

    Ok(Some(LineString::new(coords)))
}

fn malformed(reason: &str) -> BoundaryError {
    BoundaryError::MalformedGeometry(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_crs_names() {
        assert_eq!(SourceCrs::from_name(None).unwrap(), SourceCrs::Geographic);
        assert_eq!(
            SourceCrs::from_name(Some("urn:ogc:def:crs:OGC:1.3:CRS84")).unwrap(),
            SourceCrs::Geographic
        );
        assert_eq!(
            SourceCrs::from_name(Some("EPSG:4269")).unwrap(),
            SourceCrs::Geographic
        );
        assert_eq!(
            SourceCrs::from_name(Some("urn:ogc:def:crs:EPSG::3857")).unwrap(),
            SourceCrs::WebMercator
        );
        assert!(matches!(
            SourceCrs::from_name(Some("EPSG:26912")),
            Err(BoundaryError::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn test_crs_from_prj() {
        let nad83 = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]]"#;
        assert_eq!(SourceCrs::from_wkt(nad83).unwrap(), SourceCrs::Geographic);

        let mercator = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"]]"#;
        assert_eq!(SourceCrs::from_wkt(mercator).unwrap(), SourceCrs::WebMercator);

        let utm = r#"PROJCS["NAD_1983_UTM_Zone_12N",GEOGCS["GCS_North_American_1983"],PROJECTION["Transverse_Mercator"]]"#;
        match SourceCrs::from_wkt(utm) {
            Err(BoundaryError::UnsupportedCrs(name)) => assert_eq!(name, "NAD_1983_UTM_Zone_12N"),
            other => panic!("expected UnsupportedCrs, got {:?}", other),
        }
    }

    #[test]
    fn test_polygon_with_hole() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [
                [[-111.0, 34.0], [-109.0, 34.0], [-109.0, 36.0], [-111.0, 36.0], [-111.0, 34.0]],
                [[-110.5, 34.5], [-110.0, 34.5], [-110.0, 35.0]]
            ]
        });
        let mp = geometry_to_multipolygon(&geometry, SourceCrs::Geographic)
            .unwrap()
            .unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        // open ring was closed
        assert_eq!(mp.0[0].interiors()[0].0.len(), 4);
    }

    #[test]
    fn test_multipolygon_with_z_values() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0, 5.0], [1.0, 0.0, 5.0], [1.0, 1.0, 5.0], [0.0, 0.0, 5.0]]],
                [[[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]]
            ]
        });
        let mp = geometry_to_multipolygon(&geometry, SourceCrs::Geographic)
            .unwrap()
            .unwrap();
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn test_point_geometry_is_skipped() {
        let geometry = json!({"type": "Point", "coordinates": [0.0, 0.0]});
        assert!(geometry_to_multipolygon(&geometry, SourceCrs::Geographic)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_degenerate_ring_is_skipped() {
        let geometry = json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 1.0]]]});
        assert!(geometry_to_multipolygon(&geometry, SourceCrs::Geographic)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_web_mercator_reprojection() {
        // -110°, 35° in EPSG:3857
        let x = -12_245_143.987_260_092;
        let y = 4_163_881.144_064_294;
        let c = SourceCrs::WebMercator.to_lon_lat(x, y);
        assert!((c.x - -110.0).abs() < 1e-6);
        assert!((c.y - 35.0).abs() < 1e-6);
    }

    #[test]
    fn test_projected_coordinates_without_crs_rejected() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [[[500000.0, 4000000.0], [500100.0, 4000000.0], [500100.0, 4000100.0], [500000.0, 4000000.0]]]
        });
        assert!(matches!(
            geometry_to_multipolygon(&geometry, SourceCrs::Geographic),
            Err(BoundaryError::NotGeographic { .. })
        ));
    }

    #[test]
    fn test_non_numeric_position() {
        let geometry = json!({"type": "Polygon", "coordinates": [[["a", 0.0]]]});
        assert!(matches!(
            geometry_to_multipolygon(&geometry, SourceCrs::Geographic),
            Err(BoundaryError::MalformedGeometry(_))
        ));
    }
}
