//! Tribal area extraction from GeoJSON feature collections.

use geo::MultiPolygon;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::geometry::{geometry_to_multipolygon, SourceCrs};
use super::BoundaryError;

/// Display name for areas whose name field is empty
pub(crate) const UNKNOWN_AREA: &str = "Unknown area";

/// A single tribal area polygon with metadata
#[derive(Debug, Clone)]
pub struct TribalBoundary {
    /// Unique identifier (GEOID for Census data)
    pub id: String,
    pub name: String,
    /// Longitude/latitude degrees
    pub geometry: MultiPolygon<f64>,
}

impl TribalBoundary {
    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        use geo::BoundingRect;
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Property names holding the identifier and display name
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub id: String,
    pub name: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id: "GEOID".to_string(),
            name: "NAME".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    crs: Option<NamedCrs>,
    /// ArcGIS paging flag, top-level form
    #[serde(rename = "exceededTransferLimit", default)]
    exceeded_transfer_limit: bool,
    /// ArcGIS paging flag, nested form
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

impl FeatureCollection {
    pub fn exceeded_transfer_limit(&self) -> bool {
        self.exceeded_transfer_limit
            || self
                .properties
                .as_ref()
                .and_then(|p| p.get("exceededTransferLimit"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    fn crs_name(&self) -> Option<&str> {
        self.crs.as_ref().map(|c| c.properties.name.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct NamedCrs {
    properties: CrsProperties,
}

#[derive(Debug, Deserialize)]
struct CrsProperties {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

impl Feature {
    fn property(&self, key: &str) -> Option<String> {
        let value = self.properties.as_ref()?.get(key)?;
        value_to_string(value)
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract tribal boundaries from a parsed feature collection.
///
/// Features without an identifier or without areal geometry are dropped.
pub(crate) fn extract_tribal_boundaries(
    collection: &FeatureCollection,
    fields: &FieldMapping,
) -> Result<Vec<TribalBoundary>, BoundaryError> {
    let crs = SourceCrs::from_name(collection.crs_name())?;
    if crs != SourceCrs::Geographic {
        info!("Reprojecting boundaries from {:?} to lon/lat", crs);
    }

    let mut boundaries = Vec::with_capacity(collection.features.len());

    for (i, feature) in collection.features.iter().enumerate() {
        let id = match feature
            .property(&fields.id)
            .or_else(|| feature.id.as_ref().and_then(value_to_string))
        {
            Some(id) => id,
            None => {
                debug!("Skipping feature {} without '{}'", i, fields.id);
                continue;
            }
        };

        let Some(geometry) = feature.geometry.as_ref() else {
            debug!("Skipping feature {} ({}) without geometry", i, id);
            continue;
        };

        let Some(geometry) = geometry_to_multipolygon(geometry, crs)? else {
            debug!("Skipping feature {} ({}): not a polygon", i, id);
            continue;
        };

        let name = feature
            .property(&fields.name)
            .unwrap_or_else(|| UNKNOWN_AREA.to_string());

        boundaries.push(TribalBoundary { id, name, geometry });
    }

    Ok(boundaries)
}
