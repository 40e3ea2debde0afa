use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_USER_AGENT: &str = "TribalLandChecker/1.0";
pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const CENSUS_ONELINE_URL: &str =
    "https://geocoding.geo.census.gov/geocoder/locations/onelineaddress";
/// TIGER/Line American Indian / Alaska Native / Native Hawaiian areas, all area
/// types (reservations, off-reservation trust land, statistical areas)
pub const TIGER_AIANNH_ZIP_URL: &str =
    "https://www2.census.gov/geo/tiger/TIGER2023/AIANNH/tl_2023_us_aiannh.zip";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub geocoder: GeocoderConfig,
    pub boundaries: BoundaryConfig,
}

/// Provider selectable in `geocoder.providers`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Nominatim,
    Census,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Providers in the order they are tried
    pub providers: Vec<ProviderKind>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub country_codes: String,
    pub nominatim_url: String,
    pub nominatim_interval_ms: u64,
    pub census_url: String,
    pub census_benchmark: String,
    pub census_interval_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            providers: vec![ProviderKind::Nominatim, ProviderKind::Census],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            country_codes: "us".to_string(),
            nominatim_url: NOMINATIM_SEARCH_URL.to_string(),
            nominatim_interval_ms: 1000,
            census_url: CENSUS_ONELINE_URL.to_string(),
            census_benchmark: "Public_AR_Current".to_string(),
            census_interval_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Local GeoJSON/shapefile/zip path, GeoJSON or zip URL, or ArcGIS
    /// `.../query` endpoint
    pub source: String,
    pub id_field: String,
    pub name_field: String,
    /// Records per ArcGIS page
    pub page_size: u32,
    /// Timeout for each dataset download, separate from geocoder calls
    pub timeout_secs: u64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            source: TIGER_AIANNH_ZIP_URL.to_string(),
            id_field: "GEOID".to_string(),
            name_field: "NAME".to_string(),
            page_size: 1000,
            timeout_secs: 300,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
