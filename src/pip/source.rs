//! Boundary dataset acquisition: local files, downloads, or paged ArcGIS query.

use std::fs::File;
use std::future::Future;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::boundary::{extract_tribal_boundaries, FeatureCollection, FieldMapping};
use super::shp::{extract_shapefile_boundaries, ShapefileParts};
use super::{BoundaryError, TribalBoundary};
use crate::config::Config;

/// Where boundaries are loaded from
#[derive(Debug, Clone, PartialEq)]
pub enum BoundarySource {
    /// Local `.geojson`/`.json` (optionally gzip-compressed), `.shp`, or
    /// `.zip` holding a shapefile layer
    File(PathBuf),
    /// URL returning a complete FeatureCollection
    GeojsonUrl(Url),
    /// URL of a zipped shapefile layer, e.g. a TIGER/Line download
    ShapefileZipUrl(Url),
    /// ArcGIS `FeatureServer`/`MapServer` query endpoint (up to `.../query`)
    Arcgis(Url),
}

impl BoundarySource {
    /// Classify a path or URL string. Only http(s) strings are treated as URLs.
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                let path = url.path().trim_end_matches('/').to_ascii_lowercase();
                if path.ends_with("/query") {
                    BoundarySource::Arcgis(url)
                } else if path.ends_with(".zip") {
                    BoundarySource::ShapefileZipUrl(url)
                } else {
                    BoundarySource::GeojsonUrl(url)
                }
            }
            _ => BoundarySource::File(PathBuf::from(source)),
        }
    }
}

impl std::fmt::Display for BoundarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundarySource::File(path) => write!(f, "{}", path.display()),
            BoundarySource::GeojsonUrl(url)
            | BoundarySource::ShapefileZipUrl(url)
            | BoundarySource::Arcgis(url) => write!(f, "{}", url),
        }
    }
}

/// Fetches and parses boundary datasets
pub struct BoundaryLoader {
    client: Client,
    fields: FieldMapping,
    page_size: u32,
}

impl BoundaryLoader {
    pub fn new(client: Client, fields: FieldMapping, page_size: u32) -> Self {
        Self {
            client,
            fields,
            page_size: page_size.max(1),
        }
    }

    /// Loader with its own HTTP client. Dataset downloads use
    /// `boundaries.timeout_secs`, not the geocoder timeout.
    pub fn from_config(config: &Config) -> Result<Self, BoundaryError> {
        let client = Client::builder()
            .user_agent(config.geocoder.user_agent.as_str())
            .timeout(Duration::from_secs(config.boundaries.timeout_secs))
            .build()?;
        let fields = FieldMapping {
            id: config.boundaries.id_field.clone(),
            name: config.boundaries.name_field.clone(),
        };
        Ok(Self::new(client, fields, config.boundaries.page_size))
    }

    /// Load every boundary from the source. An empty result is an error.
    pub async fn load(&self, source: &BoundarySource) -> Result<Vec<TribalBoundary>, BoundaryError> {
        info!("Loading tribal boundaries from {}", source);

        let boundaries = match source {
            BoundarySource::File(path) => self.load_file(path)?,
            BoundarySource::GeojsonUrl(url) => {
                let collection = self.fetch_collection(url.clone()).await?;
                extract_tribal_boundaries(&collection, &self.fields)?
            }
            BoundarySource::ShapefileZipUrl(url) => {
                let body = self
                    .client
                    .get(url.clone())
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                debug!("Downloaded {} bytes", body.len());
                let parts = ShapefileParts::from_zip(Cursor::new(body))?;
                extract_shapefile_boundaries(parts, &self.fields)?
            }
            BoundarySource::Arcgis(url) => self.load_arcgis(url).await?,
        };

        if boundaries.is_empty() {
            return Err(BoundaryError::Empty(source.to_string()));
        }

        info!("Loaded {} tribal areas", boundaries.len());
        Ok(boundaries)
    }

    fn load_file(&self, path: &Path) -> Result<Vec<TribalBoundary>, BoundaryError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if extension.as_deref() == Some("shp") {
            return extract_shapefile_boundaries(ShapefileParts::from_path(path)?, &self.fields);
        }

        let file = File::open(path).map_err(|source| BoundaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match extension.as_deref() {
            Some("zip") => {
                let parts = ShapefileParts::from_zip(BufReader::new(file))?;
                extract_shapefile_boundaries(parts, &self.fields)
            }
            Some("gz") => {
                let collection: FeatureCollection =
                    serde_json::from_reader(BufReader::new(GzDecoder::new(file)))?;
                extract_tribal_boundaries(&collection, &self.fields)
            }
            _ => {
                let collection: FeatureCollection = serde_json::from_reader(BufReader::new(file))?;
                extract_tribal_boundaries(&collection, &self.fields)
            }
        }
    }

    async fn fetch_collection(&self, url: Url) -> Result<FeatureCollection, BoundaryError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn load_arcgis(&self, base: &Url) -> Result<Vec<TribalBoundary>, BoundaryError> {
        let fields = &self.fields;
        let page_size = self.page_size;

        collect_pages(fields, move |offset| {
            debug!("Fetching ArcGIS page at offset {}", offset);
            self.fetch_collection(arcgis_page_url(base, fields, offset, page_size))
        })
        .await
    }
}

/// Request pages from offset 0 until one comes back empty or without the
/// `exceededTransferLimit` flag. The offset advances by the number of
/// features returned, including ones later dropped.
async fn collect_pages<F, Fut>(
    fields: &FieldMapping,
    mut fetch_page: F,
) -> Result<Vec<TribalBoundary>, BoundaryError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<FeatureCollection, BoundaryError>>,
{
    let mut boundaries = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let page = fetch_page(offset).await?;
        let fetched = page.features.len() as u64;
        boundaries.extend(extract_tribal_boundaries(&page, fields)?);

        if fetched == 0 || !page.exceeded_transfer_limit() {
            break;
        }
        offset += fetched;
    }

    Ok(boundaries)
}

fn arcgis_page_url(base: &Url, fields: &FieldMapping, offset: u64, page_size: u32) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("where", "1=1")
        .append_pair("outFields", &format!("{},{}", fields.id, fields.name))
        .append_pair("returnGeometry", "true")
        .append_pair("outSR", "4326")
        .append_pair("f", "geojson")
        .append_pair("resultOffset", &offset.to_string())
        .append_pair("resultRecordCount", &page_size.to_string());
    url
}
