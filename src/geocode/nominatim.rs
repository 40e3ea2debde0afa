//! Nominatim (OpenStreetMap) search provider.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{GeocodeProvider, Pacer, ProviderError};
use crate::models::Coordinate;

/// Primary geocoder. Usage policy allows one request per second, so every
/// network round trip goes through the pacer.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: Url,
    country_codes: String,
    pacer: Pacer,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(
        client: Client,
        endpoint: &str,
        country_codes: &str,
        min_interval: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            country_codes: country_codes.to_string(),
            pacer: Pacer::new(min_interval),
        })
    }

    fn search_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "json")
            .append_pair("limit", "1")
            .append_pair("countrycodes", &self.country_codes);
        url
    }

    async fn search(&self, address: &str) -> Result<Option<Coordinate>, ProviderError> {
        let response = self
            .client
            .get(self.search_url(address))
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        parse_search_response(&body)
    }
}

/// Parse a `format=json` search response; an empty list is no match.
fn parse_search_response(body: &str) -> Result<Option<Coordinate>, ProviderError> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let lat: f64 = place
        .lat
        .trim()
        .parse()
        .map_err(|_| ProviderError::InvalidResponse(format!("bad lat '{}'", place.lat)))?;
    let lon: f64 = place
        .lon
        .trim()
        .parse()
        .map_err(|_| ProviderError::InvalidResponse(format!("bad lon '{}'", place.lon)))?;

    if let Some(name) = &place.display_name {
        debug!("Nominatim matched '{}'", name);
    }

    Ok(Some(Coordinate::new(lat, lon)?))
}

impl GeocodeProvider for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    fn attempt<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Option<Coordinate>, ProviderError>> {
        Box::pin(async move {
            self.pacer.wait().await;
            let result = self.search(address).await;
            self.pacer.mark().await;
            result
        })
    }
}
