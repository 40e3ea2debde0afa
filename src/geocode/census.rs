//! U.S. Census Bureau one-line address geocoder.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{GeocodeProvider, Pacer, ProviderError};
use crate::models::Coordinate;

/// Fallback geocoder backed by the Census address-matching service.
pub struct CensusGeocoder {
    client: Client,
    endpoint: Url,
    benchmark: String,
    pacer: Pacer,
}

#[derive(Debug, Deserialize)]
struct CensusResponse {
    #[serde(default)]
    result: Option<CensusResult>,
}

#[derive(Debug, Deserialize)]
struct CensusResult {
    #[serde(rename = "addressMatches", default)]
    address_matches: Vec<AddressMatch>,
}

#[derive(Debug, Deserialize)]
struct AddressMatch {
    #[serde(rename = "matchedAddress", default)]
    matched_address: Option<String>,
    coordinates: CensusCoordinates,
}

/// x = longitude, y = latitude
#[derive(Debug, Deserialize)]
struct CensusCoordinates {
    x: f64,
    y: f64,
}

impl CensusGeocoder {
    pub fn new(
        client: Client,
        endpoint: &str,
        benchmark: &str,
        min_interval: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            benchmark: benchmark.to_string(),
            pacer: Pacer::new(min_interval),
        })
    }

    fn lookup_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("benchmark", &self.benchmark)
            .append_pair("format", "json");
        url
    }

    async fn lookup(&self, address: &str) -> Result<Option<Coordinate>, ProviderError> {
        let response = self
            .client
            .get(self.lookup_url(address))
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        parse_lookup_response(&body)
    }
}

fn parse_lookup_response(body: &str) -> Result<Option<Coordinate>, ProviderError> {
    let data: CensusResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let Some(first) = data
        .result
        .and_then(|r| r.address_matches.into_iter().next())
    else {
        return Ok(None);
    };

    if let Some(matched) = &first.matched_address {
        debug!("Census matched '{}'", matched);
    }

    Ok(Some(Coordinate::new(first.coordinates.y, first.coordinates.x)?))
}

impl GeocodeProvider for CensusGeocoder {
    fn name(&self) -> &str {
        "census"
    }

    fn attempt<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Option<Coordinate>, ProviderError>> {
        Box::pin(async move {
            self.pacer.wait().await;
            let result = self.lookup(address).await;
            self.pacer.mark().await;
            result
        })
    }
}
