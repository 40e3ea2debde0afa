//! Address geocoding with caching and ordered provider fallback.
//!
//! Providers are tried in the configured order (Nominatim first, then the
//! Census geocoder by default). Every outcome, including failure, is cached
//! for the rest of the run.

mod cache;
mod census;
mod nominatim;
mod pacer;
mod provider;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use reqwest::Client;

use crate::config::{GeocoderConfig, ProviderKind};

pub use cache::{CachedLookup, GeocodeCache};
pub use census::CensusGeocoder;
pub use nominatim::NominatimGeocoder;
pub use pacer::Pacer;
pub use provider::{GeocodeProvider, ProviderError};
pub use resolver::CoordinateResolver;

/// Shared HTTP client for all geocoding providers.
pub fn http_client(config: &GeocoderConfig) -> Result<Client, ProviderError> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Build the provider chain in the order listed in the config.
pub fn build_providers(
    config: &GeocoderConfig,
) -> Result<Vec<Box<dyn GeocodeProvider>>, ProviderError> {
    let client = http_client(config)?;

    config
        .providers
        .iter()
        .map(|kind| -> Result<Box<dyn GeocodeProvider>, ProviderError> {
            match kind {
                ProviderKind::Nominatim => Ok(Box::new(NominatimGeocoder::new(
                    client.clone(),
                    &config.nominatim_url,
                    &config.country_codes,
                    Duration::from_millis(config.nominatim_interval_ms),
                )?)),
                ProviderKind::Census => Ok(Box::new(CensusGeocoder::new(
                    client.clone(),
                    &config.census_url,
                    &config.census_benchmark,
                    Duration::from_millis(config.census_interval_ms),
                )?)),
            }
        })
        .collect()
}
