//! Coordinate resolver: cache lookup followed by the provider chain.

use tracing::{debug, warn};

use super::{CachedLookup, GeocodeCache, GeocodeProvider};
use crate::models::Coordinate;

/// Resolves addresses to coordinates, at most one provider round per unique
/// address per run.
pub struct CoordinateResolver {
    providers: Vec<Box<dyn GeocodeProvider>>,
    cache: GeocodeCache,
}

impl CoordinateResolver {
    /// Providers are tried in the given order.
    pub fn new(providers: Vec<Box<dyn GeocodeProvider>>) -> Self {
        Self {
            providers,
            cache: GeocodeCache::new(),
        }
    }

    /// Resolve an address. Never fails: provider errors are logged and the
    /// address is cached as unresolvable.
    pub async fn resolve(&mut self, address: &str) -> Option<Coordinate> {
        let address = address.trim();
        if address.is_empty() {
            return None;
        }

        if let Some(cached) = self.cache.get(address) {
            debug!("Cache hit for '{}'", address);
            return cached.coordinate();
        }

        let result = self.query_providers(address).await;
        if result.is_none() {
            warn!("Could not geocode address: {}", address);
        }

        self.cache
            .insert(address, CachedLookup::from(result))
            .coordinate()
    }

    async fn query_providers(&self, address: &str) -> Option<Coordinate> {
        for provider in &self.providers {
            match provider.attempt(address).await {
                Ok(Some(coord)) => {
                    debug!("{} resolved '{}' to {}", provider.name(), address, coord);
                    return Some(coord);
                }
                Ok(None) => {
                    debug!("{} found no match for '{}'", provider.name(), address);
                }
                Err(e) => {
                    warn!(
                        "Geocoding error from {} for '{}': {}",
                        provider.name(),
                        address,
                        e
                    );
                }
            }
        }
        None
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}
