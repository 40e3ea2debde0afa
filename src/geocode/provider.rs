//! Geocoding provider trait and errors.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::models::{CoordError, Coordinate};

/// Errors a single provider can raise for one address.
///
/// The resolver treats all of these as "no result from this provider".
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("coordinate out of range: {0}")]
    Coordinate(#[from] CoordError),
}

/// An address-to-coordinate lookup service.
///
/// `Ok(None)` means the service answered but found no match; the resolver
/// then falls through to the next provider.
pub trait GeocodeProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Look up a trimmed, non-empty address.
    fn attempt<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Option<Coordinate>, ProviderError>>;
}
