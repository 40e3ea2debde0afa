//! Batch orchestration: one row at a time through resolve → classify.

mod progress;

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::geocode::CoordinateResolver;
use crate::models::{Classification, ClassificationSummary, Coordinate};
use crate::pip::{BoundaryError, BoundaryStore};

pub use progress::{ProgressLogWriter, SuspendingWriter};

/// Result for one input row
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub classification: Classification,
    /// Set only when geocoding succeeded
    pub coordinate: Option<Coordinate>,
    /// Name of the containing tribal area, when on tribal land
    pub area: Option<String>,
}

impl RowOutcome {
    fn without_coordinate(classification: Classification) -> Self {
        Self {
            classification,
            coordinate: None,
            area: None,
        }
    }
}

/// Per-row outcomes (same order and length as the input) plus totals
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<RowOutcome>,
    pub summary: ClassificationSummary,
    /// Unique addresses that went to the providers
    pub unique_addresses: usize,
}

pub struct BatchProcessor {
    resolver: CoordinateResolver,
}

impl BatchProcessor {
    pub fn new(resolver: CoordinateResolver) -> Self {
        Self { resolver }
    }

    /// Process every address in order.
    ///
    /// Boundaries are loaded before the first row; a load failure aborts the
    /// batch. Nothing after that point can fail. Per-row log lines share the
    /// terminal with `progress` when the subscriber writes through a
    /// [`ProgressLogWriter`] on the same bar.
    pub async fn process<S: AsRef<str>>(
        &mut self,
        store: &mut BoundaryStore,
        addresses: &[Option<S>],
        progress: &ProgressBar,
    ) -> Result<BatchReport, BoundaryError> {
        let pip = store.ensure_loaded().await?;

        let total = addresses.len();
        let mut outcomes = Vec::with_capacity(total);

        for (idx, address) in addresses.iter().enumerate() {
            let row = idx + 1;
            let address = address
                .as_ref()
                .map(|a| <S as AsRef<str>>::as_ref(a).trim())
                .filter(|a| !a.is_empty());

            let outcome = match address {
                None => {
                    warn!("Row {}: Empty address", row);
                    RowOutcome::without_coordinate(Classification::NoAddressData)
                }
                Some(address) => {
                    info!("Processing {}/{}: {}", row, total, address);
                    match self.resolver.resolve(address).await {
                        None => {
                            warn!("Row {}: Could not geocode '{}'", row, address);
                            RowOutcome::without_coordinate(Classification::GeocodeFailed)
                        }
                        Some(coordinate) => {
                            let area = pip.lookup(coordinate);
                            let classification = Classification::from_membership(area.is_some());
                            info!(
                                "  Coordinates: {} - Tribal Land: {}",
                                coordinate, classification
                            );
                            RowOutcome {
                                classification,
                                coordinate: Some(coordinate),
                                area: area.map(|a| a.name.clone()),
                            }
                        }
                    }
                }
            };

            outcomes.push(outcome);
            progress.inc(1);
        }

        let summary: ClassificationSummary = outcomes.iter().map(|o| o.classification).collect();

        Ok(BatchReport {
            outcomes,
            summary,
            unique_addresses: self.resolver.cache().len(),
        })
    }
}
