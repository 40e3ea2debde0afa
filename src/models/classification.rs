//! Per-row classification outcome and batch totals.

use serde::{Deserialize, Serialize};

/// Outcome assigned to every input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Geocoded and inside at least one boundary
    OnTribalLand,
    /// Geocoded and outside every boundary
    NotOnTribalLand,
    /// Every provider came back empty or failed
    GeocodeFailed,
    /// Address cell missing or blank
    NoAddressData,
}

impl Classification {
    pub fn all() -> &'static [Classification] {
        &[
            Classification::OnTribalLand,
            Classification::NotOnTribalLand,
            Classification::GeocodeFailed,
            Classification::NoAddressData,
        ]
    }

    /// Label written to the output table.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::OnTribalLand => "Yes",
            Classification::NotOnTribalLand => "No",
            Classification::GeocodeFailed => "Could Not Geocode",
            Classification::NoAddressData => "No Data",
        }
    }

    pub fn from_membership(on_tribal_land: bool) -> Self {
        if on_tribal_land {
            Classification::OnTribalLand
        } else {
            Classification::NotOnTribalLand
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Counts of each classification across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub on_tribal_land: usize,
    pub not_on_tribal_land: usize,
    pub geocode_failed: usize,
    pub no_address_data: usize,
}

impl ClassificationSummary {
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::OnTribalLand => self.on_tribal_land += 1,
            Classification::NotOnTribalLand => self.not_on_tribal_land += 1,
            Classification::GeocodeFailed => self.geocode_failed += 1,
            Classification::NoAddressData => self.no_address_data += 1,
        }
    }

    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::OnTribalLand => self.on_tribal_land,
            Classification::NotOnTribalLand => self.not_on_tribal_land,
            Classification::GeocodeFailed => self.geocode_failed,
            Classification::NoAddressData => self.no_address_data,
        }
    }

    pub fn total(&self) -> usize {
        self.on_tribal_land + self.not_on_tribal_land + self.geocode_failed + self.no_address_data
    }
}

impl FromIterator<Classification> for ClassificationSummary {
    fn from_iter<I: IntoIterator<Item = Classification>>(iter: I) -> Self {
        let mut summary = Self::default();
        for c in iter {
            summary.record(c);
        }
        summary
    }
}
