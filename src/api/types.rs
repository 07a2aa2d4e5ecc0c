//! Data types exchanged with the external property backend.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Core facts about a property, as returned by `GET property/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub beds: u32,
    /// Half-baths count as 0.5.
    pub baths: f32,
    pub sqft: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<u32>,
    /// Automated valuation estimate.
    pub estimated_value: Decimal,
}

impl PropertyInfo {
    /// Single-line display address.
    pub fn display_address(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.address, self.city, self.state, self.zip
        )
    }
}

/// Market analytics for a property's area, from `GET property/{id}/facts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyFacts {
    pub property_id: String,
    pub median_sale_price: Decimal,
    pub price_per_sqft: Decimal,
    pub avg_days_on_market: u32,
    /// Year-over-year price change, percent.
    pub yoy_price_change_pct: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_months: Option<f32>,
}

/// A nearby recently-sold or active listing used for comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparableListing {
    pub id: String,
    pub address: String,
    pub price: Decimal,
    pub beds: u32,
    pub baths: f32,
    pub sqft: u32,
    pub distance_miles: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_on: Option<NaiveDate>,
}

/// Acknowledgement for an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAck {
    pub file_id: String,
    pub property_id: String,
    /// Wizard step the upload belongs to.
    pub step: usize,
    pub received_at: DateTime<Utc>,
}
