use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scoring::HazardScore;
use crate::types::ContractId;

/// A geolocated insurance contract.
///
/// The engine reads contracts and never mutates them; `risk_data` is the
/// slot where callers cache a previously computed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// `None` until the address has been geocoded.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub sum_insured: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub object_type: String,
    pub region_id: Option<String>,
    #[serde(default)]
    pub risk_data: Option<HazardScore>,
}

impl Contract {
    pub fn new(id: ContractId, sum_insured: f64) -> Self {
        Contract {
            id,
            latitude: None,
            longitude: None,
            sum_insured,
            start_date: None,
            end_date: None,
            active: true,
            object_type: String::new(),
            region_id: None,
            risk_data: None,
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn starting(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    /// `(lat, lon)` when both are present and finite.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    /// Insured sum usable as exposure; negative or non-finite amounts count as zero.
    pub fn exposure(&self) -> f64 {
        if self.sum_insured.is_finite() && self.sum_insured > 0.0 {
            self.sum_insured
        } else {
            0.0
        }
    }

    /// Active and `date` within the closed coverage interval. Open ends are unbounded.
    pub fn in_force_on(&self, date: NaiveDate) -> bool {
        self.active
            && self.start_date.is_none_or(|s| s <= date)
            && self.end_date.is_none_or(|e| date <= e)
    }
}
