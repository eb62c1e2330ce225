use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub food_name: String,
    pub serving_count: u32,
    pub image_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub food_name: String,
    pub serving_count: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewDonation {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.food_name.trim().is_empty() {
            return Err(DomainError::validation("food name must not be blank"));
        }
        if self.serving_count <= 0 || self.serving_count > i64::from(u32::MAX) {
            return Err(DomainError::validation(
                "serving count must be a positive integer",
            ));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(DomainError::validation(
                "latitude must be between -90 and 90",
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(DomainError::validation(
                "longitude must be between -180 and 180",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donation() -> NewDonation {
        NewDonation {
            food_name: "Dal".into(),
            serving_count: 4,
            latitude: 17.44,
            longitude: 78.48,
        }
    }

    #[test]
    fn accepts_a_well_formed_donation() {
        assert!(donation().validate().is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        let blank = NewDonation {
            food_name: "   ".into(),
            ..donation()
        };
        let zero = NewDonation {
            serving_count: 0,
            ..donation()
        };
        let off_map = NewDonation {
            latitude: 91.0,
            ..donation()
        };
        let nan = NewDonation {
            longitude: f64::NAN,
            ..donation()
        };
        for bad in [blank, zero, off_map, nan] {
            assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));
        }
    }
}
