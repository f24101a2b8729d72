use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::StayRange;
use crate::domain::account::AccountId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: AccountId,
    pub title: String,
    pub currency: String,
    pub base_price: Decimal,
    pub cleaning_fee: Decimal,
    pub service_fee: Decimal,
    pub tax_rate: Decimal,
    pub weekend_multiplier: Decimal,
    pub min_nights: u32,
    pub max_nights: u32,
    pub max_guests: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn is_owned_by(&self, account_id: &AccountId) -> bool {
        &self.owner_id == account_id
    }

    /// House rules a stay must satisfy before it can be quoted or booked.
    pub fn validate_stay(&self, stay: &StayRange, guests: u32) -> Result<(), DomainError> {
        let nights = stay.nights();
        if nights < self.min_nights {
            return Err(DomainError::validation(format!(
                "minimum stay is {} nights, requested {nights}",
                self.min_nights
            )));
        }
        if nights > self.max_nights {
            return Err(DomainError::validation(format!(
                "maximum stay is {} nights, requested {nights}",
                self.max_nights
            )));
        }
        if guests == 0 {
            return Err(DomainError::validation("at least one guest is required"));
        }
        if guests > self.max_guests {
            return Err(DomainError::validation(format!(
                "property accommodates at most {} guests, requested {guests}",
                self.max_guests
            )));
        }
        Ok(())
    }

    /// Pricing fields are host-editable, so they are checked on every write.
    pub fn validate_pricing(&self) -> Result<(), DomainError> {
        if self.base_price <= Decimal::ZERO {
            return Err(DomainError::validation("base price must be positive"));
        }
        if self.cleaning_fee < Decimal::ZERO || self.service_fee < Decimal::ZERO {
            return Err(DomainError::validation("fees cannot be negative"));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(DomainError::validation("tax rate must be in range 0..1"));
        }
        if self.weekend_multiplier < Decimal::ONE {
            return Err(DomainError::validation("weekend multiplier cannot be below 1"));
        }
        if self.min_nights == 0 || self.min_nights > self.max_nights {
            return Err(DomainError::validation("night limits must satisfy 1 <= min <= max"));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::fixtures::lakeside_cabin;
    use crate::dates::StayRange;

    #[test]
    fn stay_rules_enforce_night_and_guest_limits() {
        let mut property = lakeside_cabin();
        property.min_nights = 2;
        property.max_nights = 5;

        let one_night = StayRange::parse("2026-01-05", "2026-01-06").expect("stay");
        let three_nights = StayRange::parse("2026-01-05", "2026-01-08").expect("stay");
        let week = StayRange::parse("2026-01-05", "2026-01-12").expect("stay");

        assert!(property.validate_stay(&one_night, 2).is_err());
        assert!(property.validate_stay(&week, 2).is_err());
        assert!(property.validate_stay(&three_nights, 0).is_err());
        assert!(property.validate_stay(&three_nights, 5).is_err());
        assert!(property.validate_stay(&three_nights, 4).is_ok());
    }

    #[test]
    fn pricing_validation_rejects_discounting_weekend_multiplier() {
        let mut property = lakeside_cabin();
        assert!(property.validate_pricing().is_ok());

        property.weekend_multiplier = Decimal::new(9, 1);
        assert!(property.validate_pricing().is_err());
    }
}
