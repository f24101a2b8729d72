use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::dates::{is_weekend_night, StayRange};
use crate::domain::property::{Property, PropertyId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightlyRate {
    pub date: NaiveDate,
    pub weekend: bool,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayQuote {
    pub property_id: PropertyId,
    pub currency: String,
    #[serde(flatten)]
    pub stay: StayRange,
    pub guests: u32,
    pub nights: u32,
    pub subtotal: Decimal,
    pub cleaning_fee: Decimal,
    pub service_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub nightly: Vec<NightlyRate>,
}

pub trait PricingEngine: Send + Sync {
    fn quote(
        &self,
        property: &Property,
        stay: &StayRange,
        guests: u32,
    ) -> Result<StayQuote, DomainError>;
}

/// Base rate on weekdays, base rate times the property's weekend multiplier
/// on Friday, Saturday and Sunday nights.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeekendAwarePricingEngine;

impl PricingEngine for WeekendAwarePricingEngine {
    fn quote(
        &self,
        property: &Property,
        stay: &StayRange,
        guests: u32,
    ) -> Result<StayQuote, DomainError> {
        property.validate_stay(stay, guests)?;
        Ok(price_stay(property, stay, guests))
    }
}

pub fn nightly_rate(property: &Property, date: NaiveDate) -> NightlyRate {
    let weekend = is_weekend_night(date);
    let amount =
        if weekend { property.base_price * property.weekend_multiplier } else { property.base_price };
    NightlyRate { date, weekend, amount }
}

/// Prices a stay without applying house rules. Amounts are exact; nothing is
/// rounded until a payment is compared against the total.
pub fn price_stay(property: &Property, stay: &StayRange, guests: u32) -> StayQuote {
    let nightly: Vec<NightlyRate> = stay.dates().map(|date| nightly_rate(property, date)).collect();
    let subtotal: Decimal = nightly.iter().map(|night| night.amount).sum();

    let taxable = subtotal + property.cleaning_fee + property.service_fee;
    let tax = taxable * property.tax_rate;
    let total = taxable + tax;

    StayQuote {
        property_id: property.id.clone(),
        currency: property.currency.clone(),
        stay: *stay,
        guests,
        nights: stay.nights(),
        subtotal,
        cleaning_fee: property.cleaning_fee,
        service_fee: property.service_fee,
        tax,
        total,
        nightly,
    }
}

/// Platform cut of a booking total, rounded half away from zero to the cent.
pub fn commission_for(total: Decimal, rate: Decimal) -> Decimal {
    (total * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{commission_for, price_stay, PricingEngine, WeekendAwarePricingEngine};
    use crate::dates::StayRange;
    use crate::domain::property::fixtures::lakeside_cabin;

    fn stay(check_in: &str, check_out: &str) -> StayRange {
        StayRange::parse(check_in, check_out).expect("stay")
    }

    #[test]
    fn weekday_stay_matches_reference_quote() {
        // Monday -> Wednesday.
        let quote = WeekendAwarePricingEngine
            .quote(&lakeside_cabin(), &stay("2026-01-05", "2026-01-07"), 2)
            .expect("quote");

        assert_eq!(quote.nights, 2);
        assert_eq!(quote.subtotal, Decimal::new(200, 0));
        assert_eq!(quote.tax, Decimal::new(1500, 2));
        assert_eq!(quote.total, Decimal::new(25500, 2));
        assert!(quote.nightly.iter().all(|night| !night.weekend));
    }

    #[test]
    fn weekend_stay_applies_multiplier_to_every_night() {
        // Friday -> Sunday.
        let quote = WeekendAwarePricingEngine
            .quote(&lakeside_cabin(), &stay("2026-01-09", "2026-01-11"), 2)
            .expect("quote");

        assert_eq!(quote.subtotal, Decimal::new(240, 0));
        assert_eq!(quote.tax, Decimal::new(1750, 2));
        assert_eq!(quote.total, Decimal::new(29750, 2));
        assert!(quote.nightly.iter().all(|night| night.weekend));
    }

    #[test]
    fn subtotal_is_sum_of_nightly_rates_across_mixed_weeks() {
        let mut property = lakeside_cabin();
        property.base_price = Decimal::new(8999, 2);
        property.weekend_multiplier = Decimal::new(135, 2);

        for (check_in, check_out) in
            [("2026-01-01", "2026-01-15"), ("2026-02-26", "2026-03-03"), ("2026-06-12", "2026-06-13")]
        {
            let stay = stay(check_in, check_out);
            let quote = price_stay(&property, &stay, 1);

            let expected: Decimal = stay
                .dates()
                .map(|date| {
                    if crate::dates::is_weekend_night(date) {
                        property.base_price * property.weekend_multiplier
                    } else {
                        property.base_price
                    }
                })
                .sum();
            assert_eq!(quote.subtotal, expected);
            assert_eq!(quote.nightly.len() as u32, quote.nights);

            let taxable = quote.subtotal + quote.cleaning_fee + quote.service_fee;
            assert_eq!(quote.tax, taxable * property.tax_rate);
            assert_eq!(quote.total, taxable + quote.tax);
        }
    }

    #[test]
    fn engine_applies_house_rules_before_pricing() {
        let result = WeekendAwarePricingEngine.quote(
            &lakeside_cabin(),
            &stay("2026-01-05", "2026-01-07"),
            9,
        );
        assert!(result.is_err());
    }

    #[test]
    fn commission_rounds_to_cents() {
        assert_eq!(commission_for(Decimal::new(25500, 2), Decimal::new(15, 2)), Decimal::new(3825, 2));
        assert_eq!(commission_for(Decimal::new(29750, 2), Decimal::new(15, 2)), Decimal::new(4463, 2));
    }
}
