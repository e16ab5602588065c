//! Per-vehicle tax quote: breakdown plus local-currency total.

use crate::api::Vehicle;
use crate::tax::{convert, Conversion, TaxBreakdown, TaxError, TaxSchedule};
use rust_decimal::Decimal;
use serde::Serialize;

/// Tax breakdown for one vehicle with its total converted to local currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub vehicle: Vehicle,
    pub taxes: TaxBreakdown,
    pub local_currency: String,
    pub local_total: Conversion,
}

impl Quote {
    pub fn build(
        vehicle: &Vehicle,
        schedule: &TaxSchedule,
        rate: Option<Decimal>,
        local_currency: &str,
    ) -> Result<Self, TaxError> {
        let taxes = schedule.compute(vehicle.declared_value)?;
        let local_total = convert(taxes.total_general, rate);

        Ok(Self {
            vehicle: vehicle.clone(),
            taxes,
            local_currency: local_currency.to_string(),
            local_total,
        })
    }
}

/// Builds quotes for every vehicle, stopping at the first invalid value.
pub fn quote_all<'a>(
    vehicles: impl IntoIterator<Item = &'a Vehicle>,
    schedule: &TaxSchedule,
    rate: Option<Decimal>,
    local_currency: &str,
) -> Result<Vec<Quote>, TaxError> {
    vehicles.into_iter().map(|v| Quote::build(v, schedule, rate, local_currency)).collect()
}
