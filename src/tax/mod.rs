//! Import-tax calculation and currency conversion.

pub mod currency;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use currency::{convert, format_amount, format_money, format_plain, Conversion, ExchangeRate};

/// Plate registration rate applied to the declared value.
pub const PLATE_RATE: Decimal = dec!(0.17);
/// CO2 emissions levy rate.
pub const CO2_RATE: Decimal = dec!(0.03);
/// ITBIS (value-added tax) rate.
pub const ITBIS_RATE: Decimal = dec!(0.18);
/// Gravamen (import tariff) rate.
pub const TARIFF_RATE: Decimal = dec!(0.20);
/// Marbete: flat sticker fee, not scaled by currency.
pub const STICKER_FEE: Decimal = dec!(3000);

/// Errors raised while computing a tax breakdown.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxError {
    #[error("declared value must not be negative (got {0})")]
    NegativeValue(Decimal),
    #[error("declared value {0} is too large to tax")]
    Overflow(Decimal),
}

/// Rates used to derive a [`TaxBreakdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSchedule {
    #[serde(default = "default_plate")]
    pub plate: Decimal,
    #[serde(default = "default_co2")]
    pub co2: Decimal,
    #[serde(default = "default_itbis")]
    pub itbis: Decimal,
    #[serde(default = "default_tariff")]
    pub tariff: Decimal,
    #[serde(default = "default_sticker")]
    pub sticker: Decimal,
}

fn default_plate() -> Decimal {
    PLATE_RATE
}

fn default_co2() -> Decimal {
    CO2_RATE
}

fn default_itbis() -> Decimal {
    ITBIS_RATE
}

fn default_tariff() -> Decimal {
    TARIFF_RATE
}

fn default_sticker() -> Decimal {
    STICKER_FEE
}

impl Default for TaxSchedule {
    fn default() -> Self {
        Self {
            plate: PLATE_RATE,
            co2: CO2_RATE,
            itbis: ITBIS_RATE,
            tariff: TARIFF_RATE,
            sticker: STICKER_FEE,
        }
    }
}

impl TaxSchedule {
    /// Computes the breakdown for a declared USD value.
    ///
    /// Arithmetic is exact; rounding is left to the display layer.
    pub fn compute(&self, declared_value: Decimal) -> Result<TaxBreakdown, TaxError> {
        if declared_value.is_sign_negative() && !declared_value.is_zero() {
            return Err(TaxError::NegativeValue(declared_value));
        }

        let overflow = || TaxError::Overflow(declared_value);
        let levy = |rate: Decimal| declared_value.checked_mul(rate).ok_or_else(overflow);

        let plate = levy(self.plate)?;
        let co2 = levy(self.co2)?;
        let itbis = levy(self.itbis)?;
        let tariff = levy(self.tariff)?;
        let total_taxes = tariff
            .checked_add(itbis)
            .and_then(|sum| sum.checked_add(co2))
            .ok_or_else(overflow)?;
        let total_general = declared_value
            .checked_add(total_taxes)
            .and_then(|sum| sum.checked_add(plate))
            .ok_or_else(overflow)?;

        Ok(TaxBreakdown {
            declared_value,
            plate,
            co2,
            itbis,
            tariff,
            sticker: self.sticker,
            total_taxes,
            total_general,
        })
    }
}

/// Derived tax line items for one vehicle. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxBreakdown {
    pub declared_value: Decimal,
    pub plate: Decimal,
    pub co2: Decimal,
    pub itbis: Decimal,
    pub tariff: Decimal,
    pub sticker: Decimal,
    pub total_taxes: Decimal,
    pub total_general: Decimal,
}

/// Computes a breakdown with the default schedule.
pub fn calculate(declared_value: Decimal) -> Result<TaxBreakdown, TaxError> {
    TaxSchedule::default().compute(declared_value)
}
