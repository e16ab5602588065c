//! Wire payloads from the vehicle service and the local row shape.

use crate::tax;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// `GET /vehicles` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct VehiclesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<VehicleRecord>,
}

/// `GET /exchange-rate` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub rate: Option<Value>,
}

impl ExchangeRateResponse {
    /// Returns the rate when it is present and strictly positive.
    pub fn usable_rate(&self) -> Option<Decimal> {
        self.rate.as_ref().and_then(decimal_from_value).filter(|r| *r > Decimal::ZERO)
    }
}

/// One vehicle row as the service sends it. Numeric fields may be strings;
/// text fields may be null.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(rename = "Marca", default, deserialize_with = "null_as_empty")]
    pub brand: String,
    #[serde(rename = "Modelo", default, deserialize_with = "null_as_empty")]
    pub model: String,
    #[serde(rename = "Año", default)]
    pub year: Value,
    #[serde(rename = "Valor", default)]
    pub value: Value,
    #[serde(rename = "Pais", default, deserialize_with = "null_as_empty")]
    pub country: String,
    #[serde(rename = "Especificaciones", default, deserialize_with = "null_as_empty")]
    pub specifications: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stable identity for a vehicle row, used as the selection key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleKey(String);

impl VehicleKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A vehicle listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub key: VehicleKey,
    pub brand: String,
    pub model: String,
    pub year: i32,
    /// Declared value in USD, the tax base.
    pub declared_value: Decimal,
    pub country: String,
    pub specifications: String,
}

impl Vehicle {
    /// Builds a vehicle whose key is derived from its content.
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        year: i32,
        declared_value: Decimal,
        country: impl Into<String>,
        specifications: impl Into<String>,
    ) -> Self {
        let brand = brand.into();
        let model = model.into();
        let country = country.into();
        let specifications = specifications.into();
        let key = content_key(&brand, &model, year, declared_value, &country, &specifications);

        Self { key, brand, model, year, declared_value, country, specifications }
    }

    /// Replaces the derived key with a backend-supplied identifier.
    pub fn with_key(mut self, key: VehicleKey) -> Self {
        self.key = key;
        self
    }

    /// `Toyota Corolla (2020) USA`; unknown year and country are left out.
    pub fn label(&self) -> String {
        let mut label = format!("{} {}", self.brand, self.model).trim().to_string();
        if self.year > 0 {
            label.push_str(&format!(" ({})", self.year));
        }
        if !self.country.is_empty() {
            label.push(' ');
            label.push_str(&self.country);
        }
        label
    }
}

impl TryFrom<VehicleRecord> for Vehicle {
    type Error = String;

    fn try_from(record: VehicleRecord) -> Result<Self, Self::Error> {
        let declared_value = decimal_from_value(&record.value)
            .ok_or_else(|| format!("unreadable value {}", record.value))?;
        if declared_value.is_sign_negative() && !declared_value.is_zero() {
            return Err(format!("negative value {}", declared_value));
        }
        if tax::calculate(declared_value).is_err() {
            return Err(format!("value {} too large to tax", declared_value));
        }

        let year = year_from_value(&record.year)
            .ok_or_else(|| format!("unreadable year {}", record.year))?;

        let vehicle = Vehicle::new(
            record.brand.trim(),
            record.model.trim(),
            year,
            declared_value,
            record.country.trim(),
            record.specifications.trim(),
        );

        Ok(match record.id.as_ref().and_then(id_from_value) {
            Some(id) => vehicle.with_key(VehicleKey::new(id)),
            None => vehicle,
        })
    }
}

/// Maps service rows to vehicles, dropping rows that cannot be taxed.
///
/// Repeated keys get an occurrence suffix (`#2`, `#3`, ...) so identical
/// rows stay individually selectable.
pub fn vehicles_from_records(records: Vec<VehicleRecord>) -> Vec<Vehicle> {
    let mut occurrences: HashMap<VehicleKey, usize> = HashMap::new();

    records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match Vehicle::try_from(record) {
            Ok(vehicle) => Some(vehicle),
            Err(reason) => {
                warn!("Skipping vehicle row {}: {}", idx, reason);
                None
            }
        })
        .map(|vehicle| {
            let seen = occurrences.entry(vehicle.key.clone()).or_insert(0);
            *seen += 1;
            if *seen > 1 {
                let key = VehicleKey(format!("{}#{}", vehicle.key, seen));
                vehicle.with_key(key)
            } else {
                vehicle
            }
        })
        .collect()
}

fn content_key(
    brand: &str,
    model: &str,
    year: i32,
    value: Decimal,
    country: &str,
    specifications: &str,
) -> VehicleKey {
    VehicleKey(format!(
        "{}|{}|{}|{}|{}|{}",
        brand.to_lowercase(),
        model.to_lowercase(),
        year,
        value.normalize(),
        country.to_lowercase(),
        specifications.to_lowercase()
    ))
}

/// Reads a decimal from a JSON number or numeric string.
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
}

fn year_from_value(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
