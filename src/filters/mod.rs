//! Vehicle list filters sent to the service as query parameters.

use crate::api::Vehicle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three free-text filter fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Brand,
    Model,
    Year,
}

impl FilterField {
    /// Query parameter name understood by the service.
    pub fn query_key(&self) -> &'static str {
        match self {
            FilterField::Brand => "brand",
            FilterField::Model => "model",
            FilterField::Year => "year",
        }
    }

    pub fn all() -> &'static [FilterField] {
        &[FilterField::Brand, FilterField::Model, FilterField::Year]
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_key())
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "brand" | "marca" => Ok(FilterField::Brand),
            "model" | "modelo" => Ok(FilterField::Model),
            "year" | "ano" | "año" => Ok(FilterField::Year),
            _ => Err(format!("Unknown filter field: {}. Use: brand, model, year", s)),
        }
    }
}

/// Filter state. Empty fields are omitted from the request; the service
/// combines the rest conjunctively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleFilter {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: String,
}

impl VehicleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }

    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::Brand => &self.brand,
            FilterField::Model => &self.model,
            FilterField::Year => &self.year,
        }
    }

    /// Sets a field, returning true when the value actually changed.
    pub fn set(&mut self, field: FilterField, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = match field {
            FilterField::Brand => &mut self.brand,
            FilterField::Model => &mut self.model,
            FilterField::Year => &mut self.year,
        };

        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    /// Non-empty fields as `(key, trimmed value)` pairs.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        FilterField::all()
            .iter()
            .filter_map(|field| {
                let value = self.get(*field).trim();
                (!value.is_empty()).then_some((field.query_key(), value))
            })
            .collect()
    }

    /// URL-encoded query string without the leading `?`.
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }

    /// Mirrors the service's matching: case-insensitive substrings for brand
    /// and model, exact year.
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        let contains = |haystack: &str, needle: &str| {
            let needle = needle.trim();
            needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
        };

        let year = self.year.trim();
        contains(&vehicle.brand, &self.brand)
            && contains(&vehicle.model, &self.model)
            && (year.is_empty() || vehicle.year.to_string() == year)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.query_pairs().into_iter().map(|(key, value)| format!("{}: {}", key, value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn corolla() -> Vehicle {
        Vehicle::new("Toyota", "Corolla", 2020, dec!(20000), "USA", "")
    }

    #[test]
    fn test_empty_filter_has_no_query() {
        let filter = VehicleFilter::new();
        assert!(filter.is_empty());
        assert!(filter.query_pairs().is_empty());
        assert_eq!(filter.query_string(), "");
    }

    #[test]
    fn test_blank_fields_omitted() {
        let filter = VehicleFilter::new().brand("Toyota").model("   ").year("");
        assert_eq!(filter.query_pairs(), vec![("brand", "Toyota")]);
        assert_eq!(filter.query_string(), "brand=Toyota");
    }

    #[test]
    fn test_all_fields_in_order() {
        let filter = VehicleFilter::new().year("2020").model("Corolla").brand(" Toyota ");
        assert_eq!(filter.query_string(), "brand=Toyota&model=Corolla&year=2020");
    }

    #[test]
    fn test_query_values_encoded() {
        let filter = VehicleFilter::new().brand("Mercedes Benz").model("C&K");
        assert_eq!(filter.query_string(), "brand=Mercedes%20Benz&model=C%26K");
    }

    #[test]
    fn test_set_reports_change() {
        let mut filter = VehicleFilter::new();
        assert!(filter.set(FilterField::Brand, "Kia"));
        assert!(!filter.set(FilterField::Brand, "Kia"));
        assert!(filter.set(FilterField::Brand, ""));
        assert_eq!(filter.get(FilterField::Brand), "");
    }

    #[test]
    fn test_matches_substring_case_insensitive() {
        let vehicle = corolla();
        assert!(VehicleFilter::new().matches(&vehicle));
        assert!(VehicleFilter::new().brand("toy").matches(&vehicle));
        assert!(VehicleFilter::new().model("ROLL").matches(&vehicle));
        assert!(!VehicleFilter::new().brand("honda").matches(&vehicle));
    }

    #[test]
    fn test_matches_year_exact_and_conjunctive() {
        let vehicle = corolla();
        assert!(VehicleFilter::new().year("2020").matches(&vehicle));
        assert!(!VehicleFilter::new().year("202").matches(&vehicle));
        assert!(!VehicleFilter::new().brand("Toyota").year("2019").matches(&vehicle));
    }

    #[test]
    fn test_filter_field_parsing() {
        assert_eq!("brand".parse::<FilterField>().unwrap(), FilterField::Brand);
        assert_eq!("Marca".parse::<FilterField>().unwrap(), FilterField::Brand);
        assert_eq!("modelo".parse::<FilterField>().unwrap(), FilterField::Model);
        assert_eq!("YEAR".parse::<FilterField>().unwrap(), FilterField::Year);
        assert!("color".parse::<FilterField>().unwrap_err().contains("Unknown filter field"));
    }

    #[test]
    fn test_descriptions() {
        let filter = VehicleFilter::new().brand("Toyota").year("2020");
        assert_eq!(filter.descriptions(), vec!["brand: Toyota", "year: 2020"]);
    }
}
