//! Filter, fetch, and selection state for the vehicle view.
//!
//! The session never performs I/O itself. Filter edits return a
//! [`FetchPlan`] naming the requests to issue; callers run them however they
//! like and feed results back through [`Session::apply_vehicles`] and
//! [`Session::apply_rate`]. Every request carries a generation number so a
//! response that was overtaken by a newer request is dropped.

pub mod selection;

pub use selection::Selection;

use crate::api::{ApiError, Vehicle, VehicleApi, VehicleKey};
use crate::filters::{FilterField, VehicleFilter};
use crate::quote::{quote_all, Quote};
use crate::tax::{TaxError, TaxSchedule};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// A vehicle-list request to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleFetch {
    pub generation: u64,
    pub filter: VehicleFilter,
}

/// An exchange-rate request to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateFetch {
    pub generation: u64,
}

/// Both requests triggered by a filter change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub vehicles: VehicleFetch,
    pub rate: RateFetch,
}

/// What happened to a response handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// A newer request was issued after this one.
    Stale,
    /// The request failed; previous state kept.
    Failed,
}

/// State behind the vehicle view.
#[derive(Debug, Clone, Default)]
pub struct Session {
    filter: VehicleFilter,
    vehicles: Vec<Vehicle>,
    rate: Option<Decimal>,
    selection: Selection,
    vehicles_issued: u64,
    rate_issued: u64,
    rate_applied: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: VehicleFilter) -> Self {
        Self { filter, ..Self::default() }
    }

    pub fn filter(&self) -> &VehicleFilter {
        &self.filter
    }

    /// Current vehicle snapshot, in service order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Loaded exchange rate, if any.
    pub fn rate(&self) -> Option<Decimal> {
        self.rate
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Updates one filter field. Returns the requests to issue, or `None`
    /// if the value did not change.
    pub fn set_filter(
        &mut self,
        field: FilterField,
        value: impl Into<String>,
    ) -> Option<FetchPlan> {
        if !self.filter.set(field, value) {
            return None;
        }
        debug!("Filter {} set to {:?}", field, self.filter.get(field));
        Some(self.refresh())
    }

    /// Issues a fresh vehicle request for the current filter and a rate request.
    pub fn refresh(&mut self) -> FetchPlan {
        self.vehicles_issued += 1;
        self.rate_issued += 1;

        FetchPlan {
            vehicles: VehicleFetch {
                generation: self.vehicles_issued,
                filter: self.filter.clone(),
            },
            rate: RateFetch { generation: self.rate_issued },
        }
    }

    /// Applies a vehicle-list response. Only the latest issued request may
    /// replace the snapshot, so the table always matches the current filter.
    pub fn apply_vehicles(
        &mut self,
        generation: u64,
        result: Result<Vec<Vehicle>, ApiError>,
    ) -> Applied {
        if generation != self.vehicles_issued {
            debug!(
                "Discarding vehicle response {} (latest is {})",
                generation, self.vehicles_issued
            );
            return Applied::Stale;
        }

        match result {
            Ok(vehicles) => {
                info!("Loaded {} vehicles", vehicles.len());
                self.vehicles = vehicles;
                Applied::Updated
            }
            Err(e) => {
                warn!("Vehicle request failed: {}", e);
                Applied::Failed
            }
        }
    }

    /// Applies an exchange-rate response. The rate does not depend on the
    /// filter, so any response newer than the last applied one is accepted.
    pub fn apply_rate(&mut self, generation: u64, result: Result<Decimal, ApiError>) -> Applied {
        if generation <= self.rate_applied {
            debug!("Discarding rate response {} (applied {})", generation, self.rate_applied);
            return Applied::Stale;
        }

        match result {
            Ok(rate) if rate > Decimal::ZERO => {
                self.rate = Some(rate);
                self.rate_applied = generation;
                Applied::Updated
            }
            Ok(rate) => {
                warn!("Ignoring non-positive exchange rate {}", rate);
                Applied::Failed
            }
            Err(e) => {
                warn!("Exchange rate request failed: {}", e);
                Applied::Failed
            }
        }
    }

    /// Runs a plan against `api`, both requests concurrently, and applies
    /// the results.
    pub async fn execute(&mut self, api: &impl VehicleApi, plan: FetchPlan) -> (Applied, Applied) {
        let (vehicles, rate) =
            tokio::join!(api.vehicles(&plan.vehicles.filter), api.exchange_rate());

        (
            self.apply_vehicles(plan.vehicles.generation, vehicles),
            self.apply_rate(plan.rate.generation, rate),
        )
    }

    /// Key of the vehicle at a 1-based row in the current snapshot.
    pub fn key_at(&self, row: usize) -> Option<&VehicleKey> {
        row.checked_sub(1).and_then(|idx| self.vehicles.get(idx)).map(|v| &v.key)
    }

    /// Selects 1-based rows of the current snapshot. Rows are resolved to
    /// stable keys immediately; out-of-range rows are returned as errors.
    pub fn select_rows(&mut self, rows: &[usize]) -> Result<usize, Vec<usize>> {
        let (keys, invalid) = self.resolve_rows(rows);
        if !invalid.is_empty() {
            return Err(invalid);
        }
        Ok(keys.into_iter().filter(|key| self.selection.select(key.clone())).count())
    }

    /// Deselects 1-based rows of the current snapshot.
    pub fn deselect_rows(&mut self, rows: &[usize]) -> Result<usize, Vec<usize>> {
        let (keys, invalid) = self.resolve_rows(rows);
        if !invalid.is_empty() {
            return Err(invalid);
        }
        Ok(keys.iter().filter(|key| self.selection.deselect(key)).count())
    }

    pub fn select_key(&mut self, key: VehicleKey) -> bool {
        self.selection.select(key)
    }

    /// Selects every vehicle in the current snapshot.
    pub fn select_all(&mut self) -> usize {
        let keys: Vec<VehicleKey> = self.vehicles.iter().map(|v| v.key.clone()).collect();
        keys.into_iter().filter(|key| self.selection.select(key.clone())).count()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected vehicles present in the current snapshot.
    pub fn selected_vehicles(&self) -> Vec<&Vehicle> {
        self.selection.resolve(&self.vehicles)
    }

    /// Selected keys with no row in the current snapshot.
    pub fn missing_selected(&self) -> usize {
        self.selection.missing(&self.vehicles)
    }

    /// Quotes for the selected vehicles, recomputed on every call.
    pub fn quotes(
        &self,
        schedule: &TaxSchedule,
        local_currency: &str,
    ) -> Result<Vec<Quote>, TaxError> {
        quote_all(self.selected_vehicles(), schedule, self.rate, local_currency)
    }

    fn resolve_rows(&self, rows: &[usize]) -> (Vec<VehicleKey>, Vec<usize>) {
        let mut keys = Vec::with_capacity(rows.len());
        let mut invalid = Vec::new();

        for &row in rows {
            match self.key_at(row) {
                Some(key) => keys.push(key.clone()),
                None => invalid.push(row),
            }
        }

        (keys, invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    fn fleet() -> Vec<Vehicle> {
        vec![
            Vehicle::new("Toyota", "Corolla", 2020, dec!(20000), "USA", "1.8L"),
            Vehicle::new("Toyota", "RAV4", 2021, dec!(32000), "Japan", "AWD"),
            Vehicle::new("Honda", "Civic", 2019, dec!(18000), "Japan", ""),
        ]
    }

    struct MockApi {
        vehicles: Vec<Vehicle>,
        rate: Option<Decimal>,
    }

    #[async_trait]
    impl VehicleApi for MockApi {
        async fn vehicles(
            &self,
            filter: &VehicleFilter,
        ) -> crate::api::error::Result<Vec<Vehicle>> {
            Ok(self.vehicles.iter().filter(|v| filter.matches(v)).cloned().collect())
        }

        async fn exchange_rate(&self) -> crate::api::error::Result<Decimal> {
            self.rate.ok_or(ApiError::MissingRate)
        }
    }

    #[test]
    fn test_set_filter_issues_plan() {
        let mut session = Session::new();
        let plan = session.set_filter(FilterField::Brand, "Toyota").unwrap();
        assert_eq!(plan.vehicles.generation, 1);
        assert_eq!(plan.rate.generation, 1);
        assert_eq!(plan.vehicles.filter.brand, "Toyota");

        // Unchanged value issues nothing
        assert!(session.set_filter(FilterField::Brand, "Toyota").is_none());

        let plan = session.set_filter(FilterField::Year, "2020").unwrap();
        assert_eq!(plan.vehicles.generation, 2);
        assert_eq!(plan.vehicles.filter.query_string(), "brand=Toyota&year=2020");
    }

    #[test]
    fn test_superseded_vehicle_response_discarded() {
        let mut session = Session::new();
        let first = session.set_filter(FilterField::Brand, "Hon").unwrap();
        let second = session.set_filter(FilterField::Brand, "Toyota").unwrap();

        let data = fleet();
        let toyotas: Vec<Vehicle> = data[..2].to_vec();
        let hondas: Vec<Vehicle> = data[2..].to_vec();

        let applied = session.apply_vehicles(second.vehicles.generation, Ok(toyotas));
        assert_eq!(applied, Applied::Updated);
        // The slower, older response arrives last
        assert_eq!(session.apply_vehicles(first.vehicles.generation, Ok(hondas)), Applied::Stale);

        assert_eq!(session.vehicles().len(), 2);
        assert!(session.vehicles().iter().all(|v| v.brand == "Toyota"));
    }

    #[test]
    fn test_older_response_before_newer_is_also_dropped() {
        let mut session = Session::new();
        let first = session.refresh();
        let _second = session.refresh();

        assert_eq!(session.apply_vehicles(first.vehicles.generation, Ok(fleet())), Applied::Stale);
        assert!(session.vehicles().is_empty());
    }

    #[test]
    fn test_failure_keeps_previous_snapshot() {
        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(fleet()));

        let plan = session.refresh();
        let result = session.apply_vehicles(
            plan.vehicles.generation,
            Err(ApiError::Unsuccessful("http://test/vehicles".to_string())),
        );
        assert_eq!(result, Applied::Failed);
        assert_eq!(session.vehicles().len(), 3);
    }

    #[test]
    fn test_rate_ordering() {
        let mut session = Session::new();
        let first = session.refresh();
        let second = session.refresh();

        assert_eq!(session.apply_rate(second.rate.generation, Ok(dec!(59.1))), Applied::Updated);
        assert_eq!(session.apply_rate(first.rate.generation, Ok(dec!(58.5))), Applied::Stale);
        assert_eq!(session.rate(), Some(dec!(59.1)));
    }

    #[test]
    fn test_rate_failure_leaves_unset() {
        let mut session = Session::new();
        let plan = session.refresh();
        let applied = session.apply_rate(plan.rate.generation, Err(ApiError::MissingRate));
        assert_eq!(applied, Applied::Failed);
        assert!(session.rate().is_none());

        let plan = session.refresh();
        assert_eq!(session.apply_rate(plan.rate.generation, Ok(Decimal::ZERO)), Applied::Failed);
        assert!(session.rate().is_none());
    }

    #[test]
    fn test_select_rows_and_clear() {
        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(fleet()));

        assert_eq!(session.select_rows(&[1, 3]), Ok(2));
        assert_eq!(session.select_rows(&[1]), Ok(0));
        assert_eq!(session.selected_vehicles().len(), 2);

        session.clear_selection();
        assert!(session.selection().is_empty());
        assert!(session.selected_vehicles().is_empty());
    }

    #[test]
    fn test_select_rows_out_of_range() {
        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(fleet()));

        assert_eq!(session.select_rows(&[0, 2, 9]), Err(vec![0, 9]));
        // Nothing applied when any row is invalid
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_deselect_rows() {
        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(fleet()));

        assert_eq!(session.select_all(), 3);
        assert_eq!(session.deselect_rows(&[2]), Ok(1));
        assert_eq!(session.selection().len(), 2);
    }

    #[test]
    fn test_selection_tracks_vehicle_not_position() {
        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(fleet()));
        session.select_rows(&[3]).unwrap();

        // Refetch returns the same vehicles in a different order
        let mut reordered = fleet();
        reordered.rotate_left(1);
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(reordered));

        let selected = session.selected_vehicles();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].model, "Civic");
    }

    #[test]
    fn test_empty_result_yields_empty_selectable_set() {
        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(fleet()));
        session.select_rows(&[1]).unwrap();

        let plan = session.set_filter(FilterField::Brand, "Lada").unwrap();
        let applied = session.apply_vehicles(plan.vehicles.generation, Ok(Vec::new()));
        assert_eq!(applied, Applied::Updated);

        assert!(session.vehicles().is_empty());
        assert!(session.selected_vehicles().is_empty());
        assert_eq!(session.missing_selected(), 1);
        assert_eq!(session.select_rows(&[1]), Err(vec![1]));
    }

    #[test]
    fn test_quotes_for_selection() {
        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(fleet()));
        session.apply_rate(plan.rate.generation, Ok(dec!(58.5)));
        session.select_rows(&[1]).unwrap();

        let quotes = session.quotes(&TaxSchedule::default(), "DOP").unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].taxes.total_general, dec!(31600));
        assert_eq!(quotes[0].local_total.amount(), Some(dec!(1848600)));
    }

    #[test]
    fn test_one_of_identical_rows_selected() {
        let record =
            r#"{"Marca":"Toyota","Modelo":"Corolla","Año":2020,"Valor":20000,"Pais":"USA"}"#;
        let records = serde_json::from_str(&format!("[{0},{0}]", record)).unwrap();
        let twins = crate::api::models::vehicles_from_records(records);

        let mut session = Session::new();
        let plan = session.refresh();
        session.apply_vehicles(plan.vehicles.generation, Ok(twins));
        session.select_rows(&[2]).unwrap();

        let quotes = session.quotes(&TaxSchedule::default(), "DOP").unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].vehicle.key, session.vehicles()[1].key);

        session.deselect_rows(&[1]).unwrap();
        assert_eq!(session.selection().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_against_api() {
        let api = MockApi { vehicles: fleet(), rate: Some(dec!(58.5)) };
        let mut session = Session::new();

        let plan = session.set_filter(FilterField::Brand, "toyota").unwrap();
        let (vehicles, rate) = session.execute(&api, plan).await;

        assert_eq!(vehicles, Applied::Updated);
        assert_eq!(rate, Applied::Updated);
        assert_eq!(session.vehicles().len(), 2);
        assert_eq!(session.rate(), Some(dec!(58.5)));
    }

    #[tokio::test]
    async fn test_execute_rate_unavailable() {
        let api = MockApi { vehicles: fleet(), rate: None };
        let mut session = Session::new();

        let plan = session.refresh();
        let (vehicles, rate) = session.execute(&api, plan).await;

        assert_eq!(vehicles, Applied::Updated);
        assert_eq!(rate, Applied::Failed);
        assert!(session.rate().is_none());
    }
}
