//! vehitax - Vehicle listing and import tax calculator CLI
//!
//! Browses a vehicle catalogue service with brand, model, and year filters,
//! keeps a selection across listing refreshes, and computes import taxes with
//! a conversion of the total into the local currency.

pub mod api;
pub mod commands;
pub mod config;
pub mod filters;
pub mod format;
pub mod quote;
pub mod session;
pub mod tax;

pub use api::{Vehicle, VehicleKey};
pub use config::Config;
pub use filters::{FilterField, VehicleFilter};
pub use quote::Quote;
pub use session::{Selection, Session};
pub use tax::{TaxBreakdown, TaxSchedule};
