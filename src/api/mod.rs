//! Vehicle service adapter: HTTP client, wire payloads, and errors.

pub mod client;
pub mod error;
pub mod models;

pub use client::{VehicleApi, VehicleClient};
pub use error::ApiError;
pub use models::{Vehicle, VehicleKey};
