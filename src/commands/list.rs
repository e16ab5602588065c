//! Vehicle listing command.

use crate::api::{VehicleApi, VehicleClient};
use crate::commands::load_session;
use crate::config::Config;
use crate::filters::VehicleFilter;
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Lists vehicles matching a filter.
pub struct ListCommand {
    config: Config,
}

impl ListCommand {
    /// Creates a new list command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Fetches the listing and returns formatted output.
    pub async fn execute(&self, filter: VehicleFilter) -> Result<String> {
        let client = VehicleClient::new(&self.config).context("Failed to create HTTP client")?;

        self.execute_with_client(&client, filter).await
    }

    /// Fetches the listing with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl VehicleApi,
        filter: VehicleFilter,
    ) -> Result<String> {
        if !filter.is_empty() {
            debug!("Active filters: {}", filter.descriptions().join(", "));
        }

        let session = load_session(client, filter, self.config.strict, false).await?;
        info!("Listing {} vehicles", session.vehicles().len());

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_vehicles(session.vehicles(), session.selection()))
    }
}
