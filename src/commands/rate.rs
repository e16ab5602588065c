//! Exchange rate lookup command.

use crate::api::{VehicleApi, VehicleClient};
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::warn;

/// Shows the current USD to local-currency rate.
pub struct RateCommand {
    config: Config,
}

impl RateCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<String> {
        let client = VehicleClient::new(&self.config).context("Failed to create HTTP client")?;

        self.execute_with_client(&client).await
    }

    pub async fn execute_with_client(&self, client: &impl VehicleApi) -> Result<String> {
        let rate = match client.exchange_rate().await {
            Ok(rate) => Some(rate),
            Err(e) if self.config.strict => {
                return Err(e).context("Failed to fetch the exchange rate");
            }
            Err(e) => {
                warn!("Exchange rate request failed: {}", e);
                None
            }
        };

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_rate(rate, &self.config.local_currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::MockVehicleApi;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_rate_available() {
        let api = MockVehicleApi::new(Vec::new(), Some(dec!(58.5)));
        let output = RateCommand::new(Config::default()).execute_with_client(&api).await.unwrap();
        assert_eq!(output, "Exchange rate: 1 USD = 58.5 DOP");
    }

    #[tokio::test]
    async fn test_rate_unavailable() {
        let api = MockVehicleApi::new(Vec::new(), None);
        let output = RateCommand::new(Config::default()).execute_with_client(&api).await.unwrap();
        assert_eq!(output, "Exchange rate: unavailable");
    }

    #[tokio::test]
    async fn test_rate_unavailable_strict() {
        let api = MockVehicleApi::new(Vec::new(), None);
        let cmd = RateCommand::new(Config { strict: true, ..Config::default() });
        assert!(cmd.execute_with_client(&api).await.is_err());
    }
}
