//! Ad-hoc tax quote for a declared value, without a listing.

use crate::api::{Vehicle, VehicleApi, VehicleClient};
use crate::config::Config;
use crate::format::Formatter;
use crate::quote::Quote;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::warn;

/// Describes the vehicle being quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub declared_value: Decimal,
    /// Known rate; when absent it is fetched from the service
    pub rate: Option<Decimal>,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub country: String,
}

impl QuoteRequest {
    pub fn new(declared_value: Decimal) -> Self {
        Self {
            declared_value,
            rate: None,
            brand: "Custom".to_string(),
            model: "vehicle".to_string(),
            year: 0,
            country: String::new(),
        }
    }
}

/// Computes a quote for a single declared value.
pub struct QuoteCommand {
    config: Config,
}

impl QuoteCommand {
    /// Creates a new quote command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self, request: QuoteRequest) -> Result<String> {
        if request.rate.is_some() {
            return self.render(request);
        }

        let client = VehicleClient::new(&self.config).context("Failed to create HTTP client")?;
        self.execute_with_client(&client, request).await
    }

    /// Fetches the exchange rate from `client` when the request has none.
    pub async fn execute_with_client(
        &self,
        client: &impl VehicleApi,
        mut request: QuoteRequest,
    ) -> Result<String> {
        if request.rate.is_none() {
            match client.exchange_rate().await {
                Ok(rate) => request.rate = Some(rate),
                Err(e) if self.config.strict => {
                    return Err(e).context("Failed to fetch the exchange rate");
                }
                Err(e) => warn!("Exchange rate request failed: {}", e),
            }
        }

        self.render(request)
    }

    fn render(&self, request: QuoteRequest) -> Result<String> {
        let vehicle = Vehicle::new(
            request.brand,
            request.model,
            request.year,
            request.declared_value,
            request.country,
            "",
        );

        let quote =
            Quote::build(&vehicle, &self.config.tax, request.rate, &self.config.local_currency)?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_quotes(std::slice::from_ref(&quote)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::MockVehicleApi;
    use crate::config::OutputFormat;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_quote_with_given_rate() {
        let cmd = QuoteCommand::new(Config::default());
        let request = QuoteRequest { rate: Some(dec!(58.5)), ..QuoteRequest::new(dec!(20000)) };

        let output = cmd.execute(request).await.unwrap();
        assert!(output.contains("Custom vehicle"));
        assert!(output.contains("Total taxes:     $8,200.00"));
        assert!(output.contains("DOP 1,848,600.00"));
    }

    #[tokio::test]
    async fn test_quote_fetches_rate() {
        let api = MockVehicleApi::new(Vec::new(), Some(dec!(60)));
        let cmd = QuoteCommand::new(Config::default());

        let output = cmd.execute_with_client(&api, QuoteRequest::new(dec!(100))).await.unwrap();
        assert!(output.contains("Total general:   $158.00"));
        assert!(output.contains("DOP 9,480.00"));
    }

    #[tokio::test]
    async fn test_quote_rate_unavailable() {
        let api = MockVehicleApi::new(Vec::new(), None);
        let cmd = QuoteCommand::new(Config::default());

        let output = cmd.execute_with_client(&api, QuoteRequest::new(dec!(100))).await.unwrap();
        assert!(output.contains("exchange rate unavailable"));
    }

    #[tokio::test]
    async fn test_quote_rate_unavailable_strict() {
        let api = MockVehicleApi::new(Vec::new(), None);
        let cmd = QuoteCommand::new(Config { strict: true, ..Config::default() });

        let err = cmd.execute_with_client(&api, QuoteRequest::new(dec!(100))).await.unwrap_err();
        assert!(err.to_string().contains("exchange rate"));
    }

    #[test]
    fn test_quote_negative_value_rejected() {
        let cmd = QuoteCommand::new(Config::default());
        let request = QuoteRequest { rate: Some(dec!(58.5)), ..QuoteRequest::new(dec!(-10)) };

        let result = tokio_test::block_on(cmd.execute(request));
        assert!(result.unwrap_err().to_string().contains("must not be negative"));
    }

    #[tokio::test]
    async fn test_quote_local_total_too_large_to_convert() {
        let cmd = QuoteCommand::new(Config::default());
        let value = dec!(1600000000000000000000000000);
        let request = QuoteRequest { rate: Some(dec!(58.5)), ..QuoteRequest::new(value) };

        let output = cmd.execute(request).await.unwrap();
        assert!(output.contains("exchange rate unavailable"));
    }

    #[tokio::test]
    async fn test_quote_value_too_large_to_tax() {
        let cmd = QuoteCommand::new(Config::default());
        let value = dec!(60000000000000000000000000000);
        let request = QuoteRequest { rate: Some(dec!(58.5)), ..QuoteRequest::new(value) };

        let err = cmd.execute(request).await.unwrap_err();
        assert!(err.to_string().contains("too large to tax"));
    }

    #[tokio::test]
    async fn test_quote_json() {
        let cmd = QuoteCommand::new(Config { format: OutputFormat::Json, ..Config::default() });
        let request = QuoteRequest {
            rate: Some(dec!(58.5)),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            country: "USA".to_string(),
            ..QuoteRequest::new(dec!(20000))
        };

        let output = cmd.execute(request).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["vehicle"]["brand"], "Toyota");
        assert_eq!(parsed[0]["local_total"]["status"], "converted");
    }
}
