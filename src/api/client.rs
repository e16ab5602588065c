//! HTTP client for the vehicle service.

use crate::api::error::{ApiError, Result};
use crate::api::models::{vehicles_from_records, ExchangeRateResponse, Vehicle, VehiclesResponse};
use crate::config::Config;
use crate::filters::VehicleFilter;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use wreq::Client;

/// Trait for the two reads the vehicle page needs - enables mocking for tests.
#[async_trait]
pub trait VehicleApi: Send + Sync {
    /// Fetches the vehicle list matching `filter`.
    async fn vehicles(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>>;

    /// Fetches the current local-currency-per-USD rate.
    async fn exchange_rate(&self) -> Result<Decimal>;
}

/// Vehicle service client.
pub struct VehicleClient {
    client: Client,
    base_url: String,
}

impl VehicleClient {
    /// Creates a client pointed at `config.base_url`.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url)
                .map_err(|e| ApiError::Client(format!("invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { client, base_url: config.base_url().to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn vehicles_url(&self, filter: &VehicleFilter) -> String {
        let query = filter.query_string();
        if query.is_empty() {
            format!("{}/vehicles", self.base_url)
        } else {
            format!("{}/vehicles?{}", self.base_url, query)
        }
    }

    /// Performs a GET request and decodes the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| ApiError::Transport { url: url.to_string(), source })?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(ApiError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport { url: url.to_string(), source })?;

        serde_json::from_str(&body)
            .map_err(|source| ApiError::Decode { url: url.to_string(), source })
    }
}

#[async_trait]
impl VehicleApi for VehicleClient {
    async fn vehicles(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>> {
        let url = self.vehicles_url(filter);

        info!("Fetching vehicles ({})", describe(filter));
        let response: VehiclesResponse = self.get_json(&url).await?;

        if !response.success {
            return Err(ApiError::Unsuccessful(url));
        }

        Ok(vehicles_from_records(response.data))
    }

    async fn exchange_rate(&self) -> Result<Decimal> {
        let url = format!("{}/exchange-rate", self.base_url);

        info!("Fetching exchange rate");
        let response: ExchangeRateResponse = self.get_json(&url).await?;

        if !response.success {
            return Err(ApiError::Unsuccessful(url));
        }

        response.usable_rate().ok_or(ApiError::MissingRate)
    }
}

fn describe(filter: &VehicleFilter) -> String {
    if filter.is_empty() {
        "no filters".to_string()
    } else {
        filter.descriptions().join(", ")
    }
}
