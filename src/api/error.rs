//! Errors from the vehicle service adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to configure HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: wreq::Error,
    },

    #[error("Request to {url} failed with status: {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Service reported failure for {0}")]
    Unsuccessful(String),

    #[error("Service returned no usable exchange rate")]
    MissingRate,
}

pub type Result<T> = std::result::Result<T, ApiError>;
