//! Tax calculation for selected vehicles.

use crate::api::{VehicleApi, VehicleClient, VehicleKey};
use crate::commands::load_session;
use crate::config::Config;
use crate::filters::VehicleFilter;
use crate::format::Formatter;
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// Which vehicles of the listing to calculate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// 1-based row numbers of the filtered listing
    Rows(Vec<usize>),
    /// Stable vehicle keys
    Keys(Vec<String>),
    All,
}

/// Computes tax quotes for vehicles picked from a filtered listing.
pub struct CalculateCommand {
    config: Config,
}

impl CalculateCommand {
    /// Creates a new calculate command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Fetches the listing, selects vehicles, and returns formatted quotes.
    pub async fn execute(&self, filter: VehicleFilter, selector: Selector) -> Result<String> {
        let client = VehicleClient::new(&self.config).context("Failed to create HTTP client")?;

        self.execute_with_client(&client, filter, selector).await
    }

    /// Same as [`execute`](Self::execute) with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl VehicleApi,
        filter: VehicleFilter,
        selector: Selector,
    ) -> Result<String> {
        let mut session = load_session(client, filter, self.config.strict, true).await?;

        match selector {
            Selector::All => {
                session.select_all();
            }
            Selector::Rows(rows) => {
                if let Err(invalid) = session.select_rows(&rows) {
                    bail!(
                        "Row(s) {} out of range: listing has {} vehicles",
                        join(&invalid),
                        session.vehicles().len()
                    );
                }
            }
            Selector::Keys(keys) => {
                for key in keys {
                    session.select_key(VehicleKey::new(key.trim()));
                }
                let missing = session.missing_selected();
                if missing > 0 {
                    warn!("{} selected key(s) not present in the listing", missing);
                }
            }
        }

        if session.rate().is_none() {
            warn!(
                "Exchange rate unavailable; {} prices will not be shown",
                self.config.local_currency
            );
        }

        let quotes = session
            .quotes(&self.config.tax, &self.config.local_currency)
            .context("Failed to calculate taxes")?;
        info!("Calculated taxes for {} vehicles", quotes.len());

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_quotes(&quotes))
    }
}

fn join(rows: &[usize]) -> String {
    rows.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}
