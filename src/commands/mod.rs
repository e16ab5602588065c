//! CLI command implementations.

pub mod calculate;
pub mod interactive;
pub mod list;
pub mod quote;
pub mod rate;

pub use calculate::{CalculateCommand, Selector};
pub use interactive::InteractiveCommand;
pub use list::ListCommand;
pub use quote::QuoteCommand;
pub use rate::RateCommand;

use crate::api::VehicleApi;
use crate::filters::VehicleFilter;
use crate::session::{Applied, Session};
use anyhow::{bail, Result};

/// Fetches vehicles and exchange rate for `filter` into a fresh session.
///
/// Failures are logged by the session and leave it empty; with `strict`
/// they become errors instead.
pub(crate) async fn load_session(
    api: &impl VehicleApi,
    filter: VehicleFilter,
    strict: bool,
    need_rate: bool,
) -> Result<Session> {
    let mut session = Session::with_filter(filter);
    let plan = session.refresh();
    let (vehicles, rate) = session.execute(api, plan).await;

    if strict && vehicles == Applied::Failed {
        bail!("Failed to fetch vehicles from the service");
    }
    if strict && need_rate && rate == Applied::Failed {
        bail!("Failed to fetch the exchange rate from the service");
    }

    Ok(session)
}
