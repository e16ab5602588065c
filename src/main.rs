//! vehitax - Vehicle listing and import tax calculator CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use vehitax::commands::quote::QuoteRequest;
use vehitax::commands::{
    CalculateCommand, InteractiveCommand, ListCommand, QuoteCommand, RateCommand, Selector,
};
use vehitax::config::{Config, OutputFormat};
use vehitax::filters::VehicleFilter;

#[derive(Parser)]
#[command(
    name = "vehitax",
    version,
    about = "Vehicle listing and import tax calculator",
    long_about = "Lists vehicles from a catalogue service and calculates import taxes, \
                  with totals converted from USD into the local currency."
)]
struct Cli {
    /// Base URL of the vehicle service
    #[arg(short, long, global = true, env = "VEHITAX_URL")]
    url: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "VEHITAX_PROXY")]
    proxy: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Local currency code for converted totals
    #[arg(long, global = true)]
    currency: Option<String>,

    /// Fail when the service cannot be reached instead of showing empty results
    #[arg(long, global = true)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Brand filter (substring)
    #[arg(short, long, default_value = "")]
    brand: String,

    /// Model filter (substring)
    #[arg(short, long, default_value = "")]
    model: String,

    /// Year filter
    #[arg(short, long, default_value = "")]
    year: String,
}

impl From<FilterArgs> for VehicleFilter {
    fn from(args: FilterArgs) -> Self {
        VehicleFilter::new().brand(args.brand).model(args.model).year(args.year)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List vehicles matching the filters
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Calculate taxes for vehicles picked from the listing
    #[command(alias = "c")]
    Calc {
        #[command(flatten)]
        filters: FilterArgs,

        /// Row numbers of the listing (comma-separated, 1-based)
        #[arg(short, long, value_delimiter = ',', conflicts_with_all = ["key", "all"])]
        select: Vec<usize>,

        /// Vehicle key, as printed by `list --format csv` (repeatable)
        #[arg(short, long, conflicts_with = "all")]
        key: Vec<String>,

        /// Calculate every vehicle in the listing
        #[arg(short, long)]
        all: bool,
    },

    /// Quote taxes for a declared value in USD
    #[command(alias = "q")]
    Quote {
        /// Declared value in USD
        value: Decimal,

        /// Exchange rate to use instead of fetching it
        #[arg(long)]
        rate: Option<Decimal>,

        #[arg(long, default_value = "Custom")]
        brand: String,

        #[arg(long, default_value = "vehicle")]
        model: String,

        #[arg(long, default_value = "0")]
        year: i32,

        #[arg(long, default_value = "")]
        country: String,
    },

    /// Show the current exchange rate
    Rate,

    /// Interactive prompt for filtering, selecting, and calculating
    #[command(alias = "i")]
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(url) = cli.url {
        config.base_url = url;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(currency) = cli.currency {
        config.local_currency = currency.trim().to_uppercase();
    }
    config.strict |= cli.strict;

    match cli.command {
        Commands::List { filters } => {
            let output = ListCommand::new(config).execute(filters.into()).await?;
            println!("{}", output);
        }

        Commands::Calc { filters, select, key, all } => {
            let selector = if all {
                Selector::All
            } else if !key.is_empty() {
                Selector::Keys(key)
            } else if !select.is_empty() {
                Selector::Rows(select)
            } else {
                anyhow::bail!("Nothing selected: pass --select, --key, or --all");
            };

            let output = CalculateCommand::new(config).execute(filters.into(), selector).await?;
            println!("{}", output);
        }

        Commands::Quote { value, rate, brand, model, year, country } => {
            let request =
                QuoteRequest { rate, brand, model, year, country, ..QuoteRequest::new(value) };
            let output = QuoteCommand::new(config).execute(request).await?;
            println!("{}", output);
        }

        Commands::Rate => {
            let output = RateCommand::new(config).execute().await?;
            println!("{}", output);
        }

        Commands::Interactive => {
            InteractiveCommand::new(config).run().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_key_kept_whole() {
        let cli = Cli::try_parse_from([
            "vehitax",
            "calc",
            "--key",
            "toyota|corolla|2020|20000|usa|1.8l, automatic",
            "--key",
            "42",
        ])
        .unwrap();

        match cli.command {
            Commands::Calc { key, .. } => {
                assert_eq!(key, vec!["toyota|corolla|2020|20000|usa|1.8l, automatic", "42"]);
            }
            _ => panic!("expected calc"),
        }
    }

    #[test]
    fn test_calc_rows_comma_separated() {
        let cli = Cli::try_parse_from(["vehitax", "calc", "--select", "1,3", "--brand", "Toyota"])
            .unwrap();

        match cli.command {
            Commands::Calc { select, filters, .. } => {
                assert_eq!(select, vec![1, 3]);
                assert_eq!(filters.brand, "Toyota");
            }
            _ => panic!("expected calc"),
        }
    }
}
