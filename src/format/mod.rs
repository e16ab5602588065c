//! Output formatting for vehicles and tax quotes (table, JSON, markdown, CSV).

use crate::api::Vehicle;
use crate::config::OutputFormat;
use crate::quote::Quote;
use crate::session::Selection;
use crate::tax::{format_amount, format_money, format_plain as plain, ExchangeRate};
use rust_decimal::Decimal;

/// Formats vehicles, quotes, and exchange rates for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the vehicle listing. Selected rows are marked in table and
    /// markdown output.
    pub fn format_vehicles(&self, vehicles: &[Vehicle], selection: &Selection) -> String {
        if vehicles.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => Self::vehicles_csv_header().to_string(),
                _ => "No vehicles found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(vehicles).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_vehicles(vehicles, selection),
            OutputFormat::Markdown => self.markdown_vehicles(vehicles, selection),
            OutputFormat::Csv => self.csv_vehicles(vehicles),
        }
    }

    /// Formats tax quotes for the selected vehicles.
    pub fn format_quotes(&self, quotes: &[Quote]) -> String {
        if quotes.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => Self::quotes_csv_header().to_string(),
                _ => "No vehicles selected.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(quotes).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_quotes(quotes),
            OutputFormat::Markdown => self.markdown_quotes(quotes),
            OutputFormat::Csv => self.csv_quotes(quotes),
        }
    }

    /// Formats the current exchange rate, or its absence.
    pub fn format_rate(&self, rate: Option<Decimal>, currency: &str) -> String {
        let rate = rate.filter(|r| *r > Decimal::ZERO).map(|r| ExchangeRate::new(currency, r));

        match (self.format, rate) {
            (OutputFormat::Json, rate) => serde_json::json!({
                "currency": currency,
                "rate": rate.map(|r| r.rate.normalize().to_string()),
            })
            .to_string(),
            (OutputFormat::Csv, rate) => format!(
                "currency,rate\n{},{}",
                currency,
                rate.map(|r| r.rate.normalize().to_string()).unwrap_or_default()
            ),
            (OutputFormat::Markdown, Some(rate)) => format!("**Exchange rate:** {}", rate),
            (OutputFormat::Markdown, None) => "**Exchange rate:** unavailable".to_string(),
            (OutputFormat::Table, Some(rate)) => format!("Exchange rate: {}", rate),
            (OutputFormat::Table, None) => "Exchange rate: unavailable".to_string(),
        }
    }

    // Table formatting

    fn table_vehicles(&self, vehicles: &[Vehicle], selection: &Selection) -> String {
        let row_width = 4;
        let brand_width = 14;
        let model_width = 16;
        let value_width = 14;
        let country_width = 12;
        let spec_width = 40;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:>row_width$} {:<1} {:<brand_width$}  {:<model_width$}  {:<4}  {:>value_width$}  {:<country_width$}  {}",
            "#", "", "Brand", "Model", "Year", "Value (USD)", "Country", "Specifications"
        ));
        lines.push(format!(
            "{:->row_width$} {:<1} {:-<brand_width$}  {:-<model_width$}  {:-<4}  {:->value_width$}  {:-<country_width$}  {:-<spec_width$}",
            "", "", "", "", "", "", "", ""
        ));

        for (idx, vehicle) in vehicles.iter().enumerate() {
            let marker = if selection.contains(&vehicle.key) { "*" } else { "" };

            lines.push(format!(
                "{:>row_width$} {:<1} {:<brand_width$}  {:<model_width$}  {:<4}  {:>value_width$}  {:<country_width$}  {}",
                idx + 1,
                marker,
                truncate(&vehicle.brand, brand_width),
                truncate(&vehicle.model, model_width),
                vehicle.year,
                format_amount(vehicle.declared_value),
                truncate(&vehicle.country, country_width),
                truncate(&vehicle.specifications, spec_width)
            ));
        }

        lines.push(String::new());
        let selected = selection.resolve(vehicles).len();
        if selected > 0 {
            lines.push(format!("Total: {} vehicles ({} selected)", vehicles.len(), selected));
        } else {
            lines.push(format!("Total: {} vehicles", vehicles.len()));
        }

        lines.join("\n")
    }

    fn table_quotes(&self, quotes: &[Quote]) -> String {
        let mut blocks = Vec::new();

        for quote in quotes {
            let taxes = &quote.taxes;
            let lines = [
                quote.vehicle.label(),
                format!("  Declared value:  {}", format_money(taxes.declared_value, "USD")),
                format!("  Tariff:          {}", format_money(taxes.tariff, "USD")),
                format!("  ITBIS:           {}", format_money(taxes.itbis, "USD")),
                format!("  CO2:             {}", format_money(taxes.co2, "USD")),
                format!("  Plate:           {}", format_money(taxes.plate, "USD")),
                format!("  Sticker:         {}", format_amount(taxes.sticker)),
                format!("  Total taxes:     {}", format_money(taxes.total_taxes, "USD")),
                format!("  Total general:   {}", format_money(taxes.total_general, "USD")),
                format!(
                    "  Price in {}:    {}",
                    quote.local_currency,
                    quote.local_total.display(&quote.local_currency)
                ),
            ];
            blocks.push(lines.join("\n"));
        }

        blocks.push(format!("Selected vehicles: {}", quotes.len()));
        blocks.join("\n\n")
    }

    // Markdown formatting

    fn markdown_vehicles(&self, vehicles: &[Vehicle], selection: &Selection) -> String {
        let mut lines = Vec::new();

        lines.push(
            "| # | Selected | Brand | Model | Year | Value (USD) | Country | Specifications |"
                .to_string(),
        );
        lines.push(
            "|---|----------|-------|-------|------|-------------|---------|----------------|"
                .to_string(),
        );

        for (idx, vehicle) in vehicles.iter().enumerate() {
            let selected = if selection.contains(&vehicle.key) { "✓" } else { "" };
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                idx + 1,
                selected,
                vehicle.brand,
                vehicle.model,
                vehicle.year,
                format_amount(vehicle.declared_value),
                vehicle.country,
                truncate(&vehicle.specifications, 40)
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} vehicles found*", vehicles.len()));

        lines.join("\n")
    }

    fn markdown_quotes(&self, quotes: &[Quote]) -> String {
        let mut lines = Vec::new();

        for quote in quotes {
            let taxes = &quote.taxes;
            lines.push(format!("## {}", quote.vehicle.label()));
            lines.push(String::new());
            lines.push(format!(
                "- **Declared value:** {}",
                format_money(taxes.declared_value, "USD")
            ));
            lines.push(format!("- **Tariff:** {}", format_money(taxes.tariff, "USD")));
            lines.push(format!("- **ITBIS:** {}", format_money(taxes.itbis, "USD")));
            lines.push(format!("- **CO2:** {}", format_money(taxes.co2, "USD")));
            lines.push(format!("- **Plate:** {}", format_money(taxes.plate, "USD")));
            lines.push(format!("- **Sticker:** {}", format_amount(taxes.sticker)));
            lines.push(format!("- **Total taxes:** {}", format_money(taxes.total_taxes, "USD")));
            lines.push(format!(
                "- **Total general:** {}",
                format_money(taxes.total_general, "USD")
            ));
            lines.push(format!(
                "- **Price in {}:** {}",
                quote.local_currency,
                quote.local_total.display(&quote.local_currency)
            ));
            lines.push(String::new());
        }

        lines.push(format!("*{} vehicles selected*", quotes.len()));
        lines.join("\n")
    }

    // CSV formatting

    fn vehicles_csv_header() -> &'static str {
        "key,brand,model,year,value_usd,country,specifications"
    }

    fn quotes_csv_header() -> &'static str {
        "key,brand,model,year,country,value_usd,tariff,itbis,co2,plate,sticker,total_taxes,total_general,local_currency,local_total"
    }

    fn csv_vehicles(&self, vehicles: &[Vehicle]) -> String {
        let mut lines = vec![Self::vehicles_csv_header().to_string()];

        for vehicle in vehicles {
            lines.push(format!(
                "{},{},{},{},{},{},{}",
                Self::csv_escape(vehicle.key.as_str()),
                Self::csv_escape(&vehicle.brand),
                Self::csv_escape(&vehicle.model),
                vehicle.year,
                plain(vehicle.declared_value),
                Self::csv_escape(&vehicle.country),
                Self::csv_escape(&vehicle.specifications)
            ));
        }

        lines.join("\n")
    }

    fn csv_quotes(&self, quotes: &[Quote]) -> String {
        let mut lines = vec![Self::quotes_csv_header().to_string()];

        for quote in quotes {
            let vehicle = &quote.vehicle;
            let taxes = &quote.taxes;
            lines.push(format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                Self::csv_escape(vehicle.key.as_str()),
                Self::csv_escape(&vehicle.brand),
                Self::csv_escape(&vehicle.model),
                vehicle.year,
                Self::csv_escape(&vehicle.country),
                plain(taxes.declared_value),
                plain(taxes.tariff),
                plain(taxes.itbis),
                plain(taxes.co2),
                plain(taxes.plate),
                plain(taxes.sticker),
                plain(taxes.total_taxes),
                plain(taxes.total_general),
                quote.local_currency,
                quote.local_total.amount().map(plain).unwrap_or_default()
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
