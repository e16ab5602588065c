//! USD to local-currency conversion and money formatting.

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{iso, FormattableCurrency, Formatter, Money, Params, Position};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Result of converting a USD amount into the local currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "amount", rename_all = "lowercase")]
pub enum Conversion {
    Converted(Decimal),
    /// No usable exchange rate has been loaded yet.
    Unavailable,
}

impl Conversion {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Conversion::Converted(amount) => Some(*amount),
            Conversion::Unavailable => None,
        }
    }

    /// Renders the converted amount in `currency`, or the unavailable marker.
    pub fn display(&self, currency: &str) -> String {
        match self {
            Conversion::Converted(amount) => format_money(*amount, currency),
            Conversion::Unavailable => "exchange rate unavailable".to_string(),
        }
    }
}

/// Converts a USD amount with a local-per-USD rate.
///
/// A missing, zero or negative rate yields [`Conversion::Unavailable`], as
/// does a product too large for a `Decimal`.
pub fn convert(amount_usd: Decimal, rate: Option<Decimal>) -> Conversion {
    match rate {
        Some(rate) if rate > Decimal::ZERO => match amount_usd.checked_mul(rate) {
            Some(local) => Conversion::Converted(local),
            None => {
                debug!("Conversion of {} at {} overflows", amount_usd, rate);
                Conversion::Unavailable
            }
        },
        _ => Conversion::Unavailable,
    }
}

/// Rounds to cents, midpoint away from zero. Never yields a negative zero.
fn to_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

fn params(
    separator_pattern: Vec<usize>,
    positions: Vec<Position>,
    symbol: Option<&'static str>,
    code: Option<&'static str>,
) -> Params {
    Params {
        digit_separator: ',',
        exponent_separator: '.',
        separator_pattern,
        positions,
        symbol,
        code,
        ..Params::default()
    }
}

/// Groups of three up to the widest `Decimal`.
fn thousands() -> Vec<usize> {
    vec![3; 10]
}

/// Cents with thousands grouping: `1,234.50`.
pub fn format_amount(amount: Decimal) -> String {
    let money = Money::from_decimal(to_cents(amount), iso::USD);
    let params = params(thousands(), vec![Position::Sign, Position::Amount], None, None);
    Formatter::money(&money, params)
}

/// Cents without grouping, for machine-readable output: `1234.50`.
pub fn format_plain(amount: Decimal) -> String {
    let money = Money::from_decimal(to_cents(amount), iso::USD);
    let params = params(Vec::new(), vec![Position::Sign, Position::Amount], None, None);
    Formatter::money(&money, params)
}

/// Formats an amount with its currency marker: `$1,234.50` or `DOP 1,234.50`.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let code = currency.trim().to_uppercase();

    let Some(iso_currency) = iso::find(&code) else {
        return format!("{} {}", code, format_amount(amount));
    };

    let money = Money::from_decimal(to_cents(amount), iso_currency);
    let params = if iso_currency.code() == "USD" {
        params(
            thousands(),
            vec![Position::Sign, Position::Symbol, Position::Amount],
            Some(iso_currency.symbol()),
            None,
        )
    } else {
        params(
            thousands(),
            vec![Position::Sign, Position::Code, Position::Space, Position::Amount],
            None,
            Some(iso_currency.code()),
        )
    };
    Formatter::money(&money, params)
}

/// A loaded exchange rate, local currency units per USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRate {
    pub currency: String,
    pub rate: Decimal,
}

impl ExchangeRate {
    pub fn new(currency: impl Into<String>, rate: Decimal) -> Self {
        Self { currency: currency.into(), rate }
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1 USD = {} {}", self.rate.normalize(), self.currency)
    }
}
