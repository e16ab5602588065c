//! Interactive prompt: edit filters, pick rows, and calculate taxes.
//!
//! Filter edits fire both service requests in the background and return to
//! the prompt immediately; responses come back over a channel and are applied
//! by this loop only. Commands that read the listing wait for in-flight
//! requests first.

use crate::api::{ApiError, Vehicle, VehicleApi, VehicleClient};
use crate::config::Config;
use crate::filters::FilterField;
use crate::format::Formatter;
use crate::session::{Applied, FetchPlan, Session};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

const HELP: &str = "\
Commands:
  brand <text>       filter by brand (empty text clears)
  model <text>       filter by model
  year <text>        filter by year
  select <n>...      select listing rows
  unselect <n>...    deselect listing rows
  clear              clear the selection
  show               print the listing
  calc               calculate taxes for the selection
  rate               print the exchange rate
  help               show this help
  quit               exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Filter(FilterField, String),
    Select(Vec<usize>),
    Unselect(Vec<usize>),
    Clear,
    Show,
    Calc,
    Rate,
    Help,
    Quit,
    Empty,
}

impl Input {
    /// Whether the command reads the listing or rate and must see settled data.
    fn needs_data(&self) -> bool {
        matches!(
            self,
            Input::Select(_) | Input::Unselect(_) | Input::Show | Input::Calc | Input::Rate
        )
    }
}

impl FromStr for Input {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            return Ok(Input::Empty);
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "select" | "sel" => parse_rows(rest).map(Input::Select),
            "unselect" | "unsel" => parse_rows(rest).map(Input::Unselect),
            "clear" => Ok(Input::Clear),
            "show" | "list" => Ok(Input::Show),
            "calc" | "calculate" => Ok(Input::Calc),
            "rate" => Ok(Input::Rate),
            "help" | "?" => Ok(Input::Help),
            "quit" | "exit" | "q" => Ok(Input::Quit),
            other => other
                .parse::<FilterField>()
                .map(|field| Input::Filter(field, rest.to_string()))
                .map_err(|_| format!("Unknown command: {}. Type 'help' for commands.", command)),
        }
    }
}

fn parse_rows(text: &str) -> Result<Vec<usize>, String> {
    let rows = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<usize>().map_err(|_| format!("Invalid row number: {}", part)))
        .collect::<Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        return Err("Expected one or more row numbers".to_string());
    }
    Ok(rows)
}

/// A service response travelling back to the prompt loop.
enum FetchEvent {
    Vehicles { generation: u64, result: Result<Vec<Vehicle>, ApiError> },
    Rate { generation: u64, result: Result<Decimal, ApiError> },
}

/// Runs the interactive prompt.
pub struct InteractiveCommand {
    config: Config,
}

impl InteractiveCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs against the configured service on stdin/stdout.
    pub async fn run(&self) -> Result<()> {
        let client =
            Arc::new(VehicleClient::new(&self.config).context("Failed to create HTTP client")?);
        let input = BufReader::new(tokio::io::stdin());
        let mut output = tokio::io::stdout();

        self.run_with(client, input, &mut output).await
    }

    /// Runs with a provided client and streams (for testing).
    pub async fn run_with<A, R, W>(&self, api: Arc<A>, input: R, output: &mut W) -> Result<()>
    where
        A: VehicleApi + 'static,
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let formatter = Formatter::new(self.config.format);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session::new();
        let mut pending = dispatch(&api, session.refresh(), &tx);
        let mut lines = input.lines();

        emit(output, "vehitax interactive - type 'help' for commands").await?;

        loop {
            tokio::select! {
                Some(event) = rx.recv(), if pending > 0 => {
                    pending -= 1;
                    self.apply(&mut session, event, &formatter, output).await?;
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else {
                        break;
                    };

                    let input = match line.parse::<Input>() {
                        Ok(input) => input,
                        Err(message) => {
                            emit(output, &message).await?;
                            continue;
                        }
                    };

                    if input.needs_data() {
                        while pending > 0 {
                            let Some(event) = rx.recv().await else { break };
                            pending -= 1;
                            self.apply(&mut session, event, &formatter, output).await?;
                        }
                    }

                    match input {
                        Input::Quit => break,
                        Input::Filter(field, value) => {
                            if let Some(plan) = session.set_filter(field, value) {
                                pending += dispatch(&api, plan, &tx);
                            }
                        }
                        other => self.handle(&mut session, other, &formatter, output).await?,
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle<W: AsyncWrite + Unpin>(
        &self,
        session: &mut Session,
        input: Input,
        formatter: &Formatter,
        output: &mut W,
    ) -> Result<()> {
        let listing_size = session.vehicles().len();

        let message = match input {
            Input::Select(rows) => match session.select_rows(&rows) {
                Ok(_) => format!("Selected vehicles: {}", session.selection().len()),
                Err(invalid) => no_such_rows(&invalid, listing_size),
            },
            Input::Unselect(rows) => match session.deselect_rows(&rows) {
                Ok(_) => format!("Selected vehicles: {}", session.selection().len()),
                Err(invalid) => no_such_rows(&invalid, listing_size),
            },
            Input::Clear => {
                session.clear_selection();
                "Selection cleared".to_string()
            }
            Input::Show => formatter.format_vehicles(session.vehicles(), session.selection()),
            Input::Calc => {
                let quotes = match session.quotes(&self.config.tax, &self.config.local_currency) {
                    Ok(quotes) => quotes,
                    Err(e) => return emit(output, &format!("Cannot calculate taxes: {}", e)).await,
                };
                let mut text = formatter.format_quotes(&quotes);
                let missing = session.missing_selected();
                if missing > 0 {
                    text.push_str(&format!(
                        "\n({} selected vehicles are not in the current listing)",
                        missing
                    ));
                }
                text
            }
            Input::Rate => formatter.format_rate(session.rate(), &self.config.local_currency),
            Input::Help => HELP.to_string(),
            Input::Empty | Input::Quit | Input::Filter(..) => return Ok(()),
        };

        emit(output, &message).await
    }

    async fn apply<W: AsyncWrite + Unpin>(
        &self,
        session: &mut Session,
        event: FetchEvent,
        formatter: &Formatter,
        output: &mut W,
    ) -> Result<()> {
        match event {
            FetchEvent::Vehicles { generation, result } => {
                if session.apply_vehicles(generation, result) == Applied::Updated {
                    let listing =
                        formatter.format_vehicles(session.vehicles(), session.selection());
                    emit(output, &listing).await?;
                }
            }
            FetchEvent::Rate { generation, result } => {
                session.apply_rate(generation, result);
            }
        }
        Ok(())
    }
}

/// Spawns both requests of `plan`; returns how many responses to expect.
fn dispatch<A>(api: &Arc<A>, plan: FetchPlan, tx: &mpsc::UnboundedSender<FetchEvent>) -> usize
where
    A: VehicleApi + 'static,
{
    debug!("Dispatching fetch generation {}", plan.vehicles.generation);

    let vehicles_api = Arc::clone(api);
    let vehicles_tx = tx.clone();
    let vehicles = plan.vehicles;
    tokio::spawn(async move {
        let result = vehicles_api.vehicles(&vehicles.filter).await;
        let _ = vehicles_tx.send(FetchEvent::Vehicles { generation: vehicles.generation, result });
    });

    let rate_api = Arc::clone(api);
    let rate_tx = tx.clone();
    let rate_generation = plan.rate.generation;
    tokio::spawn(async move {
        let result = rate_api.exchange_rate().await;
        let _ = rate_tx.send(FetchEvent::Rate { generation: rate_generation, result });
    });

    2
}

fn no_such_rows(rows: &[usize], listing_size: usize) -> String {
    let rows = rows.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
    format!("No row(s) {}: listing has {} vehicles", rows, listing_size)
}

async fn emit<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
