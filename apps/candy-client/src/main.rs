//! # Candy Client
//!
//! Buys candy from the vending server over mutual TLS.
//!
//! ```text
//! $ candy-client -k CE -c 3 -m 50
//!  ____________
//! < Thank you! >
//!  ------------
//!         \   ^__^
//!  ...
//! Change: 20
//! ```
//!
//! ## Exit Status
//! - `0`: the server decided the order, including business rejections
//! - `1`: no decision (credentials, trust, transport, bad response)
//! - `2`: invalid command line; nothing was sent

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use candy_core::validation::validate_order;
use candy_core::{Order, TransactionOutcome};
use candy_net::{CandyConfig, TransactionClient};

const USAGE: &str = "Usage: candy-client -k CANDY_TYPE -c CANDY_COUNT -m MONEY";

/// Buy candy from the vending server.
#[derive(Debug, Parser)]
#[command(
    name = "candy-client",
    version,
    override_usage = "candy-client -k CANDY_TYPE -c CANDY_COUNT -m MONEY"
)]
struct Args {
    /// Two-letter abbreviation for the candy type
    #[arg(short = 'k', value_name = "CANDY_TYPE")]
    kind: Option<String>,

    /// Number of candies to buy
    #[arg(short = 'c', value_name = "CANDY_COUNT", allow_negative_numbers = true)]
    count: Option<i64>,

    /// Amount of money given to the machine
    #[arg(short = 'm', value_name = "MONEY", allow_negative_numbers = true)]
    money: Option<i64>,

    /// Server address, overrides the config file
    #[arg(long, value_name = "HOST:PORT")]
    server: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// The order described by `-k/-c/-m`, if all three are present and valid.
    fn order(&self) -> Option<Order> {
        let order = Order::new(self.money?, self.kind.as_deref()?.trim(), self.count?);
        validate_order(&order).ok().map(|_| order)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => return usage(),
    };
    let Some(order) = args.order() else {
        return usage();
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args, order).await {
        Ok(outcome) => {
            println!("{}", render(&outcome));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn usage() -> ExitCode {
    eprintln!("{}", USAGE);
    ExitCode::from(2)
}

async fn run(args: Args, order: Order) -> anyhow::Result<TransactionOutcome> {
    let mut settings = CandyConfig::read(args.config)
        .context("Failed to load configuration")?
        .client;
    if let Some(server) = args.server {
        settings.server_addr = server;
    }
    settings.validate().context("Invalid client configuration")?;

    let client = TransactionClient::from_settings(&settings)
        .context("Failed to load client credentials")?;

    debug!(
        server = client.server_address(),
        kind = %order.kind,
        quantity = order.quantity,
        funds = order.funds,
        "Submitting order"
    );

    Ok(client.submit(&order).await?)
}

/// Text printed for a decided order.
fn render(outcome: &TransactionOutcome) -> String {
    match outcome {
        TransactionOutcome::Accepted { pleasantry, change } => {
            format!("{}\nChange: {}", pleasantry, change)
        }
        other => other.failure_reason().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("candy-client").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_valid_order_from_flags() {
        let args = parse(&["-k", "CE", "-c", "3", "-m", "50"]);
        assert_eq!(args.order(), Some(Order::new(50, "CE", 3)));
    }

    #[test]
    fn test_invalid_flags_yield_no_order() {
        assert_eq!(parse(&["-k", "CE", "-c", "3"]).order(), None);
        assert_eq!(parse(&["-k", "", "-c", "3", "-m", "50"]).order(), None);
        assert_eq!(parse(&["-k", "CE", "-c", "0", "-m", "50"]).order(), None);
        assert_eq!(parse(&["-k", "CE", "-c", "-2", "-m", "50"]).order(), None);
        assert_eq!(parse(&["-k", "CE", "-c", "1", "-m", "0"]).order(), None);
    }

    #[test]
    fn test_server_override_flag() {
        let args = parse(&["-k", "CE", "-c", "1", "-m", "10", "--server", "shop:9443"]);
        assert_eq!(args.server.as_deref(), Some("shop:9443"));
    }

    #[test]
    fn test_render_outcomes() {
        let accepted = TransactionOutcome::Accepted {
            pleasantry: "Thank you!".into(),
            change: 20,
        };
        assert_eq!(render(&accepted), "Thank you!\nChange: 20");
        assert_eq!(
            render(&TransactionOutcome::InsufficientFunds { shortfall: 10 }),
            "You need 10 more money!"
        );
        assert_eq!(
            render(&TransactionOutcome::rejected("Invalid candy type")),
            "Invalid candy type"
        );
    }
}
