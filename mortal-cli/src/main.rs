//! mortal
//!
//! Terminal front end for buying services from, and lending to, a mortal
//! agent.

mod commands;
mod config;
mod render;
mod shutdown;
mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::PaymentChoice;
use commands::buy::BuyRequest;
use commands::lend::LendRequest;
use config::ConfigLoader;
use rust_decimal::Decimal;
use state::AppState;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// mortal - buy from and lend to an autonomous agent
#[derive(Parser, Debug)]
#[command(name = "mortal")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "MORTAL_CONFIG", default_value = "./mortal-config.toml")]
    config: PathBuf,

    /// Override the agent API base URL
    #[arg(long, env = "MORTAL_BASE_URL")]
    base_url: Option<Url>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List services and supported chains
    Menu,

    /// Show the agent status
    Status {
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Order a service
    Buy {
        /// Service id from the menu
        #[arg(long)]
        service: String,

        /// Chain to pay on (defaults to the agent's default chain)
        #[arg(long)]
        chain: Option<String>,

        /// Question or request for the agent
        #[arg(long)]
        input: Option<String>,

        #[arg(long)]
        spread_type: Option<String>,

        #[command(flatten)]
        payment: PaymentArgs,

        /// Do not wait for delivery
        #[arg(long)]
        no_wait: bool,
    },

    /// Resume the saved order
    Resume {
        /// Show the saved order without waiting for delivery
        #[arg(long)]
        no_wait: bool,
    },

    /// Pay the saved order
    Pay {
        #[command(flatten)]
        payment: RequiredPaymentArgs,

        /// Do not wait for delivery
        #[arg(long)]
        no_wait: bool,
    },

    /// Forget the saved order and loan
    Reset,

    /// Lend tokens to the agent's vault
    Lend {
        /// Amount in whole tokens
        #[arg(long)]
        amount: Decimal,

        /// Interest rate in basis points (1-10000)
        #[arg(long)]
        rate_bps: u32,

        #[arg(long)]
        chain: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct PaymentArgs {
    /// Hash of a transfer you already sent
    #[arg(long, conflicts_with = "wallet")]
    tx_hash: Option<String>,

    /// Pay from the configured wallet
    #[arg(long)]
    wallet: bool,
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct RequiredPaymentArgs {
    /// Hash of a transfer you already sent
    #[arg(long)]
    tx_hash: Option<String>,

    /// Pay from the configured wallet
    #[arg(long)]
    wallet: bool,
}

impl From<PaymentArgs> for PaymentChoice {
    fn from(args: PaymentArgs) -> Self {
        Self {
            tx_hash: args.tx_hash,
            wallet: args.wallet,
        }
    }
}

impl From<RequiredPaymentArgs> for PaymentChoice {
    fn from(args: RequiredPaymentArgs) -> Self {
        Self {
            tx_hash: args.tx_hash,
            wallet: args.wallet,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::debug!("Starting mortal v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ConfigLoader::new(&args.config, args.base_url)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::debug!(agent = %config.agent_url, storage = ?config.storage_dir, "Configuration loaded");

    let app = AppState::new(config)?;

    match args.command {
        Command::Menu => commands::menu::run(&app).await,
        Command::Status { watch } => commands::status::run(&app, watch).await,
        Command::Buy {
            service,
            chain,
            input,
            spread_type,
            payment,
            no_wait,
        } => {
            let request = BuyRequest {
                service,
                chain,
                input,
                spread_type,
                payment: payment.into(),
                no_wait,
            };
            commands::buy::run(&app, request).await
        }
        Command::Resume { no_wait } => commands::resume::run(&app, no_wait).await,
        Command::Pay { payment, no_wait } => {
            commands::pay::run(&app, payment.into(), no_wait).await
        }
        Command::Reset => commands::reset::run(&app),
        Command::Lend {
            amount,
            rate_bps,
            chain,
        } => {
            let request = LendRequest {
                amount,
                rate_bps,
                chain,
            };
            commands::lend::run(&app, request).await
        }
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr; stdout carries the screens.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,mortal_core=info,reqwest=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
