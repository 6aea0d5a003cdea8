//! Deposit Submitter - repeated payable deposits to a single EVM contract
//!
//! Each iteration connects to the configured RPC endpoint, estimates gas and
//! fees, checks the wallet can afford the call, signs and sends it, then
//! polls for the receipt. Iterations run one after another with a random
//! pause chosen once per run.

use anyhow::Result;
use tokio::signal;
use tracing::{info, warn};

mod chain;
mod config;
mod error;
mod prompt;
mod retry;
mod runner;
mod tx;
mod wallet;

use chain::ChainProvider;
use config::Settings;
use runner::{RunLoop, RunSummary};
use tx::DepositSubmitter;
use wallet::WalletCredential;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    init_logging();

    info!("Starting Deposit Submitter v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} (chain {})",
        settings.network.name, settings.network.chain_id
    );

    let wallet = WalletCredential::from_env(&settings.wallet);
    let provider = ChainProvider::new(&settings.network)?;
    let submitter = DepositSubmitter::new(provider, &settings, wallet)?;

    let count = {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        prompt::read_transaction_count(&mut stdin.lock(), &mut stdout)?
    };

    let interval = runner::pick_interval(&settings.run);
    let run_loop = RunLoop::new(submitter, settings.network.name.clone(), count, interval);

    println!("\nStarting transactions...\n");

    let mut summary = RunSummary::default();
    tokio::select! {
        _ = run_loop.run(&mut summary) => {},
        _ = shutdown_signal() => {
            warn!("Shutdown signal received, stopping run");
        },
    }

    println!("\n{}", summary);
    info!("Deposit Submitter stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,deposit_submitter=debug,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
