//! Run loop - repeats the deposit a fixed number of times with a pause
//! between attempts

use crate::config::RunConfig;
use crate::tx::{Deposit, TxOutcome, TxStatus};

use rand::Rng;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Counters accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub requested: u32,
    pub attempted: u32,
    /// Attempts that produced a transaction hash
    pub submitted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub pending: u32,
}

impl RunSummary {
    fn record(&mut self, outcome: Option<&TxOutcome>) {
        self.attempted += 1;
        let Some(outcome) = outcome else {
            return;
        };
        self.submitted += 1;
        match outcome.status {
            TxStatus::Success => self.succeeded += 1,
            TxStatus::Failed => self.failed += 1,
            TxStatus::Pending => self.pending += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Completed {}/{} transactions successfully!",
            self.succeeded, self.attempted
        )
    }
}

/// Pick the pause between transactions, once per run
pub fn pick_interval(config: &RunConfig) -> Duration {
    let secs = rand::rng().random_range(config.min_interval_secs..=config.max_interval_secs);
    Duration::from_secs(secs)
}

pub fn format_outcome(network: &str, outcome: &TxOutcome) -> String {
    format!(
        "Network: {} | Tx Hash: {:?} | Status: {}",
        network, outcome.hash, outcome.status
    )
}

pub struct RunLoop<D> {
    deposit: D,
    network: String,
    requested: u32,
    interval: Duration,
}

impl<D: Deposit> RunLoop<D> {
    pub fn new(deposit: D, network: impl Into<String>, requested: u32, interval: Duration) -> Self {
        Self {
            deposit,
            network: network.into(),
            requested,
            interval,
        }
    }

    /// Attempt exactly `requested` deposits. Counters go to `summary` as
    /// they change so an interrupted run still has a tally.
    pub async fn run(&self, summary: &mut RunSummary) {
        summary.requested = self.requested;
        info!(
            "Starting {} transactions on {} with {}s interval",
            self.requested,
            self.network,
            self.interval.as_secs()
        );

        for index in 1..=self.requested {
            let started = Instant::now();
            println!("Processing transaction {}/{}", index, self.requested);

            match self.deposit.submit().await {
                Ok(outcome) => {
                    println!("{}", format_outcome(&self.network, &outcome));
                    summary.record(Some(&outcome));
                }
                Err(e) => {
                    println!("Transaction failed to submit ({}): {}", e.kind(), e);
                    if e.is_retryable() {
                        warn!("Node unreachable, the next attempt will reconnect");
                    }
                    summary.record(None);
                }
            }

            println!(
                "Transaction execution time: {:.2} seconds",
                started.elapsed().as_secs_f64()
            );

            if index < self.requested {
                println!(
                    "Waiting {} seconds before next transaction...\n",
                    self.interval.as_secs()
                );
                tokio::time::sleep(self.interval).await;
            }
        }

        if summary.pending > 0 {
            warn!(
                "{} transactions were still pending when polling stopped",
                summary.pending
            );
        }
        info!("Run finished: {:?}", summary);
    }
}
