#![warn(missing_docs)]

//! `hubsync-hub`: runs the policy compliance aggregator against a local
//! simulated global hub cluster. Real deployments replace the in-memory
//! cluster with global hub credentials.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hubsync_aggregator::{GenericController, PolicyAggregator};
use hubsync_cluster::Cluster;

/// Aggregates regional compliance reports on the global hub.
#[derive(Parser)]
#[command(name = "hubsync-hub")]
#[command(about = "Global hub compliance aggregation controller", long_about = None)]
struct Args {
    /// Name of the global hub cluster.
    #[arg(long, default_value = "global-hub")]
    global: String,

    /// Worker tasks draining the reconcile queue.
    #[arg(long, default_value = "2")]
    workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let cluster = Arc::new(Cluster::new(&args.global));

    let (stop, shutdown) = watch::channel(false);
    let _controller = GenericController::start(
        Arc::clone(&cluster),
        PolicyAggregator::new(Arc::clone(&cluster)),
        args.workers,
        shutdown,
    )
    .await;

    tracing::info!("aggregator running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    let _ = stop.send(true);
    Ok(())
}
