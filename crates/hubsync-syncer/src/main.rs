#![warn(missing_docs)]

//! `hubsync-syncer`: runs one syncer pair against a local simulated
//! global/regional cluster pair. Real deployments replace the in-memory
//! clusters with remote cluster credentials.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hubsync_cluster::Cluster;
use hubsync_syncer::{start_syncer, SyncerConfig};

/// Synchronizes resources from the global hub to a regional hub and back.
#[derive(Parser)]
#[command(name = "hubsync-syncer")]
#[command(about = "Cross-cluster resource synchronization engine", long_about = None)]
struct Args {
    /// Name of the global hub cluster.
    #[arg(long, default_value = "global-hub")]
    global: String,

    /// Name of the regional hub cluster this syncer serves.
    #[arg(long, default_value = "region-a")]
    regional: String,

    /// Namespace identifying this syncer on the global hub.
    #[arg(long, env = "SYNCER_NAMESPACE")]
    syncer_namespace: Option<String>,

    /// Worker tasks per sync direction.
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
    let syncer_namespace = args
        .syncer_namespace
        .clone()
        .unwrap_or_else(|| args.regional.clone());

    let upstream = Arc::new(Cluster::new(&args.global));
    let downstream = Arc::new(Cluster::new(&args.regional));

    let (stop, shutdown) = watch::channel(false);
    let _syncer = start_syncer(
        SyncerConfig {
            upstream,
            downstream,
            syncer_namespace,
            workers: args.workers,
        },
        shutdown,
    )
    .await;

    tracing::info!("syncer running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    let _ = stop.send(true);
    Ok(())
}
