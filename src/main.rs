//! CLI for popmq
//!
//! Subcommands:
//! - `server`: run the broker
//! - `produce`: publish one message (smoke tests)
//! - `consume`: pull one message and acknowledge it

use std::sync::Arc;

use clap::Parser;
use popmq::broker::sweeper::start_sweep_loop;
use popmq::broker::{Broker, Dispatcher};
use popmq::client::Client;
use popmq::config::{Settings, load_config};
use popmq::persistence::{Snapshotter, open_store};
use popmq::transport::start_tcp_server;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "popmq")]
enum Command {
    /// Start the broker
    Server,
    /// Publish one message
    Produce {
        /// Broker address (default: server.host:server.port from configuration)
        #[arg(long)]
        addr: Option<String>,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        id: u64,
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// Pull one message from a topic and acknowledge it
    Consume {
        /// Broker address (default: server.host:server.port from configuration)
        #[arg(long)]
        addr: Option<String>,
        #[arg(long)]
        topic: String,
        /// Leave the message in flight instead of acknowledging it
        #[arg(long)]
        no_ack: bool,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    popmq::utils::logging::init(&config.server.log_level);

    let result = match cmd {
        Command::Server => run_server(config).await,
        Command::Produce {
            addr,
            topic,
            id,
            payload,
        } => {
            let addr = addr.unwrap_or_else(|| config.server.addr());
            run_produce(&addr, &topic, id, payload).await
        }
        Command::Consume {
            addr,
            topic,
            no_ack,
        } => {
            let addr = addr.unwrap_or_else(|| config.server.addr());
            run_consume(&addr, &topic, no_ack).await
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let broker = Arc::new(Broker::new());
    let store = open_store(&config.storage)?;
    let snapshotter = Snapshotter::new(broker.clone(), store);

    // Queues must be repopulated before the first connection is accepted.
    let restored = snapshotter.restore()?;
    info!(restored, path = %config.storage.path, "snapshot loaded");

    if config.broker.lease_ms <= config.broker.sweep_interval_ms {
        warn!(
            lease_ms = config.broker.lease_ms,
            sweep_interval_ms = config.broker.sweep_interval_ms,
            "lease does not exceed the sweep interval"
        );
    }

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(start_sweep_loop(
        broker.clone(),
        config.broker.sweep_interval(),
        shutdown.clone(),
    ));
    let snapshots = tokio::spawn(
        snapshotter.run(config.broker.snapshot_interval(), shutdown.clone()),
    );

    let dispatcher = Dispatcher::new(broker, config.broker.lease());
    let outcome = tokio::select! {
        res = start_tcp_server(config.server.addr(), dispatcher, shutdown.clone()) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    };

    shutdown.cancel();
    sweeper.await?;
    snapshots.await?;
    outcome?;
    Ok(())
}

async fn run_produce(
    addr: &str,
    topic: &str,
    id: u64,
    payload: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = Client::connect(addr).await?;
    client.produce(topic, id, payload).await?;
    println!("produced {id} to {topic}");
    Ok(())
}

async fn run_consume(addr: &str, topic: &str, no_ack: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = Client::connect(addr).await?;
    match client.consume(topic).await? {
        Some(msg) => {
            println!(
                "{} {} {}",
                msg.id,
                msg.topic,
                String::from_utf8_lossy(&msg.payload)
            );
            if !no_ack {
                client.ack(topic, msg.id).await?;
            }
        }
        None => println!("no message available on {topic}"),
    }
    Ok(())
}
