//! Redelivery sweeper
//!
//! Background loop that returns expired in-flight messages to the head of
//! their topic. Each tick takes every topic lock once, briefly; a tick with
//! nothing expired changes nothing.

use std::sync::Arc;

use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broker::engine::Broker;

pub async fn start_sweep_loop(broker: Arc<Broker>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let requeued = broker.sweep_expired(Instant::now());
                if requeued > 0 {
                    info!(requeued, "requeued messages with expired leases");
                }
            }
        }
    }
}
