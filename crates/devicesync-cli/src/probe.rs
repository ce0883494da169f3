//! Reachability probe that feeds the engine's network monitor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use devicesync_core::WatchNetworkMonitor;

/// A probe that takes longer than this counts as unreachable
const PROBE_TIMEOUT_SECS: u64 = 5;

pub fn client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

/// Any HTTP response means the server is reachable, whatever its status.
pub async fn check(client: &reqwest::Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) => {
            debug!(status = %response.status(), "Probe reached server");
            true
        }
        Err(e) => {
            debug!(error = %e, "Probe failed");
            false
        }
    }
}

pub async fn run(
    client: reqwest::Client,
    url: String,
    monitor: Arc<WatchNetworkMonitor>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately and the caller already probed once
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let connected = check(&client, &url).await;
                monitor.set_connected(connected);
            }
        }
    }
    debug!("Reachability probe stopped");
}
