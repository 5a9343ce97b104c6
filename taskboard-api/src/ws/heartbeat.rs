use std::sync::Arc;
use std::time::Duration;

use crate::ws::hub::Hub;

/// Spawn a background task that sends periodic Ping frames to all connected
/// WebSocket clients.
///
/// Runs until aborted through the returned handle or the hub is shut down.
pub fn start_heartbeat(hub: Arc<Hub>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            if hub.is_closed() {
                break;
            }
            let count = hub.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            hub.ping_all().await;
        }
    })
}
