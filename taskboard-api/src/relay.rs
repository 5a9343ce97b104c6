/// Redis pub/sub relay for live events
///
/// With several API processes behind a load balancer, a socket may be
/// connected to a different process than the one handling the mutation. When
/// `REDIS_URL` is set, [`RedisRelay`] replaces the hub as the application's
/// [`EventPublisher`]: every event is published once on
/// [`RELAY_CHANNEL`], and every process (including the publisher) runs
/// [`spawn_subscriber`] to deliver relayed events to its own sockets.
///
/// Delivery stays fire-and-forget. Messages published while a subscriber is
/// reconnecting are lost for that process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use taskboard_shared::events::{
    decode_relay, encode_relay, EventPublisher, LiveEvent, PublishError, Room, RELAY_CHANNEL,
};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::ws::Hub;

/// Longest pause between subscriber reconnect attempts
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Relay errors
#[derive(Error, Debug)]
pub enum RelayError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Publishes live events to the shared Redis channel
#[derive(Clone)]
pub struct RedisRelay {
    conn: ConnectionManager,
}

impl RedisRelay {
    /// Connects the publishing side
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        tracing::info!(url = %sanitize_url(url), "Connecting live event relay");

        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl EventPublisher for RedisRelay {
    async fn publish(&self, room: Room, event: LiveEvent) -> Result<(), PublishError> {
        let payload = encode_relay(room, &event)?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(RELAY_CHANNEL, payload)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        tracing::trace!(room = %room, event = event.name(), receivers, "Relayed live event");
        Ok(())
    }
}

/// Spawns the subscriber loop that feeds relayed events into the local hub
///
/// Reconnects with exponential backoff until the hub is shut down.
pub fn spawn_subscriber(url: String, hub: Arc<Hub>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = Duration::from_secs(1);

        while !hub.is_closed() {
            match listen(&url, &hub).await {
                Ok(()) => {
                    tracing::warn!("Relay subscription ended; reconnecting");
                    backoff = Duration::from_secs(1);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        url = %sanitize_url(&url),
                        retry_in_secs = backoff.as_secs(),
                        "Relay subscriber failed"
                    );
                }
            }

            if hub.is_closed() {
                break;
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        tracing::debug!("Relay subscriber stopped");
    })
}

async fn listen(url: &str, hub: &Hub) -> Result<(), RelayError> {
    let client = redis::Client::open(url)?;
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.subscribe(RELAY_CHANNEL).await?;

    tracing::info!(channel = RELAY_CHANNEL, "Subscribed to live event relay");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to get relay payload");
                continue;
            }
        };

        match decode_relay(&payload) {
            Ok(relayed) => {
                if let Err(e) = hub.deliver(relayed.room, &relayed.message).await {
                    tracing::warn!(error = %e, "Failed to deliver relayed event");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed relay message");
            }
        }

        if hub.is_closed() {
            break;
        }
    }

    Ok(())
}

/// Masks credentials in a Redis URL for logging
fn sanitize_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > scheme_end {
            return format!("{}***@{}", &url[..scheme_end + 3], &url[at_pos + 1..]);
        }
    }
    url.to_string()
}
