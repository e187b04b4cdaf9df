//! Steady-state service loop
//!
//! Once the bootstrap is online, the session has to be serviced
//! continuously: keep-alives and inbound messages only flow while the client
//! is polled. The loop also reconnects after a dropped session and drives any
//! number of publishers, each on its own period.
//!
//! ```text
//!            ┌──────────── shutdown.cancelled() ──► return Online
//! select! ───┼──────────── sleep_until(next due) ──► publish due Dependums
//!            └──────────── client.poll()         ──► Err ─► reconnect()
//! ```

use crate::bootstrap::{BootstrapError, ConnectivityBootstrap, Online};
use crate::mqtt::MqttClient;
use crate::topic::TopicRef;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Periodic telemetry publishing for one component thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub topic: TopicRef,
    pub interval_ms: u64,
    /// Static fields copied into every document
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Telemetry document published by the runtime
#[derive(Debug, Serialize)]
pub struct Dependum<'a> {
    pub source: &'a str,
    pub sequence: u64,
    pub timestamp: DateTime<Local>,
    pub data: &'a BTreeMap<String, serde_json::Value>,
}

pub struct Publisher {
    config: PublisherConfig,
    topic: String,
    source: String,
    sequence: u64,
}

impl Publisher {
    pub fn new(config: PublisherConfig, source: impl Into<String>) -> Self {
        Self {
            topic: config.topic.resolve(),
            config,
            source: source.into(),
            sequence: 0,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms.max(1))
    }

    /// Serializes the next document; the sequence starts at 1
    pub fn next_payload(&mut self) -> Result<Vec<u8>, serde_json::Error> {
        self.sequence += 1;
        let dependum = Dependum {
            source: &self.source,
            sequence: self.sequence,
            timestamp: Local::now(),
            data: &self.config.data,
        };
        serde_json::to_vec(&dependum)
    }
}

struct Scheduled {
    publisher: Publisher,
    due: Instant,
}

async fn publish_once(client: &mut dyn MqttClient, publisher: &mut Publisher) {
    if !client.connected() {
        debug!("Skipping publish to {}, not connected", publisher.topic());
        return;
    }

    let payload = match publisher.next_payload() {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode dependum: {}", e);
            return;
        }
    };

    match client.publish(publisher.topic(), &payload).await {
        Ok(()) => debug!(
            "Dependum published to {} ({} bytes)",
            publisher.topic(),
            payload.len()
        ),
        Err(e) => warn!("Failed to publish dependum to {}: {}", publisher.topic(), e),
    }
}

/// Services the session until `shutdown` is cancelled
///
/// Returns the bootstrap so the caller decides what happens to the client.
/// Fails only when a reconnect under a bounded policy gives up.
pub async fn run_until_shutdown(
    mut online: ConnectivityBootstrap<Online>,
    publishers: Vec<Publisher>,
    shutdown: CancellationToken,
) -> Result<ConnectivityBootstrap<Online>, BootstrapError> {
    info!(
        "Entering service loop with {} publisher(s)",
        publishers.len()
    );

    let start = Instant::now();
    let mut schedule: Vec<Scheduled> = publishers
        .into_iter()
        .map(|publisher| Scheduled {
            due: start + publisher.interval(),
            publisher,
        })
        .collect();

    loop {
        let next_due = schedule.iter().map(|entry| entry.due).min();
        // Disabled branch still needs a deadline to build its future
        let wake = next_due.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received, leaving service loop");
                break;
            }

            _ = tokio::time::sleep_until(wake), if next_due.is_some() => {
                let now = Instant::now();
                for entry in schedule.iter_mut().filter(|entry| entry.due <= now) {
                    publish_once(online.client_mut(), &mut entry.publisher).await;
                    entry.due = now + entry.publisher.interval();
                }
            }

            result = online.client_mut().poll() => {
                if let Err(e) = result {
                    warn!("MQTT session interrupted: {}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            info!("Shutdown signal received while reconnecting");
                            break;
                        }
                        reconnected = online.reconnect() => {
                            let attempts = reconnected?;
                            info!("Session restored after {} attempts", attempts);
                        }
                    }
                }
            }
        }
    }

    Ok(online)
}
