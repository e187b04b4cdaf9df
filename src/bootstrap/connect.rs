//! Connect loops for the two boot phases
//!
//! Both loops wait with `tokio::time::sleep`, so other tasks keep running
//! while a phase retries.

use super::BootstrapError;
use crate::mqtt::config::BrokerServer;
use crate::mqtt::{MessageCallback, MqttClient};
use crate::retry::RetryPolicy;
use crate::topic;
use crate::wifi::{WifiCredentials, WifiDriver, WifiStatus};
use tracing::{debug, error, info, warn};

/// Logs at info level when verbose, at debug level otherwise
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// Waits until the driver reports [`WifiStatus::Connected`]
///
/// Each round checks the status first; while the link is down it issues a
/// new association request and waits for the policy's delay. Returns the
/// number of association requests made.
pub async fn connect_to_wifi(
    driver: &mut dyn WifiDriver,
    credentials: &WifiCredentials,
    policy: &RetryPolicy,
    verbose: bool,
) -> Result<u32, BootstrapError> {
    progress!(verbose, "Connecting to WiFi '{}'", credentials.ssid);

    let mut attempts: u32 = 0;
    loop {
        let status = driver.status().await;
        if status == WifiStatus::Connected {
            progress!(verbose, "Connected to WiFi after {} attempts", attempts);
            return Ok(attempts);
        }

        if policy.is_exhausted(attempts) {
            error!(
                "Giving up on WiFi '{}' after {} attempts",
                credentials.ssid, attempts
            );
            return Err(BootstrapError::WifiUnavailable {
                attempts,
                last_status: status,
            });
        }

        if let Err(e) = driver.begin(credentials).await {
            warn!("WiFi association request failed: {}", e);
        }
        attempts += 1;

        let delay = policy.delay_for(attempts);
        progress!(
            verbose,
            "WiFi {} (attempt {}), checking again in {:?}",
            status,
            attempts,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}

/// One-time client configuration: broker address, credentials and callback
pub fn mqtt_setup(client: &mut dyn MqttClient, broker: &BrokerServer, callback: MessageCallback) {
    debug!("Configuring MQTT client for {}", broker);
    client.set_server(&broker.host, broker.port);
    if let Some((user, pw)) = broker.credentials() {
        client.set_credentials(user, pw);
    }
    client.set_callback(callback);
}

/// Connects to the broker and subscribes to every filter in `topics`
///
/// The filters are subscribed in order, once each, right after the connect
/// that succeeded. Returns the number of connect attempts made.
pub async fn connect_to_mqtt(
    client: &mut dyn MqttClient,
    client_id: &str,
    topics: &[String],
    policy: &RetryPolicy,
    verbose: bool,
) -> Result<u32, BootstrapError> {
    for filter in topics {
        topic::validate_topic_filter(filter)?;
    }

    let mut attempts: u32 = 0;
    loop {
        progress!(verbose, "Attempting MQTT connection as '{}'", client_id);
        attempts += 1;

        if let Err(e) = client.connect(client_id).await {
            // Prefer the error the client recorded
            let last = client.connect_error().unwrap_or(e);
            if policy.is_exhausted(attempts) {
                error!(
                    "Giving up on MQTT broker after {} attempts, error code {}: {}",
                    attempts,
                    last.code(),
                    last
                );
                return Err(BootstrapError::BrokerUnavailable { attempts, last });
            }

            let delay = policy.delay_for(attempts);
            progress!(
                verbose,
                "MQTT connect failed, error code {} ({}). Retrying in {:?}",
                last.code(),
                last,
                delay
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        progress!(verbose, "Connected to MQTT broker");
        for filter in topics {
            client
                .subscribe(filter)
                .await
                .map_err(|source| BootstrapError::Subscribe {
                    topic: filter.clone(),
                    source,
                })?;
        }
        return Ok(attempts);
    }
}
