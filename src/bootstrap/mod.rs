//! Connectivity bootstrap with statum typestate
//!
//! Brings the device from power-on to a subscribed broker session. Each phase
//! is a state of the machine, so a broker connect before the network is up
//! does not compile.
//!
//! # State Machine
//!
//! ```text
//! Offline ──► NetworkReady ──► BrokerConfigured ──► Online
//!  (connect_to_wifi)   (mqtt_setup)    (connect_to_mqtt)  │  ▲
//!                                                         └──┘
//!                                                      (reconnect)
//! ```
//!
//! The driver and client are owned by the machine and handed back through
//! [`ConnectivityBootstrap::into_parts`].

mod connect;
mod error;

pub use connect::{connect_to_mqtt, connect_to_wifi, mqtt_setup};
pub use error::BootstrapError;

use crate::mqtt::config::BrokerServer;
use crate::mqtt::{MessageCallback, MqttClient};
use crate::retry::RetryPolicy;
use crate::wifi::{WifiCredentials, WifiDriver};
use statum::{machine, state};
use tracing::{info, warn};

/// Everything the boot sequence reads; fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub credentials: WifiCredentials,
    pub broker: BrokerServer,
    pub client_id: String,
    /// Resolved subscription filters
    pub topics: Vec<String>,
    /// Emit progress lines at info level
    pub debug: bool,
    pub wifi_retry: RetryPolicy,
    pub mqtt_retry: RetryPolicy,
}

#[state]
#[derive(Debug, Clone)]
pub enum BootstrapState {
    Offline,          // Nothing connected yet
    NetworkReady,     // Link reports connected
    BrokerConfigured, // Broker address and callback registered
    Online,           // Connected and subscribed
}

#[machine]
pub struct ConnectivityBootstrap<S: BootstrapState> {
    wifi: Box<dyn WifiDriver>,
    mqtt: Box<dyn MqttClient>,
    settings: BootstrapSettings,
}

impl<S: BootstrapState> ConnectivityBootstrap<S> {
    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Hands the driver and client back to the caller
    pub fn into_parts(self) -> (Box<dyn WifiDriver>, Box<dyn MqttClient>) {
        (self.wifi, self.mqtt)
    }
}

impl ConnectivityBootstrap<Offline> {
    pub fn create(
        wifi: Box<dyn WifiDriver>,
        mqtt: Box<dyn MqttClient>,
        settings: BootstrapSettings,
    ) -> Self {
        info!(
            "Bootstrap created for client '{}' on {}",
            settings.client_id, settings.broker
        );
        if settings.wifi_retry.is_unbounded() {
            warn!("WiFi retries have no attempt limit, boot blocks until the link is up");
        }
        if settings.mqtt_retry.is_unbounded() {
            warn!("MQTT retries have no attempt limit, boot blocks until the broker answers");
        }
        Self::new(wifi, mqtt, settings)
    }

    pub async fn connect_to_wifi(
        mut self,
    ) -> Result<ConnectivityBootstrap<NetworkReady>, BootstrapError> {
        connect_to_wifi(
            self.wifi.as_mut(),
            &self.settings.credentials,
            &self.settings.wifi_retry,
            self.settings.debug,
        )
        .await?;
        Ok(self.transition())
    }
}

impl ConnectivityBootstrap<NetworkReady> {
    pub fn mqtt_setup(mut self, callback: MessageCallback) -> ConnectivityBootstrap<BrokerConfigured> {
        mqtt_setup(self.mqtt.as_mut(), &self.settings.broker, callback);
        self.transition()
    }
}

impl ConnectivityBootstrap<BrokerConfigured> {
    pub async fn connect_to_mqtt(
        mut self,
    ) -> Result<ConnectivityBootstrap<Online>, BootstrapError> {
        connect_to_mqtt(
            self.mqtt.as_mut(),
            &self.settings.client_id,
            &self.settings.topics,
            &self.settings.mqtt_retry,
            self.settings.debug,
        )
        .await?;
        info!(
            "Bootstrap complete, subscribed to {:?}",
            self.settings.topics
        );
        Ok(self.transition())
    }
}

impl ConnectivityBootstrap<Online> {
    pub fn client_mut(&mut self) -> &mut dyn MqttClient {
        self.mqtt.as_mut()
    }

    pub fn client(&self) -> &dyn MqttClient {
        self.mqtt.as_ref()
    }

    pub fn client_id(&self) -> &str {
        &self.settings.client_id
    }

    pub fn topics(&self) -> &[String] {
        &self.settings.topics
    }

    /// Re-runs the broker connect loop after the session dropped
    ///
    /// Resubscribes every topic on success. The link is not re-checked; a
    /// dead link shows up as failed connects.
    pub async fn reconnect(&mut self) -> Result<u32, BootstrapError> {
        connect_to_mqtt(
            self.mqtt.as_mut(),
            &self.settings.client_id,
            &self.settings.topics,
            &self.settings.mqtt_retry,
            self.settings.debug,
        )
        .await
    }
}

/// Runs the whole boot sequence
pub async fn run(
    wifi: Box<dyn WifiDriver>,
    mqtt: Box<dyn MqttClient>,
    settings: BootstrapSettings,
    callback: MessageCallback,
) -> Result<ConnectivityBootstrap<Online>, BootstrapError> {
    ConnectivityBootstrap::create(wifi, mqtt, settings)
        .connect_to_wifi()
        .await?
        .mqtt_setup(callback)
        .connect_to_mqtt()
        .await
}
