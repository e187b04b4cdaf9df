//! Configuration files
//!
//! Two TOML files live in the config directory:
//!
//! ```text
//! $CONNECTIVITY_BOOTSTRAP_DIR or ~/.config/connectivity-bootstrap/
//! ├── bootstrap.toml  - client id, topics, retry policies, drivers, publishers
//! └── secrets.toml    - WiFi and broker credentials (mode 0600)
//! ```
//!
//! Both are created with defaults on first start. Missing keys fall back to
//! defaults, so older files keep loading after new settings are added.

use crate::bootstrap::BootstrapSettings;
use crate::mqtt::config::{BrokerServer, MqttConfig};
use crate::retry::RetryPolicy;
use crate::runtime::PublisherConfig;
use crate::topic::TopicRef;
use crate::wifi::probe::{ProbeWifiDriver, WiredLink};
use crate::wifi::{WifiCredentials, WifiDriver};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_DIR_ENV: &str = "CONNECTIVITY_BOOTSTRAP_DIR";
const APP_DIR: &str = "connectivity-bootstrap";
const BOOTSTRAP_FILE: &str = "bootstrap.toml";
const SECRETS_FILE: &str = "secrets.toml";

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WifiDriverKind {
    /// Link is up once a TCP probe succeeds
    #[default]
    Probe,
    /// Link is always up
    Wired,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WifiConfig {
    pub driver: WifiDriverKind,
    pub probe_address: String,
    pub probe_timeout_ms: u64,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            driver: WifiDriverKind::Probe,
            probe_address: "1.1.1.1:53".to_string(),
            probe_timeout_ms: 2_000,
        }
    }
}

impl WifiConfig {
    pub fn build_driver(&self) -> Box<dyn WifiDriver> {
        match self.driver {
            WifiDriverKind::Probe => Box::new(ProbeWifiDriver::new(
                self.probe_address.clone(),
                Duration::from_millis(self.probe_timeout_ms),
            )),
            WifiDriverKind::Wired => Box::new(WiredLink),
        }
    }
}

/// Which callback handles inbound messages
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageHandler {
    /// Log topic and size
    Log,
    /// Parse JSON and log fields
    Dependum,
    /// Forward to the message consumer task
    #[default]
    Forward,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BootstrapConfig {
    pub debug: bool,
    pub message_handler: MessageHandler,
    pub mqtt: MqttConfig,
    pub wifi: WifiConfig,
    pub wifi_retry: RetryPolicy,
    pub mqtt_retry: RetryPolicy,
    pub publishers: Vec<PublisherConfig>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            debug: false,
            message_handler: MessageHandler::default(),
            mqtt: MqttConfig::default(),
            wifi: WifiConfig::default(),
            wifi_retry: RetryPolicy::wifi_default(),
            mqtt_retry: RetryPolicy::mqtt_default(),
            publishers: Vec::new(),
        }
    }
}

/// Credentials kept apart from the regular settings
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Secrets {
    pub ssid: String,
    pub password: String,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_user: Option<String>,
    pub mqtt_pass: Option<String>,
}

impl Default for Secrets {
    fn default() -> Self {
        Self {
            ssid: "your_SSID".to_string(),
            password: "your_PASSWORD".to_string(),
            mqtt_broker: "broker.hivemq.com".to_string(),
            mqtt_port: 1883,
            mqtt_user: None,
            mqtt_pass: None,
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("ssid", &self.ssid)
            .field("mqtt_broker", &self.mqtt_broker)
            .field("mqtt_port", &self.mqtt_port)
            .field("mqtt_user", &self.mqtt_user)
            .finish_non_exhaustive()
    }
}

impl Secrets {
    pub fn credentials(&self) -> WifiCredentials {
        WifiCredentials::new(self.ssid.clone(), self.password.clone())
    }

    pub fn broker(&self) -> BrokerServer {
        BrokerServer {
            host: self.mqtt_broker.clone(),
            port: self.mqtt_port,
            user: self.mqtt_user.clone(),
            pw: self.mqtt_pass.clone(),
        }
    }
}

/// Combines both files into what the boot sequence reads
pub fn bootstrap_settings(config: &BootstrapConfig, secrets: &Secrets) -> BootstrapSettings {
    BootstrapSettings {
        credentials: secrets.credentials(),
        broker: secrets.broker(),
        client_id: config.mqtt.client_id.clone(),
        topics: config.mqtt.topics.iter().map(TopicRef::resolve).collect(),
        debug: config.debug,
        wifi_retry: config.wifi_retry.clone(),
        mqtt_retry: config.mqtt_retry.clone(),
    }
}

/// Reads and writes the configuration directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$CONNECTIVITY_BOOTSTRAP_DIR`, else the platform config directory
    pub fn resolve() -> Result<Self> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(Self::at(dir));
        }
        let mut dir = dirs::config_dir()
            .ok_or_else(|| eyre!("No config directory available on this platform"))?;
        dir.push(APP_DIR);
        Ok(Self::at(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bootstrap_path(&self) -> PathBuf {
        self.dir.join(BOOTSTRAP_FILE)
    }

    fn secrets_path(&self) -> PathBuf {
        self.dir.join(SECRETS_FILE)
    }

    /// Writes default files for whatever is missing
    pub async fn ensure_default_config(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| eyre!("Failed to create config directory {:?}: {}", self.dir, e))?;

        let bootstrap_path = self.bootstrap_path();
        if !tokio::fs::try_exists(&bootstrap_path)
            .await
            .map_err(|e| eyre!("Failed to check {:?}: {}", bootstrap_path, e))?
        {
            info!("Writing default config to {:?}", bootstrap_path);
            self.save_config(&BootstrapConfig::default()).await?;
        }

        let secrets_path = self.secrets_path();
        if !tokio::fs::try_exists(&secrets_path)
            .await
            .map_err(|e| eyre!("Failed to check {:?}: {}", secrets_path, e))?
        {
            info!("Writing placeholder secrets to {:?}", secrets_path);
            self.save_secrets(&Secrets::default()).await?;
        }
        Ok(())
    }

    pub async fn load(&self) -> Result<(BootstrapConfig, Secrets)> {
        let config = read_toml(&self.bootstrap_path()).await?;
        let secrets = read_toml(&self.secrets_path()).await?;
        debug!("Loaded configuration from {:?}", self.dir);
        Ok((config, secrets))
    }

    pub async fn save_config(&self, config: &BootstrapConfig) -> Result<()> {
        write_toml(&self.bootstrap_path(), config).await
    }

    pub async fn save_secrets(&self, secrets: &Secrets) -> Result<()> {
        let path = self.secrets_path();
        write_toml(&path, secrets).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| eyre!("Failed to restrict permissions of {:?}: {}", path, e))?;
        }
        Ok(())
    }
}

async fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("Failed to read {:?}: {}", path, e))?;
    toml::from_str(&content).map_err(|e| eyre!("Failed to parse {:?}: {}", path, e))
}

async fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content =
        toml::to_string_pretty(value).map_err(|e| eyre!("Failed to serialize {:?}: {}", path, e))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write {:?}: {}", path, e))
}
