//! # Network Link Module
//!
//! Abstraction over the layer that associates the device with a network.
//! The bootstrap only needs two things from it: a way to request association
//! with a set of credentials, and a way to ask whether the link is up.
//!
//! ```text
//! wifi/
//! ├── mod.rs    - WifiDriver port, status and credential types
//! └── probe.rs  - Host drivers (TCP reachability probe, wired link)
//! ```

pub mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Link status as reported by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WifiStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for WifiStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            WifiStatus::Disconnected => "disconnected",
            WifiStatus::Connecting => "connecting",
            WifiStatus::Connected => "connected",
        };
        write!(f, "{}", label)
    }
}

/// Network identifier and secret
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for WifiCredentials {
    // Password stays out of logs
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum WifiError {
    #[error("Association request rejected: {0}")]
    Rejected(String),

    #[error("Driver failure: {0}")]
    Driver(String),
}

/// Port to the network driver
///
/// `begin` may be called repeatedly while the link is down; drivers must
/// treat a repeated call as a fresh association request.
#[async_trait]
pub trait WifiDriver: Send {
    async fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError>;

    async fn status(&mut self) -> WifiStatus;
}
