use super::{WifiCredentials, WifiDriver, WifiError, WifiStatus};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Host driver that treats the link as up once a TCP probe succeeds
///
/// Association itself is left to the operating system; `begin` only records
/// which network was requested so that `status` starts probing.
#[derive(Debug)]
pub struct ProbeWifiDriver {
    probe_address: String,
    probe_timeout: Duration,
    requested_ssid: Option<String>,
}

impl ProbeWifiDriver {
    pub fn new(probe_address: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            probe_address: probe_address.into(),
            probe_timeout,
            requested_ssid: None,
        }
    }
}

#[async_trait]
impl WifiDriver for ProbeWifiDriver {
    async fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
        if credentials.ssid.is_empty() {
            return Err(WifiError::Rejected("empty SSID".to_string()));
        }
        info!("Requesting association with network '{}'", credentials.ssid);
        self.requested_ssid = Some(credentials.ssid.clone());
        Ok(())
    }

    async fn status(&mut self) -> WifiStatus {
        if self.requested_ssid.is_none() {
            return WifiStatus::Disconnected;
        }

        match tokio::time::timeout(self.probe_timeout, TcpStream::connect(&self.probe_address))
            .await
        {
            Ok(Ok(_stream)) => WifiStatus::Connected,
            Ok(Err(e)) => {
                debug!("Probe to {} failed: {}", self.probe_address, e);
                WifiStatus::Connecting
            }
            Err(_) => {
                debug!("Probe to {} timed out", self.probe_address);
                WifiStatus::Connecting
            }
        }
    }
}

/// Link that is always up, for hosts on a wired network
#[derive(Debug, Default)]
pub struct WiredLink;

#[async_trait]
impl WifiDriver for WiredLink {
    async fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
        debug!("Wired link ignores association with '{}'", credentials.ssid);
        Ok(())
    }

    async fn status(&mut self) -> WifiStatus {
        WifiStatus::Connected
    }
}
