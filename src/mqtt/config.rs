use crate::topic::TopicRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker address and optional credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerServer {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pw: Option<String>,
}

impl BrokerServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: None,
            pw: None,
        }
    }

    /// Credentials are only usable when both parts are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.pw) {
            (Some(user), Some(pw)) => Some((user.as_str(), pw.as_str())),
            _ => None,
        }
    }
}

impl Default for BrokerServer {
    fn default() -> Self {
        Self::new("broker.hivemq.com", 1883)
    }
}

impl fmt::Display for BrokerServer {
    /// Formats as "user@host:port", password excluded
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}@{}:{}", user, self.host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Debug for BrokerServer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BrokerServer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pw", &self.pw.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Client-side MQTT settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub client_id: String,
    /// Filters subscribed, in order, right after every successful connect
    pub topics: Vec<TopicRef>,
    pub keep_alive_secs: u64,
    /// Upper bound for a single connect attempt (TCP + CONNACK)
    pub connect_timeout_ms: u64,
    /// Capacity of the rumqttc request queue
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            client_id: "connectivity-bootstrap".to_string(),
            topics: vec![TopicRef::dependum(
                "devices",
                "connectivity-bootstrap",
                "listener",
            )],
            keep_alive_secs: 5,
            connect_timeout_ms: 5_000,
            request_capacity: 100,
        }
    }
}
