use crate::mqtt::{ConnectError, MqttError};
use crate::topic::TopicError;
use crate::wifi::WifiStatus;
use thiserror::Error;

/// Errors that end a bootstrap phase
///
/// Only produced under a bounded retry policy; an unbounded policy keeps
/// retrying instead.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("WiFi not connected after {attempts} attempts (last status: {last_status})")]
    WifiUnavailable {
        attempts: u32,
        last_status: WifiStatus,
    },

    #[error("MQTT broker unreachable after {attempts} attempts (code {code}): {last}", code = .last.code())]
    BrokerUnavailable { attempts: u32, last: ConnectError },

    #[error("Failed to subscribe to {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: MqttError,
    },

    #[error("Invalid subscription topic: {0}")]
    InvalidTopic(#[from] TopicError),
}
