use async_trait::async_trait;
use thiserror::Error;

/// Receives every inbound publish as `(topic, payload)`
///
/// The payload is borrowed; callbacks that need it later must copy it.
pub type MessageCallback = Box<dyn FnMut(&str, &[u8]) + Send + 'static>;

/// Why a broker connect attempt failed
///
/// `code()` returns the numeric codes used by Arduino MQTT clients so that
/// console output stays comparable with device logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("No broker configured")]
    ServerNotConfigured,

    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Connection timed out")]
    Timeout,

    #[error("Broker rejected protocol version")]
    UnacceptableProtocolVersion,

    #[error("Broker rejected client identifier")]
    IdentifierRejected,

    #[error("Broker unavailable")]
    ServerUnavailable,

    #[error("Bad user name or password")]
    BadUserNameOrPassword,

    #[error("Not authorized")]
    NotAuthorized,
}

impl ConnectError {
    pub fn code(&self) -> i8 {
        match self {
            ConnectError::ServerNotConfigured => -3,
            ConnectError::Refused(_) => -2,
            ConnectError::Timeout => -1,
            ConnectError::UnacceptableProtocolVersion => 1,
            ConnectError::IdentifierRejected => 2,
            ConnectError::ServerUnavailable => 3,
            ConnectError::BadUserNameOrPassword => 4,
            ConnectError::NotAuthorized => 5,
        }
    }
}

/// Failures after a session was established
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Not connected to a broker")]
    NotConnected,

    #[error("Invalid topic: {0}")]
    InvalidTopic(#[from] crate::topic::TopicError),

    #[error("Client request failed: {0}")]
    Request(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

/// Port to the MQTT client library
#[async_trait]
pub trait MqttClient: Send {
    fn set_server(&mut self, host: &str, port: u16);

    /// Username/password for the CONNECT packet. Clients without
    /// authentication support may ignore this.
    fn set_credentials(&mut self, _user: &str, _password: &str) {}

    fn set_callback(&mut self, callback: MessageCallback);

    async fn connect(&mut self, client_id: &str) -> Result<(), ConnectError>;

    fn connected(&self) -> bool;

    async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError>;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError>;

    /// Error of the most recent failed connect, if any
    fn connect_error(&self) -> Option<ConnectError>;

    /// Services the session once: keep-alive, acknowledgements and callback
    /// dispatch for inbound messages
    async fn poll(&mut self) -> Result<(), MqttError>;
}
