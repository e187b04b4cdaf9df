use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
};
use tracing::{debug, info, warn};

use super::client::{ConnectError, MessageCallback, MqttClient, MqttError};
use super::config::MqttConfig;
use crate::topic;

/// `Connected` holds exactly while a session is open
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
}

/// [`MqttClient`] backed by rumqttc
///
/// Every `connect` builds a fresh `AsyncClient`/`EventLoop` pair, so a
/// reconnect never inherits queued requests from a dead session.
pub struct RumqttClient {
    server: Option<(String, u16)>,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connect_timeout: Duration,
    request_capacity: usize,
    callback: Option<MessageCallback>,
    session: Option<Session>,
    last_error: Option<ConnectError>,
    state: ConnectionState,
}

impl RumqttClient {
    pub fn new(config: &MqttConfig) -> Self {
        RumqttClient {
            server: None,
            credentials: None,
            keep_alive: Duration::from_secs(config.keep_alive_secs.max(1)),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            request_capacity: config.request_capacity.max(1),
            callback: None,
            session: None,
            last_error: None,
            state: ConnectionState::Disconnected,
        }
    }

    fn options(&self, client_id: &str) -> Result<MqttOptions, ConnectError> {
        let (host, port) = self
            .server
            .clone()
            .ok_or(ConnectError::ServerNotConfigured)?;
        if client_id.is_empty() || client_id.starts_with(' ') {
            return Err(ConnectError::IdentifierRejected);
        }
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(self.keep_alive);
        if let Some((user, pw)) = &self.credentials {
            options.set_credentials(user.clone(), pw.clone());
        }
        Ok(options)
    }

    fn drop_session(&mut self, reason: &str) {
        if self.session.take().is_some() {
            warn!("MQTT session lost: {}", reason);
        }
        self.state = ConnectionState::Disconnected;
    }

    fn session(&mut self) -> Result<&mut Session, MqttError> {
        self.session.as_mut().ok_or(MqttError::NotConnected)
    }
}

/// Maps a CONNACK return code to the connect result
fn classify(code: ConnectReturnCode) -> Result<(), ConnectError> {
    match code {
        ConnectReturnCode::Success => Ok(()),
        ConnectReturnCode::RefusedProtocolVersion => Err(ConnectError::UnacceptableProtocolVersion),
        ConnectReturnCode::BadClientId => Err(ConnectError::IdentifierRejected),
        ConnectReturnCode::ServiceUnavailable => Err(ConnectError::ServerUnavailable),
        ConnectReturnCode::BadUserNamePassword => Err(ConnectError::BadUserNameOrPassword),
        ConnectReturnCode::NotAuthorized => Err(ConnectError::NotAuthorized),
        #[allow(unreachable_patterns)]
        _ => Err(ConnectError::ServerUnavailable),
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), ConnectError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => return classify(ack.code),
            Ok(event) => debug!("Event before CONNACK: {:?}", event),
            Err(ConnectionError::ConnectionRefused(code)) => return classify(code),
            Err(e) => return Err(ConnectError::Refused(e.to_string())),
        }
    }
}

#[async_trait]
impl MqttClient for RumqttClient {
    fn set_server(&mut self, host: &str, port: u16) {
        debug!("Broker set to {}:{}", host, port);
        self.server = Some((host.to_string(), port));
    }

    fn set_credentials(&mut self, user: &str, password: &str) {
        self.credentials = Some((user.to_string(), password.to_string()));
    }

    fn set_callback(&mut self, callback: MessageCallback) {
        self.callback = Some(callback);
    }

    async fn connect(&mut self, client_id: &str) -> Result<(), ConnectError> {
        self.session = None;
        self.state = ConnectionState::Connecting;

        let result = match self.options(client_id) {
            Ok(options) => {
                let (client, mut eventloop) = AsyncClient::new(options, self.request_capacity);
                match tokio::time::timeout(self.connect_timeout, wait_for_connack(&mut eventloop))
                    .await
                {
                    Ok(Ok(())) => {
                        self.session = Some(Session { client, eventloop });
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ConnectError::Timeout),
                }
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                info!("Connected to MQTT broker as '{}'", client_id);
                self.state = ConnectionState::Connected;
                self.last_error = None;
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                self.last_error = Some(e.clone());
            }
        }
        result
    }

    fn connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        topic::validate_topic_filter(topic)?;
        let session = self.session()?;
        session
            .client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| MqttError::Request(e.to_string()))?;
        info!("Subscribed to {}", topic);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        topic::validate_topic_name(topic)?;
        let session = self.session()?;
        session
            .client
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .await
            .map_err(|e| MqttError::Request(e.to_string()))?;
        Ok(())
    }

    fn connect_error(&self) -> Option<ConnectError> {
        self.last_error.clone()
    }

    async fn poll(&mut self) -> Result<(), MqttError> {
        let session = self.session()?;
        match session.eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!("Received {} bytes on {}", publish.payload.len(), publish.topic);
                if let Some(callback) = self.callback.as_mut() {
                    callback(&publish.topic, &publish.payload[..]);
                }
                Ok(())
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                self.drop_session("broker sent DISCONNECT");
                Err(MqttError::ConnectionLost("broker sent DISCONNECT".to_string()))
            }
            Ok(_) => Ok(()),
            Err(e) => {
                let reason = e.to_string();
                self.drop_session(&reason);
                Err(MqttError::ConnectionLost(reason))
            }
        }
    }
}
