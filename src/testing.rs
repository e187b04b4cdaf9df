//! Recording collaborators for unit tests

use crate::mqtt::{ConnectError, MessageCallback, MqttClient, MqttError};
use crate::wifi::{WifiCredentials, WifiDriver, WifiError, WifiStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct WifiRecord {
    begins: usize,
    last_ssid: Option<String>,
}

#[derive(Clone, Default)]
pub struct WifiLog(Arc<Mutex<WifiRecord>>);

impl WifiLog {
    pub fn begins(&self) -> usize {
        self.0.lock().unwrap().begins
    }

    pub fn last_ssid(&self) -> Option<String> {
        self.0.lock().unwrap().last_ssid.clone()
    }
}

/// Answers `status` from a script, then repeats `fallback`
pub struct ScriptedWifi {
    statuses: VecDeque<WifiStatus>,
    fallback: WifiStatus,
    pub fail_begin: bool,
    log: WifiLog,
}

impl ScriptedWifi {
    pub fn new(statuses: Vec<WifiStatus>, fallback: WifiStatus) -> (Self, WifiLog) {
        let log = WifiLog::default();
        let driver = Self {
            statuses: statuses.into(),
            fallback,
            fail_begin: false,
            log: log.clone(),
        };
        (driver, log)
    }
}

#[async_trait]
impl WifiDriver for ScriptedWifi {
    async fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
        {
            let mut record = self.log.0.lock().unwrap();
            record.begins += 1;
            record.last_ssid = Some(credentials.ssid.clone());
        }
        if self.fail_begin {
            return Err(WifiError::Driver("radio busy".to_string()));
        }
        Ok(())
    }

    async fn status(&mut self) -> WifiStatus {
        self.statuses.pop_front().unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    SetServer(String, u16),
    SetCredentials(String),
    SetCallback,
    Connect(String),
    Subscribe(String),
    Publish(String, Vec<u8>),
}

#[derive(Clone, Default)]
pub struct MqttLog(Arc<Mutex<Vec<MockCall>>>);

impl MqttLog {
    fn push(&self, call: MockCall) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Connect(_)))
            .count()
    }

    pub fn subscribes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Subscribe(_)))
            .count()
    }

    pub fn publishes(&self) -> Vec<(String, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Publish(topic, payload) => Some((topic, payload)),
                _ => None,
            })
            .collect()
    }
}

/// What the next `poll` on a connected [`MockMqtt`] does
pub enum PollStep {
    Deliver(String, Vec<u8>),
    DropConnection,
}

/// Answers `connect` from a script, then repeats `fallback`
///
/// `poll` replays `poll_steps` and then stays pending, like an idle session.
pub struct MockMqtt {
    connect_results: VecDeque<Result<(), ConnectError>>,
    fallback: Result<(), ConnectError>,
    connected: bool,
    callback: Option<MessageCallback>,
    last_error: Option<ConnectError>,
    pub poll_steps: VecDeque<PollStep>,
    pub fail_subscribe: bool,
    pub fail_publish: bool,
    log: MqttLog,
}

impl MockMqtt {
    pub fn new(
        connect_results: Vec<Result<(), ConnectError>>,
        fallback: Result<(), ConnectError>,
    ) -> (Self, MqttLog) {
        let log = MqttLog::default();
        let client = Self {
            connect_results: connect_results.into(),
            fallback,
            connected: false,
            callback: None,
            last_error: None,
            poll_steps: VecDeque::new(),
            fail_subscribe: false,
            fail_publish: false,
            log: log.clone(),
        };
        (client, log)
    }
}

#[async_trait]
impl MqttClient for MockMqtt {
    fn set_server(&mut self, host: &str, port: u16) {
        self.log.push(MockCall::SetServer(host.to_string(), port));
    }

    fn set_credentials(&mut self, user: &str, _password: &str) {
        self.log.push(MockCall::SetCredentials(user.to_string()));
    }

    fn set_callback(&mut self, callback: MessageCallback) {
        self.log.push(MockCall::SetCallback);
        self.callback = Some(callback);
    }

    async fn connect(&mut self, client_id: &str) -> Result<(), ConnectError> {
        self.log.push(MockCall::Connect(client_id.to_string()));
        let result = self
            .connect_results
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        self.connected = result.is_ok();
        self.last_error = result.clone().err();
        result
    }

    fn connected(&self) -> bool {
        self.connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        self.log.push(MockCall::Subscribe(topic.to_string()));
        if self.fail_subscribe {
            return Err(MqttError::Request("SUBACK failure".to_string()));
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        if !self.connected {
            return Err(MqttError::NotConnected);
        }
        self.log
            .push(MockCall::Publish(topic.to_string(), payload.to_vec()));
        if self.fail_publish {
            return Err(MqttError::Request("queue full".to_string()));
        }
        Ok(())
    }

    fn connect_error(&self) -> Option<ConnectError> {
        self.last_error.clone()
    }

    async fn poll(&mut self) -> Result<(), MqttError> {
        if !self.connected {
            return Err(MqttError::NotConnected);
        }
        match self.poll_steps.pop_front() {
            Some(PollStep::Deliver(topic, payload)) => {
                if let Some(callback) = self.callback.as_mut() {
                    callback(topic.as_str(), payload.as_slice());
                }
                Ok(())
            }
            Some(PollStep::DropConnection) => {
                self.connected = false;
                Err(MqttError::ConnectionLost("scripted drop".to_string()))
            }
            None => std::future::pending().await,
        }
    }
}
