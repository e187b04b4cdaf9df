//! # MQTT Integration Module
//!
//! Broker-side half of the connectivity bootstrap. The bootstrap talks to the
//! broker only through the [`client::MqttClient`] port so that the connect
//! loop can be driven by the real rumqttc client in production and by
//! recording mocks in tests.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── client.rs           - MqttClient port, connect/transport errors
//! ├── callback.rs         - Inbound message callbacks (log, JSON, forward)
//! ├── config.rs           - Broker address and client settings
//! ├── message_manager.rs  - Message representation and routing
//! └── mqtt_handler.rs     - rumqttc-backed client with connection state
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Broker ──► EventLoop::poll ──► MessageCallback ──► log / JSON / mpsc channel
//!    ▲
//!    └── AsyncClient::publish ◄── Runtime publishers
//! ```

pub mod callback;
pub mod client;
pub mod config;
pub mod message_manager;
pub mod mqtt_handler;

pub use client::{ConnectError, MessageCallback, MqttClient, MqttError};
