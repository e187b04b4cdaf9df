//! Inbound message callbacks
//!
//! None of these may panic: a callback runs inside the client's poll loop and
//! a panic there would take the whole session down.

use super::client::MessageCallback;
use super::message_manager::MQTTMessage;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Logs the topic and payload size of every message
pub fn log_callback() -> MessageCallback {
    Box::new(|topic: &str, payload: &[u8]| {
        info!("Message arrived on topic: {} ({} bytes)", topic, payload.len());
    })
}

/// Parses payloads as JSON dependum documents and logs their fields
pub fn dependum_callback() -> MessageCallback {
    Box::new(|topic: &str, payload: &[u8]| {
        info!("Message on topic: {}", topic);
        match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(serde_json::Value::Object(fields)) => {
                debug!("Dependum data received:");
                for (key, value) in fields.iter() {
                    debug!("  {}: {}", key, value);
                }
            }
            Ok(other) => debug!("Non-object JSON payload: {}", other),
            Err(e) => warn!("Error parsing JSON message on {}: {}", topic, e),
        }
    })
}

/// Forwards messages into a bounded channel
///
/// Drops the message when the channel is full or closed; the poll loop must
/// never wait on a slow consumer.
pub fn forwarding_callback(sender: mpsc::Sender<MQTTMessage>) -> MessageCallback {
    Box::new(move |topic: &str, payload: &[u8]| {
        debug!("Message arrived on topic: {}", topic);
        let message = MQTTMessage::from_payload(topic, payload);
        if let Err(e) = sender.try_send(message) {
            warn!("Dropping message on {}: {}", topic, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn awkward_payloads() -> Vec<Vec<u8>> {
        vec![
            Vec::new(),
            b"{\"temp\": 21.5}".to_vec(),
            b"[1,2,3]".to_vec(),
            b"{not json".to_vec(),
            vec![0xff, 0xfe, 0x00, 0x80],
            vec![b'x'; 64 * 1024],
        ]
    }

    #[test]
    fn log_callback_accepts_any_payload() {
        let mut callback = log_callback();
        for payload in awkward_payloads() {
            let before = payload.clone();
            callback("sensors/temp", &payload);
            assert_eq!(payload, before);
        }
    }

    #[test]
    fn dependum_callback_accepts_any_payload() {
        let mut callback = dependum_callback();
        for payload in awkward_payloads() {
            let before = payload.clone();
            callback("sensors/temp", &payload);
            assert_eq!(payload, before);
        }
    }

    #[tokio::test]
    async fn forwarding_callback_delivers_messages() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut callback = forwarding_callback(tx);

        callback("actuators/valve", b"open");
        callback("actuators/valve", b"");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.topic(), "actuators/valve");
        assert_eq!(first.content(), "open");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.content(), "");
    }

    #[test]
    fn forwarding_callback_drops_when_full_or_closed() {
        let (tx, rx) = mpsc::channel(1);
        let mut callback = forwarding_callback(tx);

        callback("a", b"1");
        callback("a", b"2");
        drop(rx);
        callback("a", b"3");
    }
}
