use chrono::NaiveDateTime;
use std::fmt;
use tokio::sync::mpsc;

const PREVIEW_CHARS: usize = 10;

/// Inbound message as handed to consumers of the forwarding callback
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MQTTMessage {
    topic: String,
    content: String,
    timestamp: NaiveDateTime,
}

impl fmt::Display for MQTTMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.content.chars().take(PREVIEW_CHARS).collect();
        write!(f, "{} - {}", self.timestamp, preview)
    }
}

impl MQTTMessage {
    pub fn from_topic(topic: String, content: String) -> Self {
        MQTTMessage {
            topic,
            content,
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    /// Builds a message from raw payload bytes, replacing invalid UTF-8
    pub fn from_payload(topic: &str, payload: &[u8]) -> Self {
        Self::from_topic(
            topic.to_string(),
            String::from_utf8_lossy(payload).into_owned(),
        )
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn render(&self) -> String {
        format!("{}: {}\n{}", self.timestamp, self.topic, self.content)
    }
}

/// Both ends of the inbound message route
pub struct MsgManager {
    pub received_msg: mpsc::Sender<MQTTMessage>,
    pub distribution_msg: mpsc::Receiver<MQTTMessage>,
}

impl MsgManager {
    pub fn with_capacity(capacity: usize) -> Self {
        let (received_msg, distribution_msg) = mpsc::channel(capacity);
        Self {
            received_msg,
            distribution_msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_handles_short_content() {
        let msg = MQTTMessage::from_topic("t".into(), "abc".into());
        assert!(msg.to_string().ends_with(" - abc"));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let msg = MQTTMessage::from_topic("t".into(), "äöüäöüäöüäöüäöü".into());
        assert!(msg.to_string().ends_with(" - äöüäöüäöüä"));
    }

    #[test]
    fn invalid_utf8_payload_is_replaced() {
        let msg = MQTTMessage::from_payload("sensors/raw", &[0x66, 0xff, 0x6f]);
        assert_eq!(msg.topic(), "sensors/raw");
        assert_eq!(msg.content(), "f\u{fffd}o");
        assert!(msg.render().contains("sensors/raw"));
    }
}
