//! Topic naming and validation
//!
//! Components exchange telemetry on `{system}/{component}/{thread}/dependum`.
//! Validation follows the MQTT 3.1.1 rules for topic names and filters.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_TOPIC_LEN: usize = 65_535;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("Topic must not be empty")]
    Empty,

    #[error("Topic is {0} bytes long, limit is 65535")]
    TooLong(usize),

    #[error("Topic contains a NUL character")]
    NulCharacter,

    #[error("Wildcard '{0}' is not allowed in a topic name")]
    WildcardInName(char),

    #[error("Wildcard '{wildcard}' must occupy a whole level in '{filter}'")]
    MisplacedWildcard { wildcard: char, filter: String },
}

/// Builds the telemetry topic for a component thread
pub fn dependum_topic(system: &str, component: &str, thread: &str) -> String {
    format!(
        "{}/{}/{}/dependum",
        sanitize_segment(system),
        sanitize_segment(component),
        sanitize_segment(thread)
    )
}

/// A topic as written in the config: either literal or a component thread
///
/// ```toml
/// topics = [
///     "greenhouse/+/+/dependum",
///     { system = "greenhouse", component = "pump", thread = "valve" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicRef {
    Literal(String),
    Dependum {
        system: String,
        component: String,
        thread: String,
    },
}

impl TopicRef {
    pub fn dependum(
        system: impl Into<String>,
        component: impl Into<String>,
        thread: impl Into<String>,
    ) -> Self {
        TopicRef::Dependum {
            system: system.into(),
            component: component.into(),
            thread: thread.into(),
        }
    }

    pub fn resolve(&self) -> String {
        match self {
            TopicRef::Literal(topic) => topic.clone(),
            TopicRef::Dependum {
                system,
                component,
                thread,
            } => dependum_topic(system, component, thread),
        }
    }
}

impl From<&str> for TopicRef {
    fn from(topic: &str) -> Self {
        TopicRef::Literal(topic.to_string())
    }
}

impl fmt::Display for TopicRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.resolve())
    }
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '+' | '#' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

fn validate_common(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(TopicError::TooLong(topic.len()));
    }
    if topic.contains('\0') {
        return Err(TopicError::NulCharacter);
    }
    Ok(())
}

/// Checks a topic used for publishing (no wildcards)
pub fn validate_topic_name(topic: &str) -> Result<(), TopicError> {
    validate_common(topic)?;
    if let Some(wildcard) = topic.chars().find(|c| *c == '+' || *c == '#') {
        return Err(TopicError::WildcardInName(wildcard));
    }
    Ok(())
}

/// Checks a topic filter used for subscribing
pub fn validate_topic_filter(filter: &str) -> Result<(), TopicError> {
    validate_common(filter)?;

    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    for (idx, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != "#" || idx != last) {
            return Err(TopicError::MisplacedWildcard {
                wildcard: '#',
                filter: filter.to_string(),
            });
        }
        if level.contains('+') && *level != "+" {
            return Err(TopicError::MisplacedWildcard {
                wildcard: '+',
                filter: filter.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependum_topic_is_sanitized() {
        assert_eq!(
            dependum_topic("Greenhouse", "Soil Moisture", "pump/1"),
            "greenhouse/soil_moisture/pump_1/dependum"
        );
    }

    #[test]
    fn topic_refs_resolve_from_either_form() {
        #[derive(Deserialize)]
        struct Topics {
            topics: Vec<TopicRef>,
        }

        let parsed: Topics = toml::from_str(
            r#"
            topics = [
                "greenhouse/+/+/dependum",
                { system = "Greenhouse", component = "Pump", thread = "valve 2" },
            ]
            "#,
        )
        .unwrap();

        let resolved: Vec<String> = parsed.topics.iter().map(TopicRef::resolve).collect();
        assert_eq!(
            resolved,
            vec![
                "greenhouse/+/+/dependum".to_string(),
                "greenhouse/pump/valve_2/dependum".to_string(),
            ]
        );
        assert_eq!(
            parsed.topics[1],
            TopicRef::dependum("Greenhouse", "Pump", "valve 2")
        );
    }

    #[test]
    fn names_reject_wildcards() {
        assert!(validate_topic_name("sensors/temp").is_ok());
        assert_eq!(
            validate_topic_name("sensors/+"),
            Err(TopicError::WildcardInName('+'))
        );
        assert_eq!(validate_topic_name(""), Err(TopicError::Empty));
        assert_eq!(
            validate_topic_name("a\0b"),
            Err(TopicError::NulCharacter)
        );
    }

    #[test]
    fn filters_accept_whole_level_wildcards() {
        for ok in ["#", "+", "a/+/c", "a/b/#", "+/+/#", "/leading"] {
            assert!(validate_topic_filter(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn filters_reject_partial_level_wildcards() {
        for bad in ["a/#/c", "a/b#", "a+/b", "sport+"] {
            assert!(validate_topic_filter(bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn overlong_topic_is_rejected() {
        let topic = "a".repeat(MAX_TOPIC_LEN + 1);
        assert_eq!(
            validate_topic_filter(&topic),
            Err(TopicError::TooLong(MAX_TOPIC_LEN + 1))
        );
    }
}
