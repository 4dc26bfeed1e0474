//! Publish events and the transactions they fold into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a publish log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// First event of a publish transaction
    PublishStart,
    /// Completion of a publish transaction
    PublishEnd,
    /// Any intermediate or unknown event, text preserved
    Other(String),
    /// Log line without an event field
    #[default]
    Unspecified,
}

impl EventKind {
    /// Whether this event closes its transaction.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::PublishEnd)
    }

    /// Whether this event opens its transaction.
    #[must_use]
    pub const fn is_start(&self) -> bool {
        matches!(self, Self::PublishStart)
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PublishStart" => Self::PublishStart,
            "PublishEnd" => Self::PublishEnd,
            "" => Self::Unspecified,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::PublishStart => "PublishStart".to_string(),
            EventKind::PublishEnd => "PublishEnd".to_string(),
            EventKind::Other(text) => text,
            EventKind::Unspecified => String::new(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublishStart => write!(f, "PublishStart"),
            Self::PublishEnd => write!(f, "PublishEnd"),
            Self::Other(text) => write!(f, "{text}"),
            Self::Unspecified => Ok(()),
        }
    }
}

/// One publish log line as returned by the search backend.
///
/// Field names follow the log line keys so events round-trip unchanged to
/// downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishEvent {
    /// Content type of the published document
    #[serde(default)]
    pub content_type: String,
    /// Event kind (`PublishStart`, `PublishEnd`, ...)
    #[serde(default)]
    pub event: EventKind,
    /// Validation flag reported by the publishing service
    #[serde(rename = "isValid", default, skip_serializing_if = "String::is_empty")]
    pub is_valid: String,
    /// Log level
    #[serde(default)]
    pub level: String,
    /// Service that emitted the event
    #[serde(default)]
    pub service_name: String,
    /// Event timestamp as logged
    #[serde(rename = "@time", default)]
    pub time: String,
    /// Correlating transaction id
    #[serde(default)]
    pub transaction_id: String,
    /// Content uuid
    #[serde(default)]
    pub uuid: String,
    /// Cluster environment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub environment: String,
    /// Publishing platform
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,
    /// Free-form message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

/// All events observed for one transaction id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Unique key of the transaction
    pub transaction_id: String,
    /// Last non-empty uuid seen across the events
    pub uuid: String,
    /// Whether a `PublishEnd` event was observed
    #[serde(rename = "closed_txn")]
    pub closed: bool,
    /// Number of events folded into this transaction
    #[serde(rename = "eventcount")]
    pub event_count: usize,
    /// Timestamp of the `PublishStart` event, if seen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Events in arrival order
    pub events: Vec<PublishEvent>,
}

impl TransactionEvent {
    /// Start an empty, open transaction.
    #[must_use]
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            ..Self::default()
        }
    }

    /// Fold one event into the transaction.
    pub fn record(&mut self, event: PublishEvent) {
        if !event.uuid.is_empty() {
            self.uuid.clone_from(&event.uuid);
        }
        if event.event.is_start() {
            self.start_time = Some(event.time.clone());
        }
        if event.event.is_end() {
            self.closed = true;
        }
        self.event_count += 1;
        self.events.push(event);
    }

    /// Whether any event carries the content type, ignoring case.
    #[must_use]
    pub fn has_content_type(&self, content_type: &str) -> bool {
        self.events
            .iter()
            .any(|event| event.content_type.eq_ignore_ascii_case(content_type))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_text() {
        assert_eq!(EventKind::from("PublishStart"), EventKind::PublishStart);
        assert_eq!(EventKind::from("PublishEnd"), EventKind::PublishEnd);
        assert_eq!(
            EventKind::from("Mapper"),
            EventKind::Other("Mapper".to_string())
        );
        assert_eq!(String::from(EventKind::Other("Mapper".into())), "Mapper");
    }

    #[test]
    fn publish_event_decodes_log_line_keys() {
        let json = r#"{
            "@time": "2017-09-19T15:11:31.795334198Z",
            "content_type": "Annotations",
            "event": "PublishEnd",
            "isValid": "true",
            "level": "info",
            "service_name": "annotations-monitoring-service",
            "transaction_id": "tid_evjm9gls5a",
            "uuid": "ed08f771-db28-4d63-b566-0d49c6595111"
        }"#;

        let event: PublishEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, EventKind::PublishEnd);
        assert_eq!(event.time, "2017-09-19T15:11:31.795334198Z");
        assert_eq!(event.is_valid, "true");
        assert!(event.environment.is_empty());
    }

    #[test]
    fn transaction_serializes_with_wire_names() {
        let mut tx = TransactionEvent::new("tid_1");
        tx.record(PublishEvent {
            event: EventKind::PublishStart,
            time: "t0".into(),
            uuid: "u1".into(),
            ..PublishEvent::default()
        });

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["closed_txn"], false);
        assert_eq!(value["eventcount"], 1);
        assert_eq!(value["start_time"], "t0");
        assert_eq!(value["events"][0]["event"], "PublishStart");
    }

    #[test]
    fn later_uuid_overwrites_only_when_present() {
        let mut tx = TransactionEvent::new("tid_1");
        tx.record(PublishEvent {
            uuid: "first".into(),
            ..PublishEvent::default()
        });
        tx.record(PublishEvent {
            uuid: "second".into(),
            ..PublishEvent::default()
        });
        tx.record(PublishEvent::default());

        assert_eq!(tx.uuid, "second");
        assert_eq!(tx.event_count, 3);
    }
}
