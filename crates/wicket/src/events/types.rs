//! Event types delivered to session observers.

use serde_json::{Value, json};

/// An event published to a session's observer channel.
///
/// `name` becomes the SSE `event:` line when present; `data` is serialized
/// into the `data:` line. Events are ephemeral and never persisted.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Optional named event type.
    pub name: Option<String>,
    /// JSON payload.
    pub data: Value,
}

impl SessionEvent {
    /// A lifecycle event on the `control` channel.
    pub fn control(kind: &str) -> Self {
        Self {
            name: Some("control".to_string()),
            data: json!({ "kind": kind }),
        }
    }

    /// Proxied LRS traffic, described before the request is forwarded.
    /// `method` is expected in lowercase.
    pub fn lrs(method: &str, resource: &str) -> Self {
        Self {
            name: None,
            data: json!({ "kind": "lrs", "method": method, "resource": resource }),
        }
    }

    /// Fetch relay outcome carrying the upstream status code.
    pub fn fetch_status(status: u16) -> Self {
        Self {
            name: None,
            data: json!({ "kind": "fetch", "status": status }),
        }
    }

    /// Fetch relay failure. The observer sees the cause even though the
    /// caller only receives the soft error envelope.
    pub fn fetch_error(cause: &str) -> Self {
        Self {
            name: None,
            data: json!({ "kind": "fetch", "error": cause }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_event_shape() {
        let event = SessionEvent::control("initialize");
        assert_eq!(event.name.as_deref(), Some("control"));
        assert_eq!(event.data, json!({ "kind": "initialize" }));
    }

    #[test]
    fn test_lrs_event_is_unnamed() {
        let event = SessionEvent::lrs("get", "statements");
        assert!(event.name.is_none());
        assert_eq!(
            event.data,
            json!({ "kind": "lrs", "method": "get", "resource": "statements" })
        );
    }

    #[test]
    fn test_fetch_events() {
        assert_eq!(
            SessionEvent::fetch_status(200).data,
            json!({ "kind": "fetch", "status": 200 })
        );
        assert_eq!(
            SessionEvent::fetch_error("boom").data,
            json!({ "kind": "fetch", "error": "boom" })
        );
    }
}
