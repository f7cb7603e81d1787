//! Pure decision logic for the two callback shapes in §4.3:
//! `…/callbacks/nodes/<id>/events/<event>` and `…/methods/<id>/events/<event>`.
//!
//! This module holds no I/O — it turns an inbound event name and payload
//! into a typed plan (what to persist, which response link to ack, whether
//! to forward a lifecycle webhook) that `ptero-api::callbacks` executes
//! against the database and outbound HTTP clients. Grounded in
//! `backend.py`'s `handle_task_callback`/`handle_method_callback` and
//! `command.py`'s `execute`/`ended`.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::execution::Status;

/// The `event` segment of a node-level callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    GetSplitSize,
    ColorGroupCreated,
    Lifecycle(LifecycleEvent),
}

impl NodeEvent {
    pub fn parse(event: &str) -> Result<Self> {
        match event {
            "get_split_size" => Ok(Self::GetSplitSize),
            "color_group_created" => Ok(Self::ColorGroupCreated),
            other => LifecycleEvent::parse(other).map(Self::Lifecycle),
        }
    }
}

/// The `event` segment of a method-level callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodEvent {
    Execute,
    Ended,
    Done,
}

impl MethodEvent {
    pub fn parse(event: &str) -> Result<Self> {
        match event {
            "execute" => Ok(Self::Execute),
            "ended" => Ok(Self::Ended),
            "done" => Ok(Self::Done),
            other => Err(Error::no_such("method event", other)),
        }
    }
}

/// The lifecycle events forwarded verbatim to webhook subscribers, each
/// paired with the terminal/non-terminal `Status` it reports (where one
/// applies — `new`/`scheduled`/`running` have no `Status` counterpart
/// since the execution registry only starts recording at `Running`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    New,
    Scheduled,
    Running,
    Succeeded,
    Failed,
    Errored,
    Canceled,
}

impl LifecycleEvent {
    pub fn parse(event: &str) -> Result<Self> {
        match event {
            "new" => Ok(Self::New),
            "scheduled" => Ok(Self::Scheduled),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "errored" => Ok(Self::Errored),
            "canceled" => Ok(Self::Canceled),
            other => Err(Error::no_such("lifecycle event", other)),
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Canceled => "canceled",
        }
    }

    /// The `Status` this lifecycle event advances the execution registry
    /// to, for the three events that carry one.
    pub fn status(self) -> Option<Status> {
        match self {
            Self::Succeeded => Some(Status::Succeeded),
            Self::Failed => Some(Status::Failed),
            Self::Errored => Some(Status::Errored),
            Self::Canceled => Some(Status::Canceled),
            Self::Running => Some(Status::Running),
            Self::New | Self::Scheduled => None,
        }
    }
}

/// A lifecycle event ready to hand to `ptero-clients::WebhookClient`,
/// matching the subscriber envelope named in §6 "Outbound".
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    pub event: &'static str,
    pub node_id: crate::node::NodeId,
    pub color: crate::color::Color,
}

pub fn webhook_envelope(
    event: LifecycleEvent,
    node_id: crate::node::NodeId,
    color: crate::color::Color,
) -> WebhookEnvelope {
    WebhookEnvelope {
        event: event.as_wire(),
        node_id,
        color,
    }
}

/// A subscriber's declared interest, `"*"` meaning every lifecycle event.
pub fn webhook_matches(subscription_event: &str, event: LifecycleEvent) -> bool {
    subscription_event == "*" || subscription_event == event.as_wire()
}

/// The outcome of handling a method's `ended` callback: which named
/// response link to PUT, and — on success — the output map to persist at
/// this execution's color.
#[derive(Debug, Clone)]
pub struct EndedOutcome {
    pub response_link: &'static str,
    pub outputs: Map<String, Value>,
}

/// `command.py`'s `ended`: exit code 0 parses stdout as a JSON object of
/// named outputs and acks `success`; anything else acks `failure` with no
/// outputs written, letting the task's method chain fall through.
pub fn handle_ended(exit_code: i32, stdout: Option<&str>) -> Result<EndedOutcome> {
    if exit_code == 0 {
        Ok(EndedOutcome {
            response_link: "success",
            outputs: parse_stdout_outputs(stdout)?,
        })
    } else {
        Ok(EndedOutcome {
            response_link: "failure",
            outputs: Map::new(),
        })
    }
}

fn parse_stdout_outputs(stdout: Option<&str>) -> Result<Map<String, Value>> {
    let raw = match stdout {
        None => return Ok(Map::new()),
        Some(raw) if raw.trim().is_empty() => return Ok(Map::new()),
        Some(raw) => raw,
    };
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::UpdateError(format!("job stdout is not valid JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::UpdateError(format!(
            "job stdout must be a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_event_recognizes_parallel_events_and_lifecycle_fallback() {
        assert_eq!(NodeEvent::parse("get_split_size").unwrap(), NodeEvent::GetSplitSize);
        assert_eq!(
            NodeEvent::parse("color_group_created").unwrap(),
            NodeEvent::ColorGroupCreated
        );
        assert_eq!(
            NodeEvent::parse("succeeded").unwrap(),
            NodeEvent::Lifecycle(LifecycleEvent::Succeeded)
        );
        assert!(NodeEvent::parse("bogus").is_err());
    }

    #[test]
    fn method_event_rejects_unknown_names() {
        assert_eq!(MethodEvent::parse("execute").unwrap(), MethodEvent::Execute);
        assert!(MethodEvent::parse("bogus").is_err());
    }

    #[test]
    fn ended_with_zero_exit_parses_stdout_object_as_outputs() {
        let outcome = handle_ended(0, Some(r#"{"r": "kittens"}"#)).unwrap();
        assert_eq!(outcome.response_link, "success");
        assert_eq!(outcome.outputs.get("r").unwrap(), "kittens");
    }

    #[test]
    fn ended_with_empty_stdout_produces_no_outputs() {
        let outcome = handle_ended(0, None).unwrap();
        assert_eq!(outcome.response_link, "success");
        assert!(outcome.outputs.is_empty());
    }

    #[test]
    fn ended_with_nonzero_exit_acks_failure_and_drops_stdout() {
        let outcome = handle_ended(1, Some(r#"{"r": "ignored"}"#)).unwrap();
        assert_eq!(outcome.response_link, "failure");
        assert!(outcome.outputs.is_empty());
    }

    #[test]
    fn ended_rejects_non_object_stdout() {
        assert!(handle_ended(0, Some("[1,2,3]")).is_err());
        assert!(handle_ended(0, Some("not json")).is_err());
    }

    #[test]
    fn webhook_matches_wildcard_and_exact_event() {
        assert!(webhook_matches("*", LifecycleEvent::Succeeded));
        assert!(webhook_matches("succeeded", LifecycleEvent::Succeeded));
        assert!(!webhook_matches("failed", LifecycleEvent::Succeeded));
    }
}
