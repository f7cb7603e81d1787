//! Bodies exchanged on `/v1/callbacks/...`. Grounded in `command.py`'s
//! `ended` (`jobId`, `exitCode`, stdout) and `task.py`'s generic node/method
//! event payload: `color`, `parent_color`, and a map of `response_links` —
//! URLs on the Petri engine this service PUTs to once it has resolved the
//! event, per §4.3.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The payload the Petri engine PUTs when a `Notify` transition fires:
/// which color (and enclosing parent color) the firing token carries, and
/// the response links to acknowledge into once this service has resolved
/// the event.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct NodeEventPayload {
    pub color: i64,
    #[serde(default)]
    pub parent_color: Option<i64>,
    #[serde(default)]
    pub response_links: BTreeMap<String, String>,
}

/// Body the fork service PUTs to a method's `ended` callback once the
/// dispatched job completes.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct JobEndedRequest {
    pub job_id: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

/// Carried in the ack body of a `get_split_size` response link.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SplitSizeAck {
    pub size: i64,
}

/// Carried in the ack body of a `color_group_created` response link — the
/// engine needs the allocated range to number the `k` tokens it deposits
/// into the split place.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ColorGroupCreatedAck {
    pub begin: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CallbackAck {
    pub ok: bool,
}

impl CallbackAck {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
