//! Job dispatch bookkeeping for `ShellCommand` methods.
//!
//! Grounded in `command.py`: `CommandOperation.execute` submits a job to
//! the fork service and records one `ResponseLink` per outcome it needs
//! to be able to acknowledge later; `ended` looks the job back up by
//! `(node_id, job_id)` and PUTs whichever response link matches the exit
//! code.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Color;
use crate::node::NodeId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseLink {
    pub name: String,
    pub url: String,
}

/// A single dispatched invocation of a `ShellCommand` method at one color.
/// `job_id` is opaque, assigned by the fork service at submission time;
/// the `(node_id, job_id)` pair is unique so a duplicate `ended` delivery
/// for the same job is detectable at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub node_id: NodeId,
    pub method_name: String,
    pub color: Color,
    pub job_id: String,
    pub stdin: Value,
    pub response_links: Vec<ResponseLink>,
}

impl Job {
    pub fn response_link(&self, name: &str) -> Option<&ResponseLink> {
        self.response_links.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub exit_code: i32,
    pub stdout: Option<String>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Parses stdout as a JSON object of output properties, the contract
    /// `command.py`'s `ended` assumes when `exit_code == 0`.
    pub fn parsed_outputs(&self) -> crate::error::Result<serde_json::Map<String, Value>> {
        let Some(stdout) = &self.stdout else {
            return Ok(serde_json::Map::new());
        };
        if stdout.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str::<Value>(stdout) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => Err(crate::error::Error::UpdateError(
                "job stdout is not a JSON object of outputs".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_link_lookup_by_name() {
        let job = Job {
            node_id: uuid::Uuid::new_v4(),
            method_name: "m".into(),
            color: 0,
            job_id: "j-1".into(),
            stdin: serde_json::json!({}),
            response_links: vec![
                ResponseLink {
                    name: "success".into(),
                    url: "http://x/success".into(),
                },
                ResponseLink {
                    name: "failure".into(),
                    url: "http://x/failure".into(),
                },
            ],
        };
        assert_eq!(job.response_link("success").unwrap().url, "http://x/success");
        assert!(job.response_link("missing").is_none());
    }

    #[test]
    fn parsed_outputs_rejects_non_object_stdout() {
        let outcome = JobOutcome {
            exit_code: 0,
            stdout: Some("[1,2,3]".to_string()),
        };
        assert!(outcome.parsed_outputs().is_err());
    }

    #[test]
    fn parsed_outputs_accepts_empty_stdout() {
        let outcome = JobOutcome {
            exit_code: 0,
            stdout: None,
        };
        assert!(outcome.parsed_outputs().unwrap().is_empty());
    }
}
