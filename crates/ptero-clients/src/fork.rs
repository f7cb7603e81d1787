//! Client for the external shell-command executor. Grounded in
//! `command.py`'s `_submit_to_fork`/`_fork_submit_data`: POST the command
//! line, stdin, and an `ended` callback URL to
//! `http://<fork host>:<fork port>/v1/jobs`, and the fork service reports
//! the job id to key our own `job` table by.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone)]
pub struct ForkClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SubmitJobRequest {
    command_line: Vec<String>,
    user: String,
    stdin: Value,
    callbacks: SubmitJobCallbacks,
}

#[derive(Debug, Serialize)]
struct SubmitJobCallbacks {
    ended: String,
}

#[derive(Debug, Deserialize)]
struct SubmitJobResponse {
    job_id: String,
}

impl ForkClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Submits a command line for execution, returning the fork service's
    /// job id. `ended_callback_url` is where the fork service PUTs the
    /// exit code and stdout once the job completes.
    pub async fn submit_job(
        &self,
        command_line: Vec<String>,
        stdin: Value,
        ended_callback_url: &str,
    ) -> Result<String> {
        let url = format!("{}/v1/jobs", self.base_url);
        let body = SubmitJobRequest {
            command_line,
            user: std::env::var("USER").unwrap_or_default(),
            stdin,
            callbacks: SubmitJobCallbacks {
                ended: ended_callback_url.to_string(),
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("submitting job to {url}"))?
            .error_for_status()
            .context("fork service rejected job submission")?;

        let parsed: SubmitJobResponse = response.json().await.context("parsing fork job response")?;
        Ok(parsed.job_id)
    }
}
