//! Client for the external Petri-net engine. Grounded in `backend.py`'s
//! `submit_net`, which PUTs the translated program to
//! `http://<petri host>:<petri port>/v1/nets/<net_key>`.

use anyhow::{Context, Result};
use ptero_core::translate::PetriProgram;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone)]
pub struct PetriClient {
    http: reqwest::Client,
    base_url: String,
}

impl PetriClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Submits the translated program as the net keyed by the workflow's
    /// root task id; the engine owns firing order from here on.
    pub async fn submit_net(&self, net_key: Uuid, program: &PetriProgram) -> Result<()> {
        let url = format!("{}/v1/nets/{net_key}", self.base_url);
        let response = self
            .http
            .put(&url)
            .json(program)
            .send()
            .await
            .with_context(|| format!("submitting net {net_key} to {url}"))?;

        response
            .error_for_status()
            .with_context(|| format!("petri engine rejected net {net_key}"))?;

        Ok(())
    }

    /// Acknowledges a response link the engine is waiting on — the same
    /// mechanism a job's `ended` callback or an internal notify response
    /// uses to deposit a token back into the net.
    pub async fn ack(&self, response_url: &str) -> Result<()> {
        let response = self
            .http
            .put(response_url)
            .send()
            .await
            .with_context(|| format!("acking response link {response_url}"))?;

        response
            .error_for_status()
            .with_context(|| format!("petri engine rejected ack to {response_url}"))?;

        Ok(())
    }

    /// Acknowledges a response link that must carry a body — the
    /// `get_split_size` ack (`{size}`) and the `color_group_created` ack
    /// (`{begin, end}`) both report a value back into the net rather than
    /// a bare token.
    pub async fn ack_with_body(&self, response_url: &str, body: impl Serialize) -> Result<()> {
        let response = self
            .http
            .put(response_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("acking response link {response_url}"))?;

        response
            .error_for_status()
            .with_context(|| format!("petri engine rejected ack to {response_url}"))?;

        Ok(())
    }

    pub async fn cancel_net(&self, net_key: Uuid) -> Result<()> {
        let url = format!("{}/v1/nets/{net_key}", self.base_url);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("canceling net {net_key}"))?;

        response
            .error_for_status()
            .with_context(|| format!("petri engine rejected cancellation of {net_key}"))?;

        Ok(())
    }
}
