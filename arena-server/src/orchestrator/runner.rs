//! External agent-runner collaborator
//!
//! The runner drives both reviewer agents and the judge for one match and
//! reports back reviews plus judge scores. It is an external dependency:
//! the orchestrator owns neither its timeout nor its failure contract, only
//! the recovery policy when it is unreachable.

use arena_common::model::{PaperId, Review};
use arena_common::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything the runner needs to run one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub match_id: Uuid,
    pub agent1_id: Uuid,
    pub agent2_id: Uuid,
    pub judge_id: Uuid,
    pub papers: Vec<PaperId>,
}

/// Runner result: reviews plus judge-assigned scores per paper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub reviews: Vec<Review>,
    /// Judge overall score per paper (0-5 scale)
    pub paper_scores: BTreeMap<PaperId, f64>,
    /// Judge rationale
    pub summary: String,
}

/// Collaborator that generates and judges reviews for a match
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run the match end to end
    ///
    /// An `Err` is treated as an outage of the external reviewer service;
    /// the orchestrator recovers with a placeholder outcome rather than
    /// propagating the failure.
    async fn run(&self, request: &RunRequest) -> Result<RunReport>;
}

/// HTTP-backed runner talking to the reviewer service
pub struct HttpAgentRunner {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAgentRunner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AgentRunner for HttpAgentRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let url = format!("{}/api/v1/runs", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Agent runner unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "Agent runner returned {}",
                response.status()
            )));
        }

        response
            .json::<RunReport>()
            .await
            .map_err(|e| Error::ExternalService(format!("Invalid agent runner response: {}", e)))
    }
}
