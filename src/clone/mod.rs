//! Clone fan-out: resolve one source VM, then submit one clone request per name
//!
//! Resolution happens exactly once per job. Each clone is an independent POST to
//! `<collection>/<source id>/clone`; a failed clone never stops its siblings and
//! every requested name gets an outcome.

mod orchestrator;

pub use orchestrator::CloneOrchestrator;

use crate::error::{PrismError, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Input to [`CloneOrchestrator::clone_fan_out`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneJob {
    source_name: String,
    clone_names: Vec<String>,
    network_id: String,
}

impl CloneJob {
    /// Clone names must be non-empty and unique within a job; outcomes are keyed by them.
    pub fn new(
        source_name: impl Into<String>,
        clone_names: Vec<String>,
        network_id: impl Into<String>,
    ) -> Result<Self> {
        let source_name = source_name.into();
        let network_id = network_id.into();

        if source_name.trim().is_empty() {
            return Err(PrismError::InvalidJob("source name is empty".to_string()));
        }
        if network_id.trim().is_empty() {
            return Err(PrismError::InvalidJob("network id is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for name in &clone_names {
            if name.trim().is_empty() {
                return Err(PrismError::InvalidJob("clone name is empty".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(PrismError::InvalidJob(format!("duplicate clone name '{name}'")));
            }
        }

        Ok(Self {
            source_name,
            clone_names,
            network_id,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn clone_names(&self) -> &[String] {
        &self.clone_names
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneClassification {
    Created,
    Failed,
}

/// Result of one clone submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneOutcome {
    pub name: String,
    /// `None` when the request never got a response
    pub http_status: Option<u16>,
    pub body: String,
    /// Task handle returned by the cluster on success
    pub task_uuid: Option<String>,
    pub classification: CloneClassification,
}

impl CloneOutcome {
    pub fn is_created(&self) -> bool {
        self.classification == CloneClassification::Created
    }

    fn failed(name: &str, http_status: Option<u16>, body: String) -> Self {
        Self {
            name: name.to_string(),
            http_status,
            body,
            task_uuid: None,
            classification: CloneClassification::Failed,
        }
    }
}
