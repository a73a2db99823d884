use crate::error::{PrismError, Result};
use crate::transport::TransportResponse;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Accepted,
    ItemFailed { status: u16 },
}

/// One sub-response; `index` is the position in the submitted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResponseItem {
    pub index: usize,
    pub status: u16,
    pub body: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeSummary {
    /// Outer status was not the success code; items were not inspected
    OuterCallFailed { status: u16, body: String },
    /// Outer call succeeded but carried no per-item statuses
    EmptyBatchResult,
    Completed { accepted: usize, failed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub items: Vec<BatchResponseItem>,
    pub summary: OutcomeSummary,
}

impl Aggregation {
    pub fn failures(&self) -> impl Iterator<Item = &BatchResponseItem> {
        self.items
            .iter()
            .filter(|item| item.outcome != ItemOutcome::Accepted)
    }

    /// True only when every item was accepted and there was at least one
    pub fn all_accepted(&self) -> bool {
        matches!(self.summary, OutcomeSummary::Completed { failed: 0, accepted } if accepted > 0)
    }
}

/// Interprets batch responses. Performs no I/O and no retries.
#[derive(Debug, Clone, Copy)]
pub struct ResponseAggregator {
    success_status: u16,
    accepted_status: u16,
}

impl Default for ResponseAggregator {
    fn default() -> Self {
        Self {
            success_status: 200,
            accepted_status: 202,
        }
    }
}

impl ResponseAggregator {
    pub fn new(success_status: u16, accepted_status: u16) -> Self {
        Self {
            success_status,
            accepted_status,
        }
    }

    pub fn aggregate(&self, response: &TransportResponse) -> Result<Aggregation> {
        if response.status != self.success_status {
            warn!(status = response.status, "Batch call failed");
            return Ok(Aggregation {
                items: Vec::new(),
                summary: OutcomeSummary::OuterCallFailed {
                    status: response.status,
                    body: response.text(),
                },
            });
        }

        let root: Value = serde_json::from_slice(&response.body).map_err(|e| {
            PrismError::malformed(format!(
                "batch response is not JSON ({e}): {}",
                excerpt(&response.text())
            ))
        })?;
        let entries = match root.get("api_response_list") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(other) => {
                return Err(PrismError::malformed(format!(
                    "api_response_list is not an array: {other}"
                )));
            }
        };

        if entries.is_empty() {
            warn!("Batch call succeeded without per-item statuses");
            return Ok(Aggregation {
                items: Vec::new(),
                summary: OutcomeSummary::EmptyBatchResult,
            });
        }

        let items = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.classify(index, entry))
            .collect::<Result<Vec<_>>>()?;

        let failed = items
            .iter()
            .filter(|item| item.outcome != ItemOutcome::Accepted)
            .count();
        let accepted = items.len() - failed;

        debug!(accepted, failed, "Batch aggregated");

        Ok(Aggregation {
            items,
            summary: OutcomeSummary::Completed { accepted, failed },
        })
    }

    fn classify(&self, index: usize, entry: &Value) -> Result<BatchResponseItem> {
        let status = entry
            .get("status")
            .and_then(parse_status)
            .ok_or_else(|| PrismError::malformed(format!("item {index} has no usable status")))?;

        let outcome = if status == self.accepted_status {
            ItemOutcome::Accepted
        } else {
            warn!(index, status, "Batch item not accepted");
            ItemOutcome::ItemFailed { status }
        };

        Ok(BatchResponseItem {
            index,
            status,
            body: item_body(entry),
            outcome,
        })
    }
}

// v3 reports statuses as strings ("202"); accept numbers too.
fn parse_status(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

const EXCERPT_CHARS: usize = 512;

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}... ({} bytes total)", &text[..cut], text.len()),
        None => text.to_string(),
    }
}

fn item_body(entry: &Value) -> String {
    match entry.get("api_response").or_else(|| entry.get("response")) {
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => entry.to_string(),
    }
}
