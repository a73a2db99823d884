use super::{CloneClassification, CloneJob, CloneOutcome};
use crate::batch::{BatchPayloadBuilder, BatchSubmitter, CloneItem, CloneTemplate, ItemSpec};
use crate::error::{PrismError, Result};
use crate::observability::Metrics;
use crate::resolver::{self, EntityResolver, ListingFields};
use crate::transport::{Transport, TransportResponse};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Drives resolve -> render -> submit -> classify for a [`CloneJob`]
pub struct CloneOrchestrator {
    transport: Arc<dyn Transport>,
    builder: BatchPayloadBuilder,
    fields: ListingFields,
    template: CloneTemplate,
    max_concurrency: usize,
    metrics: Arc<Metrics>,
}

impl CloneOrchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        builder: BatchPayloadBuilder,
        fields: ListingFields,
        template: CloneTemplate,
    ) -> Self {
        Self {
            transport,
            builder,
            fields,
            template,
            max_concurrency: 1,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Submit up to `limit` clones at once (minimum 1)
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Resolve the source once, then clone it once per requested name.
    ///
    /// Errors only when the source cannot be resolved; per-clone failures are
    /// returned as `Failed` outcomes in the same order as `job.clone_names()`.
    pub async fn clone_fan_out(&self, job: &CloneJob) -> Result<Vec<CloneOutcome>> {
        let listing = self.builder.listing_path();
        let index = EntityResolver::new(self.transport.as_ref(), self.fields.clone())
            .resolve(&listing)
            .await?;
        self.metrics.resolution();

        let source_id = resolver::lookup(&index, job.source_name())
            .ok_or_else(|| PrismError::NotFound(job.source_name().to_string()))?
            .to_string();

        info!(
            source = job.source_name(),
            source_id = %source_id,
            clones = job.clone_names().len(),
            "Cloning source VM"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for name in job.clone_names() {
            let spec = ItemSpec::Clone(CloneItem {
                source_id: source_id.clone(),
                name: name.clone(),
                network_id: job.network_id().to_string(),
                template: self.template.clone(),
            });
            let builder = self.builder.clone();
            let transport = Arc::clone(&self.transport);
            let semaphore = Arc::clone(&semaphore);
            let name = name.clone();

            tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails on shutdown.
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = submit_clone(transport.as_ref(), &builder, &spec, &name).await;
                (name, outcome)
            });
        }

        let mut by_name: HashMap<String, CloneOutcome> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    by_name.insert(name, outcome);
                }
                Err(e) => error!(error = %e, "Clone task aborted"),
            }
        }

        let outcomes: Vec<CloneOutcome> = job
            .clone_names()
            .iter()
            .map(|name| {
                by_name.remove(name).unwrap_or_else(|| {
                    CloneOutcome::failed(name, None, "clone task aborted".to_string())
                })
            })
            .collect();

        for outcome in &outcomes {
            if outcome.is_created() {
                self.metrics.clone_created();
            } else {
                self.metrics.clone_failed();
            }
        }

        Ok(outcomes)
    }
}

async fn submit_clone(
    transport: &dyn Transport,
    builder: &BatchPayloadBuilder,
    spec: &ItemSpec,
    name: &str,
) -> CloneOutcome {
    let item = match builder.render(spec) {
        Ok(item) => item,
        Err(e) => return CloneOutcome::failed(name, None, e.to_string()),
    };

    // Clone requests go straight to the clone endpoint, one call each.
    let submitter = BatchSubmitter::new(transport, item.path_and_params.clone());
    match submitter.submit_item(&item).await {
        Ok(response) => classify_clone(name, &response),
        Err(e) => {
            warn!(clone = name, error = %e, "Clone submission failed");
            CloneOutcome::failed(name, None, e.to_string())
        }
    }
}

fn classify_clone(name: &str, response: &TransportResponse) -> CloneOutcome {
    let body = response.text();

    if !response.is_success() {
        warn!(clone = name, status = response.status, "Clone not created");
        return CloneOutcome::failed(name, Some(response.status), body);
    }

    let task_uuid = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|v| v.get("task_uuid").and_then(Value::as_str).map(str::to_string));

    info!(clone = name, status = response.status, task_uuid = ?task_uuid, "Clone created");

    CloneOutcome {
        name: name.to_string(),
        http_status: Some(response.status),
        body,
        task_uuid,
        classification: CloneClassification::Created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};

    const LISTING: &str = r#"{"entities": [
        {"name": "golden", "uuid": "src-uuid"},
        {"name": "other", "uuid": "other-uuid"}
    ]}"#;
    const LIST_PATH: &str = "/PrismGateway/services/rest/v2.0/vms";
    const CLONE_PATH: &str = "/PrismGateway/services/rest/v2.0/vms/src-uuid/clone";

    fn orchestrator(mock: MockTransport) -> (CloneOrchestrator, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let orch = CloneOrchestrator::new(
            mock.clone(),
            BatchPayloadBuilder::default(),
            ListingFields::default(),
            CloneTemplate::default(),
        );
        (orch, mock)
    }

    fn job(names: &[&str]) -> CloneJob {
        CloneJob::new(
            "golden",
            names.iter().map(|s| s.to_string()).collect(),
            "net-1",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fan_out_isolates_failures() {
        let mock = MockTransport::new()
            .on(Method::Get, LIST_PATH, 200, LISTING)
            .on_body(Method::Post, CLONE_PATH, "\"b\"", 500, "{\"message\":\"no capacity\"}")
            .on(Method::Post, CLONE_PATH, 201, "{\"task_uuid\":\"t-1\"}");
        let (orch, mock) = orchestrator(mock);

        let outcomes = orch.clone_fan_out(&job(&["a", "b", "c"])).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].name, "a");
        assert_eq!(outcomes[0].classification, CloneClassification::Created);
        assert_eq!(outcomes[0].task_uuid.as_deref(), Some("t-1"));
        assert_eq!(outcomes[1].name, "b");
        assert_eq!(outcomes[1].classification, CloneClassification::Failed);
        assert_eq!(outcomes[1].http_status, Some(500));
        assert!(outcomes[1].body.contains("no capacity"));
        assert_eq!(outcomes[2].name, "c");
        assert_eq!(outcomes[2].classification, CloneClassification::Created);

        assert_eq!(mock.call_count(Method::Get, LIST_PATH), 1);
        assert_eq!(mock.call_count(Method::Post, CLONE_PATH), 3);
    }

    #[tokio::test]
    async fn test_source_not_found_submits_nothing() {
        let mock = MockTransport::new().on(Method::Get, LIST_PATH, 200, LISTING);
        let (orch, mock) = orchestrator(mock);

        let job = CloneJob::new("missing", vec!["a".to_string()], "net-1").unwrap();
        let result = orch.clone_fan_out(&job).await;

        assert!(matches!(result, Err(PrismError::NotFound(ref n)) if n == "missing"));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_on_one_clone_keeps_others() {
        let mock = MockTransport::new()
            .on(Method::Get, LIST_PATH, 200, LISTING)
            .fail_on(Method::Post, CLONE_PATH, Some("\"a\""), "connection reset")
            .on(Method::Post, CLONE_PATH, 201, "{}");
        let (orch, _mock) = orchestrator(mock);

        let outcomes = orch.clone_fan_out(&job(&["a", "b"])).await.unwrap();

        assert_eq!(outcomes[0].classification, CloneClassification::Failed);
        assert_eq!(outcomes[0].http_status, None);
        assert!(outcomes[0].body.contains("connection reset"));
        assert!(outcomes[1].is_created());
        assert!(outcomes[1].task_uuid.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_results_follow_request_order() {
        let mock = MockTransport::new()
            .on(Method::Get, LIST_PATH, 200, LISTING)
            .on(Method::Post, CLONE_PATH, 201, "{}");
        let (orch, mock) = orchestrator(mock);
        let metrics = Arc::new(Metrics::new());
        let orch = orch.with_max_concurrency(4).with_metrics(metrics.clone());

        let names: Vec<String> = (0..12).map(|i| format!("clone-{i}")).collect();
        let job = CloneJob::new("golden", names.clone(), "net-1").unwrap();
        let outcomes = orch.clone_fan_out(&job).await.unwrap();

        let returned: Vec<String> = outcomes.iter().map(|o| o.name.clone()).collect();
        assert_eq!(returned, names);
        assert_eq!(mock.call_count(Method::Get, LIST_PATH), 1);

        let snap = metrics.snapshot();
        assert_eq!(snap.resolutions, 1);
        assert_eq!(snap.clones_created, 12);
        assert_eq!(snap.clones_failed, 0);
    }

    #[tokio::test]
    async fn test_clone_payload_carries_network_and_name() {
        let mock = MockTransport::new()
            .on(Method::Get, LIST_PATH, 200, LISTING)
            .on(Method::Post, CLONE_PATH, 201, "{}");
        let (orch, mock) = orchestrator(mock);

        orch.clone_fan_out(&job(&["web-1"])).await.unwrap();

        let post = mock
            .calls()
            .into_iter()
            .find(|c| c.method == Method::Post)
            .unwrap();
        let body: Value = serde_json::from_slice(post.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["spec_list"][0]["name"], "web-1");
        assert_eq!(body["spec_list"][0]["vm_nics"][0]["network_uuid"], "net-1");
    }

    #[tokio::test]
    async fn test_listing_failure_is_error() {
        let mock = MockTransport::new().on(Method::Get, LIST_PATH, 200, "{\"entities\": 3}");
        let (orch, _mock) = orchestrator(mock);

        let result = orch.clone_fan_out(&job(&["a"])).await;
        assert!(matches!(result, Err(PrismError::MalformedResponse(_))));
    }
}
