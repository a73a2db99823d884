use super::payload::{BatchDocument, BatchRequest, RenderedItem};
use crate::error::Result;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use bytes::Bytes;
use tracing::{debug, info};

/// Sends rendered payloads through a [`Transport`]. No retries here.
pub struct BatchSubmitter<'a> {
    transport: &'a dyn Transport,
    batch_path: String,
}

impl<'a> BatchSubmitter<'a> {
    pub fn new(transport: &'a dyn Transport, batch_path: impl Into<String>) -> Self {
        Self {
            transport,
            batch_path: batch_path.into(),
        }
    }

    /// POST the whole batch. Any HTTP status is returned for the aggregator.
    pub async fn submit(&self, batch: &BatchRequest) -> Result<TransportResponse> {
        self.post(batch.to_bytes()?, batch.len()).await
    }

    /// POST a loaded document's body exactly as it was read
    pub async fn submit_document(&self, document: &BatchDocument) -> Result<TransportResponse> {
        self.post(document.as_bytes().to_vec(), document.len()).await
    }

    async fn post(&self, body: Vec<u8>, items: usize) -> Result<TransportResponse> {
        info!(path = %self.batch_path, items, "Submitting batch");

        let response = self
            .transport
            .execute(TransportRequest::post_json(self.batch_path.clone(), body))
            .await?;

        debug!(status = response.status, "Batch response received");
        Ok(response)
    }

    /// Send one rendered item as its own call, outside the batch endpoint
    pub async fn submit_item(&self, item: &RenderedItem) -> Result<TransportResponse> {
        let body = if item.body.is_null() {
            None
        } else {
            Some(Bytes::from(serde_json::to_vec(&item.body)?))
        };

        let request = TransportRequest {
            method: item.operation,
            path: item.path_and_params.clone(),
            body,
            content_type: TransportRequest::JSON,
        };

        let response = self.transport.execute(request).await?;
        debug!(
            path = %item.path_and_params,
            status = response.status,
            "Item response received"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::payload::BatchPayloadBuilder;
    use crate::error::PrismError;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    #[tokio::test]
    async fn test_submit_posts_serialized_batch() {
        let mock = MockTransport::new().on(Method::Post, "/api/nutanix/v3/batch", 200, "{}");
        let submitter = BatchSubmitter::new(&mock, "/api/nutanix/v3/batch");
        let batch = BatchPayloadBuilder::default().build(&[]).unwrap();

        let response = submitter.submit(&batch).await.unwrap();
        assert_eq!(response.status, 200);

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        let sent: serde_json::Value =
            serde_json::from_slice(calls[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(sent["api_request_list"], json!([]));
    }

    #[tokio::test]
    async fn test_submit_document_sends_original_bytes() {
        let details = r#"{"api_version":"3.0","custom":1,"api_request_list":[{"operation":"PATCH","path_and_params":"/x"}]}"#;
        let raw = format!(r#"{{"batch_details":{details}}}"#);
        let document = BatchDocument::from_slice(raw.as_bytes()).unwrap();

        let mock = MockTransport::new().on(Method::Post, "/batch", 200, "{}");
        BatchSubmitter::new(&mock, "/batch")
            .submit_document(&document)
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].body.as_deref(), Some(details.as_bytes()));
    }

    #[tokio::test]
    async fn test_server_errors_are_not_transport_errors() {
        let mock = MockTransport::new().on(Method::Post, "/batch", 503, "busy");
        let submitter = BatchSubmitter::new(&mock, "/batch");
        let batch = BatchPayloadBuilder::default().build(&[]).unwrap();

        let response = submitter.submit(&batch).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "busy");
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_and_not_retried() {
        let mock = MockTransport::new().fail_on(Method::Post, "/batch", None, "connection refused");
        let submitter = BatchSubmitter::new(&mock, "/batch");
        let batch = BatchPayloadBuilder::default().build(&[]).unwrap();

        let result = submitter.submit(&batch).await;
        assert!(matches!(result, Err(PrismError::Transport(_))));
        assert_eq!(mock.call_count(Method::Post, "/batch"), 1);
    }

    #[tokio::test]
    async fn test_submit_item_uses_item_method_and_path() {
        let mock = MockTransport::new().on(Method::Get, "/api/nutanix/v3/vms/u1", 200, "{}");
        let submitter = BatchSubmitter::new(&mock, "/batch");
        let item = RenderedItem {
            operation: Method::Get,
            path_and_params: "/api/nutanix/v3/vms/u1".to_string(),
            body: serde_json::Value::Null,
        };

        let response = submitter.submit_item(&item).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(mock.calls()[0].body.is_none());
    }
}
