use super::items::{CloneItem, ImageCreate, VmCreate};
use crate::error::{PrismError, Result};
use crate::transport::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

/// One logical unit of work, before rendering
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSpec {
    CreateVm(VmCreate),
    CreateImage(ImageCreate),
    Clone(CloneItem),
    /// Pre-rendered request passed through untouched
    Raw(RenderedItem),
}

impl From<VmCreate> for ItemSpec {
    fn from(value: VmCreate) -> Self {
        ItemSpec::CreateVm(value)
    }
}

impl From<ImageCreate> for ItemSpec {
    fn from(value: ImageCreate) -> Self {
        ItemSpec::CreateImage(value)
    }
}

impl From<CloneItem> for ItemSpec {
    fn from(value: CloneItem) -> Self {
        ItemSpec::Clone(value)
    }
}

/// A request addressed to one endpoint, in batch wire form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedItem {
    pub operation: Method,
    pub path_and_params: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionOrder {
    #[default]
    Sequential,
    NonSequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionOnFailure {
    #[default]
    Continue,
    Abort,
}

/// Batch endpoint body. Response items correlate to `api_request_list` by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub action_on_failure: ActionOnFailure,
    #[serde(default)]
    pub execution_order: ExecutionOrder,
    pub api_version: String,
    pub api_request_list: Vec<RenderedItem>,
}

impl BatchRequest {
    pub fn len(&self) -> usize {
        self.api_request_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.api_request_list.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A batch body taken verbatim from the `batch_details` member of a document.
///
/// The body is posted byte for byte as it appears in the file. Only its outline
/// is checked: it must be an object with an `api_request_list` array.
#[derive(Debug, Clone)]
pub struct BatchDocument {
    details: Box<RawValue>,
    items: usize,
}

#[derive(Deserialize)]
struct Envelope {
    batch_details: Option<Box<RawValue>>,
}

impl BatchDocument {
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(raw)
            .map_err(|e| PrismError::InvalidJob(format!("batch document is not valid JSON: {e}")))?;
        let details = envelope
            .batch_details
            .ok_or_else(|| PrismError::InvalidJob("document has no 'batch_details'".to_string()))?;

        let outline: Value = serde_json::from_str(details.get())
            .map_err(|e| PrismError::InvalidJob(format!("unreadable batch_details: {e}")))?;
        let items = outline
            .as_object()
            .ok_or_else(|| PrismError::InvalidJob("batch_details is not an object".to_string()))?
            .get("api_request_list")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| {
                PrismError::InvalidJob("batch_details has no api_request_list array".to_string())
            })?;

        Ok(Self { details, items })
    }

    pub fn len(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.details.get().as_bytes()
    }
}

/// Endpoint layout and batch options used when rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSettings {
    pub v2_base: String,
    pub v3_base: String,
    pub vm_collection: String,
    pub api_version: String,
    pub execution_order: ExecutionOrder,
    pub action_on_failure: ActionOnFailure,
}

impl Default for PayloadSettings {
    fn default() -> Self {
        Self {
            v2_base: "/PrismGateway/services/rest/v2.0".to_string(),
            v3_base: "/api/nutanix/v3".to_string(),
            vm_collection: "vms".to_string(),
            api_version: "3.0".to_string(),
            execution_order: ExecutionOrder::default(),
            action_on_failure: ActionOnFailure::default(),
        }
    }
}

/// Pure, order-preserving rendering of item specs
#[derive(Debug, Clone, Default)]
pub struct BatchPayloadBuilder {
    settings: PayloadSettings,
}

impl BatchPayloadBuilder {
    pub fn new(settings: PayloadSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PayloadSettings {
        &self.settings
    }

    pub fn build(&self, specs: &[ItemSpec]) -> Result<BatchRequest> {
        let api_request_list = specs
            .iter()
            .map(|spec| self.render(spec))
            .collect::<Result<Vec<_>>>()?;

        Ok(BatchRequest {
            action_on_failure: self.settings.action_on_failure,
            execution_order: self.settings.execution_order,
            api_version: self.settings.api_version.clone(),
            api_request_list,
        })
    }

    pub fn render(&self, spec: &ItemSpec) -> Result<RenderedItem> {
        let item = match spec {
            ItemSpec::CreateVm(vm) => RenderedItem {
                operation: Method::Post,
                path_and_params: format!("{}/vms", self.settings.v3_base),
                body: serde_json::to_value(vm.to_body())?,
            },
            ItemSpec::CreateImage(image) => RenderedItem {
                operation: Method::Post,
                path_and_params: format!("{}/images", self.settings.v3_base),
                body: serde_json::to_value(image.to_body())?,
            },
            ItemSpec::Clone(clone) => RenderedItem {
                operation: Method::Post,
                path_and_params: self.clone_path(&clone.source_id),
                body: serde_json::to_value(clone.to_body())?,
            },
            ItemSpec::Raw(item) => item.clone(),
        };
        Ok(item)
    }

    /// `<v2 base>/<collection>/<id>/clone`
    pub fn clone_path(&self, source_id: &str) -> String {
        format!(
            "{}/{}/{}/clone",
            self.settings.v2_base, self.settings.vm_collection, source_id
        )
    }

    /// Listing endpoint for the VM collection
    pub fn listing_path(&self) -> String {
        format!("{}/{}", self.settings.v2_base, self.settings.vm_collection)
    }
}
