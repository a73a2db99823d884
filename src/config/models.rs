use crate::batch::{ActionOnFailure, CloneTemplate, ExecutionOrder, PayloadSettings};
use crate::humanize::ByteSize;
use crate::resolver::ListingFields;
use crate::transport::{Credentials, HttpConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub clone: CloneConfig,
}

/// Prism endpoint and account
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_username")]
    pub username: String,
    /// Loaded from `PRISMCTL_PASSWORD`, never from the config file
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheme: default_scheme(),
            username: default_username(),
            password: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9440
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

/// API path layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_v2_base")]
    pub v2_base: String,
    #[serde(default = "default_v3_base")]
    pub v3_base: String,
    /// Appended to `v3_base`
    #[serde(default = "default_batch_path")]
    pub batch_path: String,
    #[serde(default = "default_vm_collection")]
    pub vm_collection: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            v2_base: default_v2_base(),
            v3_base: default_v3_base(),
            batch_path: default_batch_path(),
            vm_collection: default_vm_collection(),
        }
    }
}

fn default_v2_base() -> String {
    "/PrismGateway/services/rest/v2.0".to_string()
}

fn default_v3_base() -> String {
    "/api/nutanix/v3".to_string()
}

fn default_batch_path() -> String {
    "/batch".to_string()
}

fn default_vm_collection() -> String {
    "vms".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            verify_tls: false,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// JSON pointers locating entities in a listing response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingConfig {
    #[serde(default = "default_collection_field")]
    pub collection_field: String,
    #[serde(default = "default_name_field")]
    pub name_field: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            collection_field: default_collection_field(),
            name_field: default_name_field(),
            id_field: default_id_field(),
        }
    }
}

fn default_collection_field() -> String {
    "/entities".to_string()
}

fn default_name_field() -> String {
    "/name".to_string()
}

fn default_id_field() -> String {
    "/uuid".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub execution_order: ExecutionOrder,
    #[serde(default)]
    pub action_on_failure: ActionOnFailure,
    /// Outer status expected from the batch endpoint
    #[serde(default = "default_success_status")]
    pub success_status: u16,
    /// Per-item status meaning "queued"
    #[serde(default = "default_accepted_status")]
    pub accepted_status: u16,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            execution_order: ExecutionOrder::default(),
            action_on_failure: ActionOnFailure::default(),
            success_status: default_success_status(),
            accepted_status: default_accepted_status(),
        }
    }
}

fn default_api_version() -> String {
    "3.0".to_string()
}

fn default_success_status() -> u16 {
    200
}

fn default_accepted_status() -> u16 {
    202
}

/// Defaults applied to every clone in a fan-out
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloneConfig {
    #[serde(default = "default_memory")]
    pub memory: ByteSize,
    #[serde(default = "default_num_vcpus")]
    pub num_vcpus: u32,
    #[serde(default = "default_num_cores_per_vcpu")]
    pub num_cores_per_vcpu: u32,
    #[serde(default = "default_true")]
    pub override_network_config: bool,
    #[serde(default)]
    pub clone_affinity: bool,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            memory: default_memory(),
            num_vcpus: default_num_vcpus(),
            num_cores_per_vcpu: default_num_cores_per_vcpu(),
            override_network_config: true,
            clone_affinity: false,
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_memory() -> ByteSize {
    ByteSize::from_mib(4096)
}

fn default_num_vcpus() -> u32 {
    4
}

fn default_num_cores_per_vcpu() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    4
}

// Conversions into the runtime types each component takes.

impl Config {
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.cluster.scheme, self.cluster.host, self.cluster.port
        )
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.base_url(),
            connect_timeout: Duration::from_secs(self.transport.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.transport.request_timeout_secs),
            max_retries: self.transport.max_retries,
            retry_backoff: Duration::from_millis(self.transport.retry_backoff_ms),
            verify_tls: self.transport.verify_tls,
            ..HttpConfig::default()
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.cluster.password.as_ref().map(|password| Credentials {
            username: self.cluster.username.clone(),
            password: password.clone(),
        })
    }

    pub fn payload_settings(&self) -> PayloadSettings {
        PayloadSettings {
            v2_base: self.api.v2_base.clone(),
            v3_base: self.api.v3_base.clone(),
            vm_collection: self.api.vm_collection.clone(),
            api_version: self.batch.api_version.clone(),
            execution_order: self.batch.execution_order,
            action_on_failure: self.batch.action_on_failure,
        }
    }

    pub fn batch_endpoint(&self) -> String {
        format!("{}{}", self.api.v3_base, self.api.batch_path)
    }

    pub fn listing_fields(&self) -> ListingFields {
        ListingFields {
            collection: self.listing.collection_field.clone(),
            name: self.listing.name_field.clone(),
            id: self.listing.id_field.clone(),
        }
    }

    pub fn clone_template(&self) -> CloneTemplate {
        CloneTemplate {
            memory: self.clone.memory,
            num_vcpus: self.clone.num_vcpus,
            num_cores_per_vcpu: self.clone.num_cores_per_vcpu,
            override_network_config: self.clone.override_network_config,
            clone_affinity: self.clone.clone_affinity,
        }
    }
}
