//! Typed descriptions of single units of work and their wire bodies

use crate::humanize::ByteSize;
use bon::Builder;
use serde::{Deserialize, Serialize};

const V3_ENTITY_API_VERSION: &str = "3.1.0";

/// v3 VM create request
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct VmCreate {
    #[builder(into)]
    pub name: String,
    pub memory: ByteSize,
    #[builder(default = 1)]
    pub num_sockets: u32,
    #[builder(default = 1)]
    pub num_vcpus_per_socket: u32,
    #[builder(into)]
    pub cluster_uuid: Option<String>,
    #[builder(into)]
    pub description: Option<String>,
}

/// v3 image create request (image fetched by the cluster from `source_uri`)
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct ImageCreate {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub source_uri: String,
    #[builder(default)]
    pub image_type: ImageType,
    #[builder(into)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageType {
    #[default]
    DiskImage,
    IsoImage,
}

/// Sizing and placement shared by every clone of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneTemplate {
    pub memory: ByteSize,
    pub num_vcpus: u32,
    pub num_cores_per_vcpu: u32,
    pub override_network_config: bool,
    pub clone_affinity: bool,
}

impl Default for CloneTemplate {
    fn default() -> Self {
        Self {
            memory: ByteSize::from_mib(4096),
            num_vcpus: 4,
            num_cores_per_vcpu: 1,
            override_network_config: true,
            clone_affinity: false,
        }
    }
}

/// One clone of `source_id`, attached to `network_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneItem {
    pub source_id: String,
    pub name: String,
    pub network_id: String,
    pub template: CloneTemplate,
}

// Wire shapes. Field order here is the serialized order.

#[derive(Debug, Serialize)]
pub(crate) struct V3Body<R: Serialize> {
    pub spec: V3Spec<R>,
    pub metadata: V3Metadata,
    pub api_version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct V3Spec<R: Serialize> {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: R,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_reference: Option<KindRef>,
}

#[derive(Debug, Serialize)]
pub(crate) struct V3Metadata {
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct KindRef {
    pub kind: &'static str,
    pub uuid: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct VmResources {
    pub memory_size_mib: u64,
    pub num_sockets: u32,
    pub num_vcpus_per_socket: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageResources {
    pub image_type: ImageType,
    pub source_uri: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CloneBody {
    pub spec_list: Vec<CloneSpecEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CloneSpecEntry {
    pub name: String,
    pub memory_mb: u64,
    pub num_vcpus: u32,
    pub num_cores_per_vcpu: u32,
    pub vm_nics: Vec<VmNic>,
    pub override_network_config: bool,
    pub clone_affinity: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct VmNic {
    pub network_uuid: String,
}

impl VmCreate {
    pub(crate) fn to_body(&self) -> V3Body<VmResources> {
        V3Body {
            spec: V3Spec {
                name: self.name.clone(),
                description: self.description.clone(),
                resources: VmResources {
                    memory_size_mib: self.memory.as_mib(),
                    num_sockets: self.num_sockets,
                    num_vcpus_per_socket: self.num_vcpus_per_socket,
                },
                cluster_reference: self.cluster_uuid.as_ref().map(|uuid| KindRef {
                    kind: "cluster",
                    uuid: uuid.clone(),
                }),
            },
            metadata: V3Metadata { kind: "vm" },
            api_version: V3_ENTITY_API_VERSION,
        }
    }
}

impl ImageCreate {
    pub(crate) fn to_body(&self) -> V3Body<ImageResources> {
        V3Body {
            spec: V3Spec {
                name: self.name.clone(),
                description: self.description.clone(),
                resources: ImageResources {
                    image_type: self.image_type,
                    source_uri: self.source_uri.clone(),
                },
                cluster_reference: None,
            },
            metadata: V3Metadata { kind: "image" },
            api_version: V3_ENTITY_API_VERSION,
        }
    }
}

impl CloneItem {
    pub(crate) fn to_body(&self) -> CloneBody {
        CloneBody {
            spec_list: vec![CloneSpecEntry {
                name: self.name.clone(),
                memory_mb: self.template.memory.as_mib(),
                num_vcpus: self.template.num_vcpus,
                num_cores_per_vcpu: self.template.num_cores_per_vcpu,
                vm_nics: vec![VmNic {
                    network_uuid: self.network_id.clone(),
                }],
                override_network_config: self.template.override_network_config,
                clone_affinity: self.template.clone_affinity,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vm_builder_defaults() {
        let vm = VmCreate::builder()
            .name("web-01")
            .memory(ByteSize::from_mib(2048))
            .build();

        assert_eq!(vm.num_sockets, 1);
        assert_eq!(vm.num_vcpus_per_socket, 1);
        assert!(vm.cluster_uuid.is_none());
    }

    #[test]
    fn test_vm_body_shape() {
        let vm = VmCreate::builder()
            .name("web-01")
            .memory(ByteSize::from_mib(2048))
            .num_sockets(2)
            .cluster_uuid("c-1")
            .build();

        let value = serde_json::to_value(vm.to_body()).unwrap();
        assert_eq!(
            value,
            json!({
                "spec": {
                    "name": "web-01",
                    "resources": {
                        "memory_size_mib": 2048,
                        "num_sockets": 2,
                        "num_vcpus_per_socket": 1
                    },
                    "cluster_reference": {"kind": "cluster", "uuid": "c-1"}
                },
                "metadata": {"kind": "vm"},
                "api_version": "3.1.0"
            })
        );
    }

    #[test]
    fn test_image_body_shape() {
        let image = ImageCreate::builder()
            .name("centos")
            .source_uri("http://mirror/centos.qcow2")
            .build();

        let value = serde_json::to_value(image.to_body()).unwrap();
        assert_eq!(value["spec"]["resources"]["image_type"], "DISK_IMAGE");
        assert_eq!(value["metadata"]["kind"], "image");
        assert!(value["spec"].get("cluster_reference").is_none());
    }

    #[test]
    fn test_clone_body_shape() {
        let item = CloneItem {
            source_id: "src".to_string(),
            name: "clone-1".to_string(),
            network_id: "net-9".to_string(),
            template: CloneTemplate::default(),
        };

        let value = serde_json::to_value(item.to_body()).unwrap();
        assert_eq!(
            value,
            json!({
                "spec_list": [{
                    "name": "clone-1",
                    "memory_mb": 4096,
                    "num_vcpus": 4,
                    "num_cores_per_vcpu": 1,
                    "vm_nics": [{"network_uuid": "net-9"}],
                    "override_network_config": true,
                    "clone_affinity": false
                }]
            })
        );
    }

    #[test]
    fn test_names_are_json_escaped() {
        let item = CloneItem {
            source_id: "src".to_string(),
            name: "evil\",\"memory_mb\":1".to_string(),
            network_id: "net".to_string(),
            template: CloneTemplate::default(),
        };

        let raw = serde_json::to_string(&item.to_body()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["spec_list"][0]["name"], "evil\",\"memory_mb\":1");
        assert_eq!(parsed["spec_list"][0]["memory_mb"], 4096);
    }
}
