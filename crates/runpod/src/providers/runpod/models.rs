//! RunPod GraphQL API models.
//!
//! Field names follow the GraphQL schema (camelCase on the wire).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Pod types
// ============================================================================

/// Pod status as reported in `desiredStatus`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PodStatus {
    /// Pod is (or should be) running.
    #[default]
    Running,
    /// Pod is stopped but its volume is kept.
    Exited,
    /// Pod has been terminated.
    Terminated,
    /// Unrecognized status.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Exited => write!(f, "EXITED"),
            Self::Terminated => write!(f, "TERMINATED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Cloud placement class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudType {
    /// Either secure or community cloud.
    #[default]
    All,
    /// Secure cloud only.
    Secure,
    /// Community cloud only.
    Community,
}

/// Pod as returned by the API. Only `id` is guaranteed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Pod ID, assigned at creation.
    pub id: String,
    /// Pod name.
    pub name: Option<String>,
    /// Container image.
    pub image_name: Option<String>,
    /// Number of GPUs.
    pub gpu_count: Option<u32>,
    /// Persistent volume size in GB.
    pub volume_in_gb: Option<u32>,
    /// Container disk size in GB.
    pub container_disk_in_gb: Option<u32>,
    /// Requested status.
    pub desired_status: Option<PodStatus>,
    /// Exposed ports, e.g. `8888/http,22/tcp`.
    pub ports: Option<String>,
    /// Mount path of the persistent volume.
    pub volume_mount_path: Option<String>,
    /// Docker arguments.
    pub docker_args: Option<String>,
    /// Environment, usually sent back as `["KEY=VALUE"]`.
    pub env: Option<EnvVars>,
    /// Machine the pod is scheduled on.
    pub machine_id: Option<String>,
    /// Machine details.
    pub machine: Option<Machine>,
    /// Runtime details, absent while the pod is not running.
    pub runtime: Option<Runtime>,
}

/// Machine details of a pod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Host ID of the pod.
    pub pod_host_id: Option<String>,
    /// GPU type of the machine.
    pub gpu_type_id: Option<String>,
}

/// Runtime details of a running pod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    /// Seconds since the container started.
    pub uptime_in_seconds: Option<u64>,
    /// Port mappings.
    pub ports: Option<Vec<PortMapping>>,
}

/// A port exposed by a running pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// IP address.
    pub ip: Option<String>,
    /// Whether `ip` is publicly reachable.
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_ip_public: bool,
    /// Port inside the container.
    pub private_port: Option<u16>,
    /// Port on `ip`.
    pub public_port: Option<u16>,
    /// Protocol (`http` or `tcp`).
    #[serde(rename = "type")]
    pub port_type: Option<String>,
}

// ============================================================================
// Environment
// ============================================================================

/// A single environment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub key: String,
    /// Variable value, possibly empty.
    pub value: String,
}

impl EnvVar {
    /// Parse a `KEY=VALUE` entry. A missing `=` yields an empty value.
    #[must_use]
    pub fn parse(entry: &str) -> Self {
        let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Environment entries decoded from a pod.
///
/// Decoding accepts the API's `["KEY=VALUE"]` form as well as
/// `[{"key": ..., "value": ...}]`. Requests always use the key/value form,
/// built explicitly with [`EnvVars::from_map`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvVars(pub Vec<EnvVar>);

impl EnvVars {
    /// Build the outbound key/value list from a map.
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        map.iter()
            .map(|(key, value)| EnvVar {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Collapse into a map. Later duplicates win.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<EnvVar> for EnvVars {
    fn from_iter<I: IntoIterator<Item = EnvVar>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for EnvVars {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Entries(Vec<String>),
            Pairs(Vec<EnvVar>),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Entries(entries) => entries.iter().map(|e| EnvVar::parse(e)).collect(),
            Wire::Pairs(pairs) => Self(pairs),
        })
    }
}

// ============================================================================
// Request types
// ============================================================================

/// Input of the `podFindAndDeployOnDemand` mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodInput {
    /// Pod name.
    pub name: String,
    /// Container image.
    pub image_name: String,
    /// Resolved GPU type. The API accepts exactly one.
    pub gpu_type_id: String,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Persistent volume size in GB.
    pub volume_in_gb: u32,
    /// Container disk size in GB.
    pub container_disk_in_gb: u32,
    /// Cloud placement class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_type: Option<CloudType>,
    /// Exposed ports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    /// Mount path of the persistent volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_mount_path: Option<String>,
    /// Docker arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_args: Option<String>,
    /// Environment as key/value pairs.
    #[serde(skip_serializing_if = "EnvVars::is_empty")]
    pub env: EnvVars,
    /// Minimum vCPU count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_vcpu_count: Option<u32>,
    /// Minimum memory in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_memory_in_gb: Option<u32>,
    /// Network volume to attach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_volume_id: Option<String>,
    /// Template to start from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Data center to deploy in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_center_id: Option<String>,
    /// Request a public IP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_public_ip: Option<bool>,
    /// Start the SSH service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_ssh: Option<bool>,
}

// ============================================================================
// GPU types
// ============================================================================

/// GPU type offered by RunPod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuType {
    /// GPU type ID, e.g. `NVIDIA RTX A4000`.
    pub id: String,
    /// Display name.
    pub display_name: Option<String>,
    /// GPU memory in GB.
    pub memory_in_gb: Option<u32>,
    /// Available in secure cloud.
    #[serde(default, deserialize_with = "null_as_false")]
    pub secure_cloud: bool,
    /// Available in community cloud.
    #[serde(default, deserialize_with = "null_as_false")]
    pub community_cloud: bool,
}

/// Nullable GraphQL booleans decode as `false`.
fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Response payloads
// ============================================================================

/// `data` of the create mutation.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePodData {
    /// Created pod.
    #[serde(rename = "podFindAndDeployOnDemand")]
    pub pod: Option<Pod>,
}

/// `data` of the pod query.
#[derive(Debug, Default, Deserialize)]
pub struct PodData {
    /// Requested pod.
    pub pod: Option<Pod>,
}

/// `data` of the stop mutation.
#[derive(Debug, Default, Deserialize)]
pub struct StopPodData {
    /// Stopped pod.
    #[serde(rename = "podStop")]
    pub pod: Option<Pod>,
}

/// `data` of the resume mutation.
#[derive(Debug, Default, Deserialize)]
pub struct ResumePodData {
    /// Resumed pod.
    #[serde(rename = "podResume")]
    pub pod: Option<Pod>,
}

/// `data` of the GPU types query.
#[derive(Debug, Default, Deserialize)]
pub struct GpuTypesData {
    /// Matching GPU types.
    #[serde(rename = "gpuTypes")]
    pub gpu_types: Option<Vec<GpuType>>,
}
