//! Desired configuration and tracked state of a pod.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RunpodError;
use crate::providers::runpod::{CloudType, EnvVars, Pod, PodInput, PodStatus, PortMapping};
use crate::reconcile::Attributes;

fn default_gpu_count() -> u32 {
    1
}

fn default_container_disk_in_gb() -> u32 {
    20
}

fn default_volume_mount_path() -> String {
    "/workspace".to_string()
}

fn default_true() -> bool {
    true
}

/// Desired pod configuration supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodConfig {
    /// Pod name.
    pub name: String,
    /// Container image.
    pub image_name: String,
    /// GPU type, used when `gpu_type_ids` is empty.
    #[serde(default)]
    pub gpu_type_id: Option<String>,
    /// Acceptable GPU types in order of preference. The first one is requested.
    #[serde(default)]
    pub gpu_type_ids: Vec<String>,
    /// Number of GPUs.
    #[serde(default = "default_gpu_count")]
    pub gpu_count: u32,
    /// Persistent volume size in GB.
    #[serde(default)]
    pub volume_in_gb: u32,
    /// Container disk size in GB.
    #[serde(default = "default_container_disk_in_gb")]
    pub container_disk_in_gb: u32,
    /// Cloud placement class.
    #[serde(default)]
    pub cloud_type: CloudType,
    /// Exposed ports, e.g. `8888/http,22/tcp`.
    #[serde(default)]
    pub ports: Option<String>,
    /// Mount path of the persistent volume.
    #[serde(default = "default_volume_mount_path")]
    pub volume_mount_path: String,
    /// Docker arguments.
    #[serde(default)]
    pub docker_args: Option<String>,
    /// Container environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Minimum vCPU count.
    #[serde(default)]
    pub min_vcpu_count: Option<u32>,
    /// Minimum memory in GB.
    #[serde(default)]
    pub min_memory_in_gb: Option<u32>,
    /// Network volume to attach.
    #[serde(default)]
    pub network_volume_id: Option<String>,
    /// Template to start from.
    #[serde(default)]
    pub template_id: Option<String>,
    /// Data center to deploy in.
    #[serde(default)]
    pub data_center_id: Option<String>,
    /// Request a public IP.
    #[serde(default = "default_true")]
    pub support_public_ip: bool,
    /// Start the SSH service.
    #[serde(default = "default_true")]
    pub start_ssh: bool,
    /// Operational status: `RUNNING` or `EXITED`.
    #[serde(default)]
    pub desired_status: PodStatus,
}

impl PodConfig {
    /// A config with every optional attribute at its default.
    pub fn new(name: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_name: image_name.into(),
            gpu_type_id: None,
            gpu_type_ids: Vec::new(),
            gpu_count: default_gpu_count(),
            volume_in_gb: 0,
            container_disk_in_gb: default_container_disk_in_gb(),
            cloud_type: CloudType::default(),
            ports: None,
            volume_mount_path: default_volume_mount_path(),
            docker_args: None,
            env: BTreeMap::new(),
            min_vcpu_count: None,
            min_memory_in_gb: None,
            network_volume_id: None,
            template_id: None,
            data_center_id: None,
            support_public_ip: true,
            start_ssh: true,
            desired_status: PodStatus::Running,
        }
    }

    /// The single GPU type sent to the API.
    ///
    /// The first candidate of `gpu_type_ids` wins over `gpu_type_id`.
    #[must_use]
    pub fn resolved_gpu_type(&self) -> Option<&str> {
        self.gpu_type_ids
            .first()
            .or(self.gpu_type_id.as_ref())
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Check the constraints the API enforces less helpfully.
    ///
    /// # Errors
    /// Returns [`RunpodError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), RunpodError> {
        if self.name.is_empty() {
            return Err(RunpodError::Config("name must not be empty".to_string()));
        }
        if self.image_name.is_empty() {
            return Err(RunpodError::Config("image_name must not be empty".to_string()));
        }
        if self.resolved_gpu_type().is_none() {
            return Err(RunpodError::Config(
                "one of gpu_type_id or gpu_type_ids is required".to_string(),
            ));
        }
        if self.gpu_count < 1 {
            return Err(RunpodError::Config("gpu_count must be at least 1".to_string()));
        }
        if self.container_disk_in_gb < 1 {
            return Err(RunpodError::Config(
                "container_disk_in_gb must be at least 1".to_string(),
            ));
        }
        if !matches!(self.desired_status, PodStatus::Running | PodStatus::Exited) {
            return Err(RunpodError::Config(format!(
                "desired_status must be RUNNING or EXITED, got {}",
                self.desired_status
            )));
        }
        Ok(())
    }

    /// Build the create mutation input.
    ///
    /// # Errors
    /// Returns [`RunpodError::Config`] if the config is invalid.
    pub fn to_input(&self) -> Result<PodInput, RunpodError> {
        self.validate()?;
        let gpu_type_id = self.resolved_gpu_type().unwrap_or_default().to_string();

        Ok(PodInput {
            name: self.name.clone(),
            image_name: self.image_name.clone(),
            gpu_type_id,
            gpu_count: self.gpu_count,
            volume_in_gb: self.volume_in_gb,
            container_disk_in_gb: self.container_disk_in_gb,
            cloud_type: Some(self.cloud_type),
            ports: self.ports.clone().filter(|p| !p.is_empty()),
            volume_mount_path: Some(self.volume_mount_path.clone()).filter(|p| !p.is_empty()),
            docker_args: self.docker_args.clone().filter(|a| !a.is_empty()),
            env: EnvVars::from_map(&self.env),
            min_vcpu_count: self.min_vcpu_count.filter(|n| *n > 0),
            min_memory_in_gb: self.min_memory_in_gb.filter(|n| *n > 0),
            network_volume_id: self.network_volume_id.clone(),
            template_id: self.template_id.clone(),
            data_center_id: self.data_center_id.clone(),
            support_public_ip: Some(self.support_public_ip),
            start_ssh: Some(self.start_ssh),
        })
    }
}

/// Pod state tracked by the host between operations.
///
/// Every attribute is optional: a freshly imported pod only has an `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodState {
    /// Pod ID; `None` until the pod is created or imported.
    pub id: Option<String>,
    /// Pod name.
    pub name: Option<String>,
    /// Container image.
    pub image_name: Option<String>,
    /// GPU type the pod was created with.
    pub gpu_type_id: Option<String>,
    /// Configured GPU type preferences; only the first is sent.
    pub gpu_type_ids: Option<Vec<String>>,
    /// GPUs attached; also sent on resume.
    pub gpu_count: Option<u32>,
    /// Persistent volume size in GB.
    pub volume_in_gb: Option<u32>,
    /// Container disk size in GB.
    pub container_disk_in_gb: Option<u32>,
    /// Secure, community or either.
    pub cloud_type: Option<CloudType>,
    /// Exposed ports, e.g. `8888/http,22/tcp`.
    pub ports: Option<String>,
    /// Where the volume is mounted.
    pub volume_mount_path: Option<String>,
    /// Extra container start arguments.
    pub docker_args: Option<String>,
    /// Environment variables by name.
    pub env: Option<BTreeMap<String, String>>,
    /// Minimum vCPUs.
    pub min_vcpu_count: Option<u32>,
    /// Minimum system memory in GB.
    pub min_memory_in_gb: Option<u32>,
    /// Network volume to attach.
    pub network_volume_id: Option<String>,
    /// Template the pod was deployed from.
    pub template_id: Option<String>,
    /// Data center constraint.
    pub data_center_id: Option<String>,
    /// Request a public IP.
    pub support_public_ip: Option<bool>,
    /// Start the SSH daemon.
    pub start_ssh: Option<bool>,
    /// `RUNNING` or `EXITED`.
    pub desired_status: Option<PodStatus>,
    /// Host machine.
    pub machine_id: Option<String>,
    /// Host-level pod identifier.
    pub pod_host_id: Option<String>,
    /// Seconds since the container started, as of the last read.
    pub uptime_in_seconds: Option<u64>,
    /// Ports reachable on the running pod, as of the last read.
    pub port_mappings: Option<Vec<PortMapping>>,
}

impl PodState {
    /// State that only knows the pod ID, as produced by an import.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// State the host expects after applying `config`, before any server data.
    #[must_use]
    pub fn from_config(config: &PodConfig) -> Self {
        Self {
            id: None,
            name: Some(config.name.clone()),
            image_name: Some(config.image_name.clone()),
            gpu_type_id: config.resolved_gpu_type().map(str::to_string),
            gpu_type_ids: Some(config.gpu_type_ids.clone()).filter(|ids| !ids.is_empty()),
            gpu_count: Some(config.gpu_count),
            volume_in_gb: Some(config.volume_in_gb),
            container_disk_in_gb: Some(config.container_disk_in_gb),
            cloud_type: Some(config.cloud_type),
            ports: config.ports.clone(),
            volume_mount_path: Some(config.volume_mount_path.clone()),
            docker_args: config.docker_args.clone(),
            env: Some(config.env.clone()).filter(|env| !env.is_empty()),
            min_vcpu_count: config.min_vcpu_count,
            min_memory_in_gb: config.min_memory_in_gb,
            network_volume_id: config.network_volume_id.clone(),
            template_id: config.template_id.clone(),
            data_center_id: config.data_center_id.clone(),
            support_public_ip: Some(config.support_public_ip),
            start_ssh: Some(config.start_ssh),
            desired_status: Some(config.desired_status),
            machine_id: None,
            pod_host_id: None,
            uptime_in_seconds: None,
            port_mappings: None,
        }
    }

    /// Convert to reconciler attributes.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_attributes(&self) -> Result<Attributes, RunpodError> {
        match serde_json::to_value(self)? {
            Value::Object(attrs) => Ok(attrs),
            other => Err(RunpodError::Config(format!(
                "pod state serialized to a non-object: {other}"
            ))),
        }
    }

    /// Convert reconciler attributes back into state.
    ///
    /// # Errors
    /// Returns an error if an attribute has the wrong type.
    pub fn from_attributes(attrs: Attributes) -> Result<Self, RunpodError> {
        Ok(serde_json::from_value(Value::Object(attrs))?)
    }
}

impl From<&Pod> for PodState {
    /// Everything the API sent back, under state attribute names.
    fn from(pod: &Pod) -> Self {
        let machine = pod.machine.as_ref();
        let runtime = pod.runtime.as_ref();

        Self {
            id: Some(pod.id.clone()).filter(|id| !id.is_empty()),
            name: pod.name.clone(),
            image_name: pod.image_name.clone(),
            gpu_type_id: machine.and_then(|m| m.gpu_type_id.clone()),
            gpu_count: pod.gpu_count,
            volume_in_gb: pod.volume_in_gb,
            container_disk_in_gb: pod.container_disk_in_gb,
            desired_status: pod.desired_status,
            ports: pod.ports.clone(),
            volume_mount_path: pod.volume_mount_path.clone(),
            docker_args: pod.docker_args.clone(),
            env: pod.env.as_ref().map(EnvVars::to_map),
            machine_id: pod.machine_id.clone(),
            pod_host_id: machine.and_then(|m| m.pod_host_id.clone()),
            uptime_in_seconds: runtime.and_then(|r| r.uptime_in_seconds),
            port_mappings: runtime.and_then(|r| r.ports.clone()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> PodConfig {
        let mut config = PodConfig::new("x", "img");
        config.gpu_type_ids = vec!["NVIDIA RTX A4000".to_string()];
        config.volume_in_gb = 20;
        config
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: PodConfig = serde_json::from_value(json!({
            "name": "x",
            "image_name": "img",
            "gpu_type_id": "NVIDIA A40"
        }))
        .unwrap();

        assert_eq!(config.gpu_count, 1);
        assert_eq!(config.container_disk_in_gb, 20);
        assert_eq!(config.cloud_type, CloudType::All);
        assert_eq!(config.volume_mount_path, "/workspace");
        assert!(config.support_public_ip);
        assert_eq!(config.desired_status, PodStatus::Running);
    }

    #[test]
    fn test_first_candidate_wins() {
        let mut config = config();
        config.gpu_type_ids.push("NVIDIA A40".to_string());
        config.gpu_type_id = Some("NVIDIA H100".to_string());
        assert_eq!(config.resolved_gpu_type(), Some("NVIDIA RTX A4000"));

        config.gpu_type_ids.clear();
        assert_eq!(config.resolved_gpu_type(), Some("NVIDIA H100"));
    }

    #[test]
    fn test_missing_gpu_type_is_rejected() {
        let config = PodConfig::new("x", "img");
        assert!(matches!(config.to_input(), Err(RunpodError::Config(_))));
    }

    #[test]
    fn test_terminated_is_not_a_desired_status() {
        let mut config = config();
        config.desired_status = PodStatus::Terminated;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_input_carries_env_as_pairs() {
        let mut config = config();
        config.env.insert("HF_TOKEN".to_string(), "t".to_string());
        let input = config.to_input().unwrap();

        assert_eq!(input.gpu_type_id, "NVIDIA RTX A4000");
        let wire = serde_json::to_value(&input).unwrap();
        assert_eq!(wire["env"], json!([{"key": "HF_TOKEN", "value": "t"}]));
        assert_eq!(wire["supportPublicIp"], true);
        assert!(wire.get("gpuTypeIds").is_none());
    }

    #[test]
    fn test_state_round_trips_through_attributes() {
        let state = PodState::from_config(&config());
        let attrs = state.to_attributes().unwrap();
        assert_eq!(attrs["gpu_type_id"], "NVIDIA RTX A4000");
        assert_eq!(attrs["cloud_type"], "ALL");
        assert_eq!(PodState::from_attributes(attrs).unwrap(), state);
    }

    #[test]
    fn test_state_from_pod_maps_nested_fields() {
        let pod: Pod = serde_json::from_value(json!({
            "id": "p1",
            "machineId": "m1",
            "machine": {"podHostId": "h1", "gpuTypeId": "NVIDIA A40"},
            "runtime": {"uptimeInSeconds": 42, "ports": [{"ip": "1.2.3.4", "isIpPublic": true, "privatePort": 22, "publicPort": 10022, "type": "tcp"}]}
        }))
        .unwrap();

        let state = PodState::from(&pod);
        assert_eq!(state.pod_host_id.as_deref(), Some("h1"));
        assert_eq!(state.gpu_type_id.as_deref(), Some("NVIDIA A40"));
        assert_eq!(state.uptime_in_seconds, Some(42));
        assert_eq!(state.port_mappings.unwrap()[0].public_port, Some(10022));
    }
}
