//! RunPod GraphQL API client implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::models::{
    CreatePodData, GpuType, GpuTypesData, Pod, PodData, PodInput, ResumePodData, StopPodData,
};
use super::queries;
use crate::config::ProviderConfig;
use crate::error::RunpodError;
use crate::providers::traits::PodApi;
use crate::transport::{Transport, Variables};

/// RunPod API client.
#[derive(Clone)]
pub struct RunpodClient {
    /// Single-flight transport shared by all operations.
    transport: Transport,
}

impl RunpodClient {
    /// Create a new RunPod client.
    ///
    /// # Errors
    /// Returns error if no API key is available or the transport cannot start.
    pub fn new(config: &ProviderConfig) -> Result<Self, RunpodError> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    /// Create a client and verify the credential with a ping.
    ///
    /// # Errors
    /// Returns error if the client cannot be built or the ping fails.
    pub async fn connect(config: &ProviderConfig) -> Result<Self, RunpodError> {
        let client = Self::new(config)?;
        client.ping().await?;
        Ok(client)
    }

    /// Underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Execute a document and decode its payload.
    ///
    /// A `null` payload decodes to `T::default()`.
    async fn run<T>(&self, document: &str, variables: Variables) -> Result<T, RunpodError>
    where
        T: DeserializeOwned + Default,
    {
        match self.transport.execute(document, variables).await? {
            Value::Null => Ok(T::default()),
            data => Ok(serde_json::from_value(data)?),
        }
    }
}

/// `{"input": <value>}`
fn input_variables(input: Value) -> Variables {
    let mut variables = Variables::new();
    variables.insert("input".to_string(), input);
    variables
}

fn pod_id_variables(id: &str) -> Variables {
    input_variables(json!({ "podId": id }))
}

#[async_trait]
impl PodApi for RunpodClient {
    async fn ping(&self) -> Result<(), RunpodError> {
        self.transport.execute(queries::PING, Variables::new()).await?;
        debug!("RunPod API reachable");
        Ok(())
    }

    async fn create_pod(&self, input: &PodInput) -> Result<Pod, RunpodError> {
        info!(
            name = %input.name,
            gpu_type = %input.gpu_type_id,
            gpu_count = input.gpu_count,
            "Creating pod"
        );

        let variables = input_variables(serde_json::to_value(input)?);
        let data: CreatePodData = self.run(queries::CREATE_POD, variables).await?;
        let pod = data
            .pod
            .ok_or_else(|| RunpodError::EmptyResult("no pod returned from create".to_string()))?;

        info!(pod_id = %pod.id, "Pod created");
        Ok(pod)
    }

    async fn get_pod(&self, id: &str) -> Result<Pod, RunpodError> {
        let data: PodData = self.run(queries::GET_POD, pod_id_variables(id)).await?;
        data.pod
            .ok_or_else(|| RunpodError::EmptyResult(format!("pod {id}")))
    }

    async fn terminate_pod(&self, id: &str) -> Result<(), RunpodError> {
        info!(pod_id = %id, "Terminating pod");
        self.transport
            .execute(queries::TERMINATE_POD, pod_id_variables(id))
            .await?;
        info!(pod_id = %id, "Pod terminated");
        Ok(())
    }

    async fn stop_pod(&self, id: &str) -> Result<Option<Pod>, RunpodError> {
        info!(pod_id = %id, "Stopping pod");
        let data: StopPodData = self.run(queries::STOP_POD, pod_id_variables(id)).await?;
        Ok(data.pod)
    }

    async fn resume_pod(&self, id: &str, gpu_count: u32) -> Result<Option<Pod>, RunpodError> {
        info!(pod_id = %id, gpu_count, "Resuming pod");
        let variables = input_variables(json!({ "podId": id, "gpuCount": gpu_count }));
        let data: ResumePodData = self.run(queries::RESUME_POD, variables).await?;
        Ok(data.pod)
    }

    async fn list_gpu_types(&self) -> Result<Vec<GpuType>, RunpodError> {
        let data: GpuTypesData = self.run(queries::LIST_GPU_TYPES, Variables::new()).await?;
        Ok(data.gpu_types.unwrap_or_default())
    }

    async fn get_gpu_type(&self, id: &str) -> Result<GpuType, RunpodError> {
        let variables = input_variables(json!({ "id": id }));
        let data: GpuTypesData = self.run(queries::GET_GPU_TYPE, variables).await?;
        data.gpu_types
            .unwrap_or_default()
            .into_iter()
            .find(|gpu| gpu.id == id)
            .ok_or_else(|| RunpodError::EmptyResult(format!("GPU type {id}")))
    }
}
