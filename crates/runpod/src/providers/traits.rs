//! Pod API trait.

use async_trait::async_trait;

use super::runpod::{GpuType, Pod, PodInput};
use crate::error::RunpodError;

/// Typed operations against the pod API.
///
/// Every call is one remote exchange; nothing is cached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PodApi: Send + Sync {
    /// Check that the credential works.
    async fn ping(&self) -> Result<(), RunpodError>;

    /// Create an on-demand pod.
    async fn create_pod(&self, input: &PodInput) -> Result<Pod, RunpodError>;

    /// Get a pod by ID.
    async fn get_pod(&self, id: &str) -> Result<Pod, RunpodError>;

    /// Terminate a pod.
    async fn terminate_pod(&self, id: &str) -> Result<(), RunpodError>;

    /// Stop a pod, keeping its volume.
    async fn stop_pod(&self, id: &str) -> Result<Option<Pod>, RunpodError>;

    /// Resume a stopped pod with the given GPU count.
    async fn resume_pod(&self, id: &str, gpu_count: u32) -> Result<Option<Pod>, RunpodError>;

    /// List all GPU types.
    async fn list_gpu_types(&self) -> Result<Vec<GpuType>, RunpodError>;

    /// Get the GPU type with exactly this ID.
    async fn get_gpu_type(&self, id: &str) -> Result<GpuType, RunpodError>;
}
