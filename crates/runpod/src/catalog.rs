//! GPU type catalog lookup.

use tracing::debug;

use crate::error::RunpodError;
use crate::providers::runpod::GpuType;
use crate::providers::PodApi;

/// Read-only view of the GPU types an account can deploy.
pub struct GpuCatalog<'a, A: PodApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: PodApi + ?Sized> GpuCatalog<'a, A> {
    /// Catalog backed by `api`.
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// All GPU types, or exactly the one whose ID equals `id`.
    ///
    /// # Errors
    /// Returns [`RunpodError::EmptyResult`] if `id` matches nothing, or any
    /// transport error.
    pub async fn lookup(&self, id: Option<&str>) -> Result<Vec<GpuType>, RunpodError> {
        match id {
            Some(id) => {
                debug!(gpu_type = %id, "Looking up GPU type");
                Ok(vec![self.api.get_gpu_type(id).await?])
            }
            None => {
                let gpus = self.api.list_gpu_types().await?;
                debug!(count = gpus.len(), "Listed GPU types");
                Ok(gpus)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::MockPodApi;

    fn gpu(id: &str) -> GpuType {
        GpuType {
            id: id.to_string(),
            ..GpuType::default()
        }
    }

    #[tokio::test]
    async fn test_lookup_without_filter_lists_everything() {
        let mut api = MockPodApi::new();
        api.expect_list_gpu_types()
            .returning(|| Ok(vec![gpu("NVIDIA A40"), gpu("NVIDIA RTX A4000")]));
        api.expect_get_gpu_type().never();

        let gpus = GpuCatalog::new(&api).lookup(None).await.unwrap();
        assert_eq!(gpus.len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_with_filter_returns_one() {
        let mut api = MockPodApi::new();
        api.expect_get_gpu_type()
            .withf(|id| id == "NVIDIA A40")
            .returning(|id| Ok(gpu(id)));
        api.expect_list_gpu_types().never();

        let gpus = GpuCatalog::new(&api).lookup(Some("NVIDIA A40")).await.unwrap();
        assert_eq!(gpus, vec![gpu("NVIDIA A40")]);
    }

    #[tokio::test]
    async fn test_lookup_unknown_id_fails() {
        let mut api = MockPodApi::new();
        api.expect_get_gpu_type()
            .returning(|id| Err(RunpodError::EmptyResult(format!("GPU type {id}"))));

        let err = GpuCatalog::new(&api).lookup(Some("nope")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
