//! RunPod pod provider.
//!
//! Implements the [`PodApi`](crate::providers::traits::PodApi) trait on top of
//! the RunPod GraphQL API.
//!
//! ## Example
//!
//! ```ignore
//! use runpod::config::ProviderConfig;
//! use runpod::providers::runpod::RunpodClient;
//! use runpod::providers::traits::PodApi;
//!
//! let client = RunpodClient::connect(&ProviderConfig::default()).await?;
//!
//! // List GPU types
//! let gpus = client.list_gpu_types().await?;
//!
//! // Fetch a pod
//! let pod = client.get_pod("abc123xyz").await?;
//! ```

mod client;
mod models;
pub mod queries;

pub use client::RunpodClient;
pub use models::*;
