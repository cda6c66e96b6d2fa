//! RunPod GPU pod provisioning.
//!
//! This crate manages GPU pods through the RunPod GraphQL API and exposes a
//! declarative create / read / update / delete / import lifecycle to a host
//! that tracks pod state between runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         PodController                        │
//! │     create · read · update · delete · import · plan          │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │   reconcile (POD_FIELDS)     │   GpuCatalog                  │
//! │   merge remote into state    │   list / get GPU types        │
//! ├──────────────────────────────┴───────────────────────────────┤
//! │                  PodApi (RunpodClient)                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │   Transport: single-flight queue, retry on 429/503           │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                 https://api.runpod.io/graphql
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use runpod::{PodConfig, PodController, ProviderConfig, RunpodClient};
//!
//! let client = RunpodClient::connect(&ProviderConfig::default()).await?;
//! let controller = PodController::new(client);
//!
//! let mut config = PodConfig::new("inference", "runpod/pytorch:2.1.0");
//! config.gpu_type_ids = vec!["NVIDIA RTX A4000".to_string()];
//!
//! let created = controller.create(&config).await?;
//! controller.delete(&created.state).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod providers;
pub mod reconcile;
pub mod transport;

pub use catalog::GpuCatalog;
pub use config::{CredentialPlacement, ProviderConfig};
pub use error::RunpodError;
pub use lifecycle::{
    Created, Diagnostic, Diagnostics, PlannedChange, PodConfig, PodController, PodPhase, PodState,
    ReadOutcome, Severity,
};
pub use providers::runpod::{CloudType, GpuType, Pod, PodStatus, RunpodClient};
pub use providers::PodApi;
