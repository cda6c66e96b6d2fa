//! Pod provider implementations.
//!
//! This module contains the [`PodApi`] trait and the RunPod implementation.

pub mod runpod;
pub mod traits;

pub use traits::PodApi;
