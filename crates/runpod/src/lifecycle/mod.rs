//! Pod lifecycle: create, read, update, delete and import.
//!
//! [`PodController`] drives the [`PodApi`] operations and passes every pod the
//! API returns through [`reconcile::merge`](crate::reconcile::merge) before it
//! becomes [`PodState`]. Entry points report failures as [`Diagnostics`].

mod diagnostics;
mod state;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use state::{PodConfig, PodState};

use tracing::{debug, info, warn};

use crate::error::RunpodError;
use crate::providers::runpod::{Pod, PodStatus};
use crate::providers::PodApi;
use crate::reconcile::{self, POD_FIELDS};

/// Where a pod is in its lifecycle, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    /// No remote pod is tracked.
    Absent,
    /// Just created; state came from the create response.
    Created,
    /// State matches the last read.
    Synced,
    /// A write-once attribute changed; the pod is destroyed and recreated.
    Replacing,
    /// Terminated.
    Deleted,
}

/// Result of [`PodController::read`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The pod exists; here is its reconciled state.
    Synced(PodState),
    /// The pod is gone; the host should drop it from state.
    Absent,
}

impl ReadOutcome {
    /// Phase the pod is in after this read.
    #[must_use]
    pub fn phase(&self) -> PodPhase {
        match self {
            Self::Synced(_) => PodPhase::Synced,
            Self::Absent => PodPhase::Absent,
        }
    }
}

/// Result of [`PodController::create`].
///
/// The pod exists once this is returned, even when `warnings` is not empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    /// State of the new pod.
    pub state: PodState,
    /// Follow-up steps that failed, such as stopping a pod that should start `EXITED`.
    pub warnings: Diagnostics,
}

/// What applying a config to tracked state would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedChange {
    /// Nothing is tracked yet.
    Create,
    /// Desired and tracked state agree.
    NoChange,
    /// These attributes change without replacing the pod.
    InPlace(Vec<&'static str>),
    /// These write-once attributes changed; the pod must be replaced.
    Replace(Vec<&'static str>),
    /// The config is gone; the pod should be terminated.
    Delete,
}

impl PlannedChange {
    /// Phase the pod ends up in once the change is applied.
    #[must_use]
    pub fn target_phase(&self) -> PodPhase {
        match self {
            Self::Create => PodPhase::Created,
            Self::NoChange | Self::InPlace(_) => PodPhase::Synced,
            Self::Replace(_) => PodPhase::Replacing,
            Self::Delete => PodPhase::Deleted,
        }
    }
}

/// Drives pod lifecycle operations against a [`PodApi`].
pub struct PodController<A: PodApi> {
    api: A,
}

impl<A: PodApi> PodController<A> {
    /// Create a controller over `api`.
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create a pod from `config`.
    ///
    /// Attributes the create response leaves out keep their configured
    /// values. A pod that should start `EXITED` is stopped right after
    /// creation; if that fails the pod is tracked as running so the next
    /// update retries the stop, and the failure comes back as a warning.
    ///
    /// # Errors
    /// Returns diagnostics if the config is invalid or the create call fails.
    /// No state is produced in that case.
    pub async fn create(&self, config: &PodConfig) -> Result<Created, Diagnostics> {
        let input = config
            .to_input()
            .map_err(|e| Diagnostics::from_error("Invalid pod configuration", &e))?;

        let pod = self
            .api
            .create_pod(&input)
            .await
            .map_err(|e| Diagnostics::from_error("Unable to create pod", &e))?;

        let mut state = reconciled(&pod, &PodState::from_config(config))?;
        let mut warnings = Diagnostics::default();
        info!(pod_id = %pod.id, "Created pod");

        if config.desired_status == PodStatus::Exited {
            match self.api.stop_pod(&pod.id).await {
                Ok(Some(stopped)) => state = reconciled(&stopped, &state)?,
                Ok(None) => state.desired_status = Some(PodStatus::Exited),
                Err(e) => {
                    warn!(pod_id = %pod.id, error = %e, "Created pod could not be stopped");
                    warnings.warn("Unable to stop pod after create", e.to_string());
                    state.desired_status = Some(PodStatus::Running);
                }
            }
        }

        Ok(Created { state, warnings })
    }

    /// Refresh tracked state from the API.
    ///
    /// A pod the API no longer knows about is [`ReadOutcome::Absent`], not an
    /// error.
    ///
    /// # Errors
    /// Returns diagnostics for any other API failure.
    pub async fn read(&self, state: &PodState) -> Result<ReadOutcome, Diagnostics> {
        let Some(id) = state.id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(ReadOutcome::Absent);
        };

        match self.api.get_pod(id).await {
            Ok(pod) => Ok(ReadOutcome::Synced(reconciled(&pod, state)?)),
            Err(e) if e.is_not_found() => {
                warn!(pod_id = %id, error = %e, "Pod not found, removing from state");
                Ok(ReadOutcome::Absent)
            }
            Err(e) => Err(Diagnostics::from_error("Unable to read pod", &e)),
        }
    }

    /// Apply `config` to a tracked pod without replacing it.
    ///
    /// The only remote effect is stopping or resuming the pod when the desired
    /// status differs from the tracked one. Everything else is recorded.
    /// Write-once changes need a replacement, which [`PodController::plan`]
    /// reports; the caller is expected to delete and create instead.
    ///
    /// # Errors
    /// Returns diagnostics if the config is invalid, the pod has no ID, or the
    /// stop/resume call fails.
    pub async fn update(&self, config: &PodConfig, state: &PodState) -> Result<PodState, Diagnostics> {
        config
            .validate()
            .map_err(|e| Diagnostics::from_error("Invalid pod configuration", &e))?;
        let Some(id) = state.id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(Diagnostics::error("Unable to update pod", "pod has no ID in state"));
        };

        let prior = state.to_attributes().map_err(internal)?;
        let planned = PodState::from_config(config).to_attributes().map_err(internal)?;

        let mut next = PodState::from_attributes(reconcile::carry_forward(POD_FIELDS, &planned, &prior))
            .map_err(internal)?;

        // Unknown covers transitional statuses; the pod is already on its way.
        let tracked = state.desired_status.unwrap_or_default();
        if tracked != PodStatus::Unknown && config.desired_status != tracked {
            debug!(pod_id = %id, from = %tracked, to = %config.desired_status, "Changing pod status");
            let returned = match config.desired_status {
                PodStatus::Exited => self.api.stop_pod(id).await,
                _ => self.api.resume_pod(id, config.gpu_count).await,
            }
            .map_err(|e| Diagnostics::from_error("Unable to change pod status", &e))?;

            if let Some(pod) = returned {
                next = reconciled(&pod, &next)?;
            }
        }

        info!(pod_id = %id, "Updated pod");
        Ok(next)
    }

    /// Terminate a tracked pod. A pod that is already gone counts as deleted.
    ///
    /// # Errors
    /// Returns diagnostics if termination fails for any other reason.
    pub async fn delete(&self, state: &PodState) -> Result<(), Diagnostics> {
        let Some(id) = state.id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        match self.api.terminate_pod(id).await {
            Ok(()) => {
                info!(pod_id = %id, "Terminated pod");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(pod_id = %id, "Pod already gone");
                Ok(())
            }
            Err(e) => Err(Diagnostics::from_error("Unable to terminate pod", &e)),
        }
    }

    /// Start tracking an existing pod by ID.
    ///
    /// # Errors
    /// Returns diagnostics if the pod does not exist or cannot be read.
    pub async fn import(&self, id: &str) -> Result<PodState, Diagnostics> {
        if id.is_empty() {
            return Err(Diagnostics::error("Unable to import pod", "pod ID must not be empty"));
        }

        let pod = self
            .api
            .get_pod(id)
            .await
            .map_err(|e| Diagnostics::from_error("Unable to import pod", &e))?;

        info!(pod_id = %id, "Imported pod");
        reconciled(&pod, &PodState::with_id(id))
    }

    /// Compare a config with tracked state.
    ///
    /// # Errors
    /// Returns diagnostics if either side cannot be converted to attributes.
    pub fn plan(&self, config: Option<&PodConfig>, state: Option<&PodState>) -> Result<PlannedChange, Diagnostics> {
        let tracked = state.filter(|s| s.id.as_deref().is_some_and(|id| !id.is_empty()));

        let (config, state) = match (config, tracked) {
            (None, None) => return Ok(PlannedChange::NoChange),
            (None, Some(_)) => return Ok(PlannedChange::Delete),
            (Some(_), None) => return Ok(PlannedChange::Create),
            (Some(config), Some(state)) => (config, state),
        };

        let desired = PodState::from_config(config).to_attributes().map_err(internal)?;
        let prior = state.to_attributes().map_err(internal)?;

        let replaced = reconcile::replacement_fields(POD_FIELDS, &desired, &prior);
        if !replaced.is_empty() {
            return Ok(PlannedChange::Replace(replaced));
        }

        let changed = reconcile::changed_fields(POD_FIELDS, &desired, &prior);
        Ok(if changed.is_empty() {
            PlannedChange::NoChange
        } else {
            PlannedChange::InPlace(changed)
        })
    }
}

/// Merge a pod returned by the API into `prior`.
fn reconciled(pod: &Pod, prior: &PodState) -> Result<PodState, Diagnostics> {
    let remote = PodState::from(pod).to_attributes().map_err(internal)?;
    let prior = prior.to_attributes().map_err(internal)?;
    PodState::from_attributes(reconcile::merge(POD_FIELDS, Some(&remote), &prior)).map_err(internal)
}

fn internal(err: RunpodError) -> Diagnostics {
    Diagnostics::from_error("Unable to convert pod state", &err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::runpod::{CloudType, EnvVars, Machine};
    use crate::providers::traits::MockPodApi;

    fn config() -> PodConfig {
        let mut config = PodConfig::new("x", "img");
        config.gpu_type_ids = vec!["NVIDIA RTX A4000".to_string()];
        config.volume_in_gb = 20;
        config.env.insert("HF_TOKEN".to_string(), "t".to_string());
        config
    }

    fn created_pod() -> Pod {
        Pod {
            id: "p1".to_string(),
            machine_id: Some("m1".to_string()),
            desired_status: Some(PodStatus::Running),
            ..Pod::default()
        }
    }

    fn tracked() -> PodState {
        let mut state = PodState::from_config(&config());
        state.id = Some("p1".to_string());
        state.machine_id = Some("m1".to_string());
        state
    }

    #[tokio::test]
    async fn test_create_keeps_configured_attributes() {
        let mut api = MockPodApi::new();
        api.expect_create_pod()
            .withf(|input| input.gpu_type_id == "NVIDIA RTX A4000" && input.volume_in_gb == 20)
            .times(1)
            .returning(|_| Ok(created_pod()));
        api.expect_stop_pod().never();

        let created = PodController::new(api).create(&config()).await.unwrap();
        assert!(created.warnings.is_empty());

        let state = created.state;
        assert_eq!(state.id.as_deref(), Some("p1"));
        assert_eq!(state.machine_id.as_deref(), Some("m1"));
        assert_eq!(state.gpu_type_id.as_deref(), Some("NVIDIA RTX A4000"));
        assert_eq!(state.gpu_type_ids, Some(vec!["NVIDIA RTX A4000".to_string()]));
        assert_eq!(state.volume_in_gb, Some(20));
        assert_eq!(state.env.unwrap().get("HF_TOKEN").map(String::as_str), Some("t"));
    }

    #[tokio::test]
    async fn test_create_stops_pod_that_should_be_exited() {
        let mut api = MockPodApi::new();
        api.expect_create_pod().returning(|_| Ok(created_pod()));
        api.expect_stop_pod()
            .withf(|id| id == "p1")
            .times(1)
            .returning(|_| {
                Ok(Some(Pod {
                    id: "p1".to_string(),
                    desired_status: Some(PodStatus::Exited),
                    ..Pod::default()
                }))
            });

        let mut config = config();
        config.desired_status = PodStatus::Exited;
        let created = PodController::new(api).create(&config).await.unwrap();

        assert!(created.warnings.is_empty());
        assert_eq!(created.state.desired_status, Some(PodStatus::Exited));
        assert_eq!(created.state.machine_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_create_reports_failed_stop_as_warning() {
        let mut api = MockPodApi::new();
        api.expect_create_pod().returning(|_| Ok(created_pod()));
        api.expect_stop_pod().times(1).returning(|_| {
            Err(RunpodError::Api {
                status: 500,
                body: "stop failed".to_string(),
            })
        });

        let mut config = config();
        config.desired_status = PodStatus::Exited;
        let created = PodController::new(api).create(&config).await.unwrap();

        assert_eq!(created.state.id.as_deref(), Some("p1"));
        assert_eq!(created.state.desired_status, Some(PodStatus::Running));
        assert!(!created.warnings.has_error());
        assert_eq!(created.warnings.0.len(), 1);
        assert_eq!(created.warnings.0[0].severity, Severity::Warning);
        assert_eq!(created.warnings.0[0].summary, "Unable to stop pod after create");
        assert!(created.warnings.0[0].detail.contains("stop failed"));
    }

    #[tokio::test]
    async fn test_create_failure_produces_no_state() {
        let mut api = MockPodApi::new();
        api.expect_create_pod().returning(|_| {
            Err(RunpodError::Protocol {
                messages: vec!["no capacity".to_string()],
            })
        });

        let diags = PodController::new(api).create(&config()).await.unwrap_err();
        assert!(diags.has_error());
        assert_eq!(diags.0[0].detail, "GraphQL error: no capacity");
    }

    #[tokio::test]
    async fn test_invalid_config_sends_nothing() {
        let mut api = MockPodApi::new();
        api.expect_create_pod().never();

        let mut config = config();
        config.gpu_type_ids.clear();
        assert!(PodController::new(api).create(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_pod_is_absent() {
        let mut api = MockPodApi::new();
        api.expect_get_pod().returning(|_| {
            Err(RunpodError::Protocol {
                messages: vec!["Pod not found".to_string()],
            })
        });

        let outcome = PodController::new(api).read(&tracked()).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Absent);
        assert_eq!(outcome.phase(), PodPhase::Absent);
    }

    #[tokio::test]
    async fn test_read_other_errors_are_reported() {
        let mut api = MockPodApi::new();
        api.expect_get_pod().returning(|_| {
            Err(RunpodError::Api {
                status: 500,
                body: "internal".to_string(),
            })
        });

        assert!(PodController::new(api).read(&tracked()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_retains_unconfirmed_attributes() {
        let mut api = MockPodApi::new();
        api.expect_get_pod().returning(|_| {
            Ok(Pod {
                id: "p1".to_string(),
                env: Some(EnvVars::default()),
                machine: Some(Machine {
                    pod_host_id: Some("h1".to_string()),
                    gpu_type_id: None,
                }),
                ..Pod::default()
            })
        });

        let mut state = tracked();
        state.cloud_type = Some(CloudType::Secure);

        let ReadOutcome::Synced(read) = PodController::new(api).read(&state).await.unwrap() else {
            panic!("expected pod to exist");
        };
        assert_eq!(read.cloud_type, Some(CloudType::Secure));
        assert_eq!(read.pod_host_id.as_deref(), Some("h1"));
        assert_eq!(read.gpu_type_id.as_deref(), Some("NVIDIA RTX A4000"));
        assert_eq!(read.env, state.env);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let mut api = MockPodApi::new();
        api.expect_terminate_pod()
            .times(2)
            .returning({
                let mut calls = 0;
                move |_| {
                    calls += 1;
                    if calls == 1 {
                        Ok(())
                    } else {
                        Err(RunpodError::Protocol {
                            messages: vec!["Pod not found".to_string()],
                        })
                    }
                }
            });

        let controller = PodController::new(api);
        controller.delete(&tracked()).await.unwrap();
        controller.delete(&tracked()).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_without_id_is_a_no_op() {
        let mut api = MockPodApi::new();
        api.expect_terminate_pod().never();
        PodController::new(api).delete(&PodState::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_only_changes_status_when_it_differs() {
        let mut api = MockPodApi::new();
        api.expect_stop_pod().never();
        api.expect_resume_pod().never();

        let mut config = config();
        config.name = "renamed".to_string();
        let next = PodController::new(api).update(&config, &tracked()).await.unwrap();

        assert_eq!(next.name.as_deref(), Some("renamed"));
        assert_eq!(next.id.as_deref(), Some("p1"));
        assert_eq!(next.machine_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_update_resumes_exited_pod() {
        let mut api = MockPodApi::new();
        api.expect_resume_pod()
            .withf(|id, gpu_count| id == "p1" && *gpu_count == 1)
            .times(1)
            .returning(|_, _| Ok(None));

        let mut state = tracked();
        state.desired_status = Some(PodStatus::Exited);
        let next = PodController::new(api).update(&config(), &state).await.unwrap();

        assert_eq!(next.desired_status, Some(PodStatus::Running));
    }

    #[tokio::test]
    async fn test_update_leaves_transitional_pod_alone() {
        let mut api = MockPodApi::new();
        api.expect_stop_pod().never();
        api.expect_resume_pod().never();

        let mut state = tracked();
        state.desired_status = Some(PodStatus::Unknown);
        let next = PodController::new(api).update(&config(), &state).await.unwrap();

        assert_eq!(next.id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_import_missing_pod_is_an_error() {
        let mut api = MockPodApi::new();
        api.expect_get_pod()
            .returning(|id| Err(RunpodError::EmptyResult(format!("pod {id}"))));

        assert!(PodController::new(api).import("gone").await.is_err());
    }

    #[tokio::test]
    async fn test_import_fills_defaults() {
        let mut api = MockPodApi::new();
        api.expect_get_pod().returning(|_| Ok(created_pod()));

        let state = PodController::new(api).import("p1").await.unwrap();
        assert_eq!(state.id.as_deref(), Some("p1"));
        assert_eq!(state.cloud_type, Some(CloudType::All));
        assert_eq!(state.gpu_count, Some(1));
    }

    #[test]
    fn test_plan() {
        let controller = PodController::new(MockPodApi::new());
        let state = tracked();

        assert_eq!(controller.plan(Some(&config()), None).unwrap(), PlannedChange::Create);
        assert_eq!(controller.plan(None, Some(&state)).unwrap(), PlannedChange::Delete);
        assert_eq!(
            controller.plan(Some(&config()), Some(&state)).unwrap(),
            PlannedChange::NoChange
        );

        let mut config = config();
        config.gpu_count = 2;
        assert_eq!(
            controller.plan(Some(&config), Some(&state)).unwrap(),
            PlannedChange::InPlace(vec!["gpu_count"])
        );

        config.image_name = "img:2".to_string();
        let change = controller.plan(Some(&config), Some(&state)).unwrap();
        assert_eq!(change, PlannedChange::Replace(vec!["image_name"]));
        assert_eq!(change.target_phase(), PodPhase::Replacing);
    }
}
