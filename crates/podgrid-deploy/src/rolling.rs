//! Rolling image deploys: replace pods one at a time with health checks, a
//! drain window, and rollback on failure or cancellation.
//!
//! Targets are processed strictly in input order so at most one replacement
//! is in flight and the audit trail reads pod by pod. Cancellation is
//! cooperative: the token is polled at the top of each iteration, inside
//! health polling, and inside the drain countdown; an in-flight fleet call
//! is never interrupted.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use podgrid_fleet::{FleetClient, Pod, PodSpec};
use podgrid_journal::{DeployAction, DeployRecord, DeployStatus};

use crate::cancel::CancelToken;
use crate::engine::DeployEngine;
use crate::event::{DeployEvent, EventSink, PodPhase};

/// Interval between health-check polls.
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Tunables for a rolling deploy.
#[derive(Debug, Clone, Copy)]
pub struct RollingOptions {
    /// Drain window between a healthy replacement and old-pod termination.
    pub grace_period_minutes: u64,
    /// Maximum time for a replacement to become ready.
    pub health_check_timeout_secs: u64,
}

impl Default for RollingOptions {
    fn default() -> Self {
        Self {
            grace_period_minutes: 15,
            health_check_timeout_secs: 300,
        }
    }
}

impl DeployEngine {
    /// Replace each target pod with one running `new_image`, one pod at a
    /// time: create a clone on the new image, wait for it to report
    /// healthy, hold the drain window, then terminate the old pod.
    ///
    /// Any creation or health failure rolls back every completed pair and
    /// finishes `failed`; cancellation rolls back and finishes
    /// `rolled_back`. The outcome is reported solely through the returned
    /// (and journaled) record. An empty target set completes vacuously.
    pub async fn rolling_deploy(
        &self,
        targets: &[Pod],
        new_image: &str,
        options: RollingOptions,
        cancel: CancelToken,
        events: &EventSink,
    ) -> DeployRecord {
        let started = Instant::now();
        let mut record = DeployRecord::begin(DeployAction::RollingDeploy);
        record.old_image = targets.first().map(|p| p.image.clone()).unwrap_or_default();
        record.new_image = new_image.to_string();
        record.pod_count = targets.len() as u32;

        info!(
            deploy_id = %record.deploy_id,
            targets = targets.len(),
            new_image,
            "rolling deploy started"
        );

        let grace_seconds = options.grace_period_minutes * 60;
        let health_timeout = Duration::from_secs(options.health_check_timeout_secs);
        let mut completed_pairs: Vec<(Pod, Pod)> = Vec::new();
        let mut rollback_notes: Vec<String> = Vec::new();
        let mut aborted = false;

        for old_pod in targets {
            if cancel.is_cancelled() {
                rollback_notes.extend(self.rollback_pairs(&completed_pairs).await);
                record.status = DeployStatus::RolledBack;
                record.error = "cancelled by user".to_string();
                aborted = true;
                break;
            }

            // Step 1: replacement pod on the new image.
            events.emit(phase_event(&old_pod.id, PodPhase::CreateNew, ""));
            let spec = replacement_spec(old_pod, new_image, &record.deploy_id);
            let new_pod = match self.fleet.create_pod(&spec).await {
                Ok(pod) => pod,
                Err(e) => {
                    events.emit(phase_event(&old_pod.id, PodPhase::Failed, ""));
                    rollback_notes.extend(self.rollback_pairs(&completed_pairs).await);
                    record.status = DeployStatus::Failed;
                    record.error = format!("failed to create replacement for {}: {e}", old_pod.id);
                    aborted = true;
                    break;
                }
            };

            // Step 2: wait for it to come up.
            events.emit(phase_event(&old_pod.id, PodPhase::HealthCheck, &new_pod.id));
            if !self.wait_for_ready(&new_pod.id, health_timeout, &cancel).await {
                events.emit(phase_event(&old_pod.id, PodPhase::RollingBack, &new_pod.id));
                self.terminate_quietly(&new_pod.id, &mut rollback_notes).await;
                rollback_notes.extend(self.rollback_pairs(&completed_pairs).await);
                record.status = DeployStatus::Failed;
                record.error = format!("new pod {} failed health check", new_pod.id);
                aborted = true;
                break;
            }

            // Step 3: drain window, one countdown tick per second.
            events.emit(phase_event(&old_pod.id, PodPhase::Draining, &new_pod.id));
            let mut remaining = grace_seconds;
            while remaining > 0 && !cancel.is_cancelled() {
                events.emit(DeployEvent::Countdown {
                    remaining_secs: remaining,
                });
                sleep(Duration::from_secs(1)).await;
                remaining -= 1;
            }
            events.emit(DeployEvent::Countdown { remaining_secs: 0 });

            if cancel.is_cancelled() {
                self.terminate_quietly(&new_pod.id, &mut rollback_notes).await;
                rollback_notes.extend(self.rollback_pairs(&completed_pairs).await);
                record.status = DeployStatus::RolledBack;
                record.error = "cancelled during grace period".to_string();
                aborted = true;
                break;
            }

            // Step 4: retire the old pod. Failure is fine, it may already
            // be stopped.
            events.emit(phase_event(
                &old_pod.id,
                PodPhase::TerminateOld,
                &new_pod.id,
            ));
            if let Err(e) = self.fleet.terminate_pod(&old_pod.id).await {
                debug!(pod = %old_pod.id, error = %e, "old pod termination failed, continuing");
            }

            events.emit(phase_event(&old_pod.id, PodPhase::Completed, &new_pod.id));
            completed_pairs.push((old_pod.clone(), new_pod));
            events.emit(DeployEvent::Progress {
                completed: completed_pairs.len() as u32,
                total: targets.len() as u32,
            });
        }

        if !aborted {
            record.status = DeployStatus::Completed;
            record.pod_ids = completed_pairs.iter().map(|(_, new)| new.id.clone()).collect();
        }
        if !rollback_notes.is_empty() {
            record.notes = rollback_notes.join("; ");
        }
        record.duration_seconds = started.elapsed().as_secs_f64();

        info!(
            deploy_id = %record.deploy_id,
            status = ?record.status,
            pairs = completed_pairs.len(),
            "rolling deploy finished"
        );
        self.journal.append(&record);
        record
    }

    /// Poll the pod until it reports ready, the timeout lapses, or the
    /// deploy is cancelled. Transient fetch errors are retried.
    async fn wait_for_ready(
        &self,
        pod_id: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> bool {
        let mut elapsed = Duration::ZERO;
        while elapsed < timeout {
            if cancel.is_cancelled() {
                return false;
            }
            match self.fleet.get_pod(pod_id).await {
                Ok(pod) if pod.is_ready() => return true,
                Ok(_) => {}
                Err(e) => debug!(pod = %pod_id, error = %e, "health poll failed, retrying"),
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            elapsed += HEALTH_POLL_INTERVAL;
        }
        false
    }

    /// Terminate a pod, folding any failure into the rollback notes.
    async fn terminate_quietly(&self, pod_id: &str, notes: &mut Vec<String>) {
        if let Err(e) = self.fleet.terminate_pod(pod_id).await {
            warn!(pod = %pod_id, error = %e, "best-effort termination failed");
            notes.push(format!("terminate {pod_id}: {e}"));
        }
    }

    /// Undo completed pairs: terminate each replacement and resume each old
    /// pod at its original GPU count. Never fails; degraded steps come back
    /// as notes for the record.
    async fn rollback_pairs(&self, pairs: &[(Pod, Pod)]) -> Vec<String> {
        let mut notes = Vec::new();
        for (old_pod, new_pod) in pairs {
            info!(old = %old_pod.id, new = %new_pod.id, "rolling back pair");
            self.terminate_quietly(&new_pod.id, &mut notes).await;
            if let Err(e) = self.fleet.resume_pod(&old_pod.id, old_pod.gpu_count).await {
                warn!(pod = %old_pod.id, error = %e, "best-effort resume failed");
                notes.push(format!("resume {}: {e}", old_pod.id));
            }
        }
        notes
    }
}

/// Clone the old pod's image-independent attributes onto the new image.
fn replacement_spec(old_pod: &Pod, new_image: &str, deploy_id: &str) -> PodSpec {
    PodSpec {
        name: format!("{}-v2-{}", old_pod.name, deploy_id),
        image: new_image.to_string(),
        gpu_type_id: old_pod.gpu_type_id.clone(),
        gpu_count: old_pod.gpu_count,
        volume_gb: old_pod.volume_gb,
        disk_gb: old_pod.disk_gb,
        ports: if old_pod.ports.is_empty() {
            PodSpec::default().ports
        } else {
            old_pod.ports.clone()
        },
        mount_path: old_pod.mount_path.clone(),
        env: old_pod.env.clone(),
        ..PodSpec::default()
    }
}

fn phase_event(old_pod: &str, phase: PodPhase, new_pod: &str) -> DeployEvent {
    DeployEvent::StateChange {
        old_pod: old_pod.to_string(),
        phase,
        new_pod: new_pod.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use podgrid_fleet::{FleetClient, FleetError, MockFleet, PodRuntime};
    use podgrid_journal::Journal;

    fn target_pod(index: u32) -> Pod {
        Pod {
            id: format!("old-{index}"),
            name: format!("worker-{index}"),
            image: "repo/app:v1".to_string(),
            desired_status: "RUNNING".to_string(),
            gpu_type_id: "NVIDIA A40".to_string(),
            gpu_count: 2,
            volume_gb: 40,
            disk_gb: 20,
            mount_path: "/workspace".to_string(),
            ports: "8888/http".to_string(),
            env: vec!["MODE=prod".to_string()],
            runtime: Some(PodRuntime {
                uptime_seconds: 3600,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn engine_with(fleet: &Arc<MockFleet>, dir: &tempfile::TempDir) -> DeployEngine {
        let journal = Journal::new(dir.path().join("history.jsonl"));
        DeployEngine::new(Arc::clone(fleet) as Arc<dyn FleetClient>, journal)
    }

    fn quick_options() -> RollingOptions {
        RollingOptions {
            grace_period_minutes: 0,
            health_check_timeout_secs: 30,
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<DeployEvent>) -> Vec<DeployEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn phases_for(events: &[DeployEvent], pod: &str) -> Vec<PodPhase> {
        events
            .iter()
            .filter_map(|event| match event {
                DeployEvent::StateChange { old_pod, phase, .. } if old_pod == pod => Some(*phase),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn completes_all_pairs_in_order() {
        let fleet = Arc::new(MockFleet::new());
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);
        let (events, mut rx) = EventSink::channel();

        let targets = vec![target_pod(0), target_pod(1)];
        let record = engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                quick_options(),
                CancelToken::new(),
                &events,
            )
            .await;

        assert_eq!(record.status, DeployStatus::Completed);
        assert_eq!(record.pod_ids, vec!["mock-0", "mock-1"]);
        assert_eq!(record.old_image, "repo/app:v1");
        assert_eq!(record.new_image, "repo/app:v2");
        assert!(record.error.is_empty());
        assert!(record.notes.is_empty());

        // Both old pods were retired, in input order.
        let calls = fleet.calls();
        let old_terminations: Vec<&String> = calls
            .iter()
            .filter(|c| c.starts_with("terminate old-"))
            .collect();
        assert_eq!(old_terminations, vec!["terminate old-0", "terminate old-1"]);

        let collected = drain(&mut rx);
        for pod in ["old-0", "old-1"] {
            assert_eq!(
                phases_for(&collected, pod),
                vec![
                    PodPhase::CreateNew,
                    PodPhase::HealthCheck,
                    PodPhase::Draining,
                    PodPhase::TerminateOld,
                    PodPhase::Completed,
                ]
            );
        }

        let history = engine.journal().load(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, DeployStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_clones_image_independent_attributes() {
        let fleet = Arc::new(MockFleet::new());
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);

        let targets = vec![target_pod(0)];
        let record = engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                quick_options(),
                CancelToken::new(),
                &EventSink::none(),
            )
            .await;

        let replacement = fleet.get_pod("mock-0").await.unwrap();
        assert_eq!(replacement.name, format!("worker-0-v2-{}", record.deploy_id));
        assert_eq!(replacement.image, "repo/app:v2");
        assert_eq!(replacement.gpu_type_id, "NVIDIA A40");
        assert_eq!(replacement.gpu_count, 2);
        assert_eq!(replacement.volume_gb, 40);
        assert_eq!(replacement.disk_gb, 20);
        assert_eq!(replacement.mount_path, "/workspace");
        assert_eq!(replacement.ports, "8888/http");
        assert_eq!(replacement.env, vec!["MODE=prod"]);
    }

    #[tokio::test(start_paused = true)]
    async fn health_check_timeout_fails_without_touching_the_old_pod() {
        let fleet = Arc::new(MockFleet::new());
        fleet.never_healthy();
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);

        let targets = vec![target_pod(0)];
        let record = engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                quick_options(),
                CancelToken::new(),
                &EventSink::none(),
            )
            .await;

        assert_eq!(record.status, DeployStatus::Failed);
        assert!(record.error.contains("mock-0"));
        assert!(record.error.contains("failed health check"));
        assert!(record.pod_ids.is_empty());

        let calls = fleet.calls();
        // The unhealthy replacement was torn down; the old pod was never
        // terminated or resumed.
        assert!(calls.contains(&"terminate mock-0".to_string()));
        assert!(fleet.calls_for("old-0").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn create_failure_rolls_back_completed_pairs() {
        let fleet = Arc::new(MockFleet::new());
        fleet.fail_create_at(1, FleetError::Api("boom".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);
        let (events, mut rx) = EventSink::channel();

        let targets = vec![target_pod(0), target_pod(1)];
        let record = engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                quick_options(),
                CancelToken::new(),
                &events,
            )
            .await;

        assert_eq!(record.status, DeployStatus::Failed);
        assert!(record.error.contains("failed to create replacement for old-1"));
        assert!(record.pod_ids.is_empty());

        // Pair 0 was undone: its replacement terminated, its old pod resumed.
        let calls = fleet.calls();
        assert!(calls.contains(&"terminate mock-0".to_string()));
        assert!(calls.contains(&"resume old-0".to_string()));

        let collected = drain(&mut rx);
        assert_eq!(
            phases_for(&collected, "old-1"),
            vec![PodPhase::CreateNew, PodPhase::Failed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_grace_rolls_back_and_leaves_the_rest_untouched() {
        let fleet = Arc::new(MockFleet::new());
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);
        let (events, mut rx) = EventSink::channel();

        let cancel = CancelToken::new();
        let watcher_cancel = cancel.clone();
        // Cancel as soon as the second pod enters its drain window.
        let watcher = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let DeployEvent::StateChange {
                    old_pod,
                    phase: PodPhase::Draining,
                    ..
                } = &event
                    && old_pod == "old-1"
                {
                    watcher_cancel.cancel();
                }
            }
        });

        let targets = vec![target_pod(0), target_pod(1), target_pod(2)];
        let options = RollingOptions {
            grace_period_minutes: 1,
            health_check_timeout_secs: 30,
        };
        let record = engine
            .rolling_deploy(&targets, "repo/app:v2", options, cancel, &events)
            .await;
        watcher.abort();

        assert_eq!(record.status, DeployStatus::RolledBack);
        assert_eq!(record.error, "cancelled during grace period");
        assert!(record.pod_ids.is_empty());

        let calls = fleet.calls();
        // Pod 2's replacement was terminated...
        assert!(calls.contains(&"terminate mock-1".to_string()));
        // ...pod 1's pair was rolled back...
        assert!(calls.contains(&"terminate mock-0".to_string()));
        assert!(calls.contains(&"resume old-0".to_string()));
        // ...and pod 3 was never touched.
        assert!(fleet.calls_for("old-2").is_empty());
        // Pod 2's old pod survived: replaced mid-drain, never terminated.
        assert!(!calls.contains(&"terminate old-1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_start_touches_nothing() {
        let fleet = Arc::new(MockFleet::new());
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);

        let cancel = CancelToken::new();
        cancel.cancel();

        let targets = vec![target_pod(0), target_pod(1)];
        let record = engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                quick_options(),
                cancel,
                &EventSink::none(),
            )
            .await;

        assert_eq!(record.status, DeployStatus::RolledBack);
        assert_eq!(record.error, "cancelled by user");
        assert!(fleet.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_once_per_second_down_to_zero() {
        let fleet = Arc::new(MockFleet::new());
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);
        let (events, mut rx) = EventSink::channel();

        let targets = vec![target_pod(0)];
        let options = RollingOptions {
            grace_period_minutes: 1,
            health_check_timeout_secs: 30,
        };
        engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                options,
                CancelToken::new(),
                &events,
            )
            .await;

        let ticks: Vec<u64> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                DeployEvent::Countdown { remaining_secs } => Some(remaining_secs),
                _ => None,
            })
            .collect();

        let expected: Vec<u64> = (0..=60).rev().collect();
        assert_eq!(ticks, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn old_pod_termination_failure_is_ignored() {
        let fleet = Arc::new(MockFleet::new());
        fleet.fail_terminate("old-0", FleetError::Api("pod already stopped".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);

        let targets = vec![target_pod(0)];
        let record = engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                quick_options(),
                CancelToken::new(),
                &EventSink::none(),
            )
            .await;

        assert_eq!(record.status, DeployStatus::Completed);
        assert_eq!(record.pod_ids, vec!["mock-0"]);
        assert!(record.error.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_failures_degrade_to_notes() {
        let fleet = Arc::new(MockFleet::new());
        fleet.fail_create_at(1, FleetError::Api("boom".to_string()));
        fleet.fail_resume("old-0", FleetError::Timeout("30s elapsed".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);

        let targets = vec![target_pod(0), target_pod(1)];
        let record = engine
            .rolling_deploy(
                &targets,
                "repo/app:v2",
                quick_options(),
                CancelToken::new(),
                &EventSink::none(),
            )
            .await;

        // The primary failure wins the error field; the degraded rollback
        // step lands in the notes.
        assert_eq!(record.status, DeployStatus::Failed);
        assert!(record.error.contains("old-1"));
        assert!(record.notes.contains("resume old-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_targets_complete_vacuously() {
        let fleet = Arc::new(MockFleet::new());
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(&fleet, &dir);

        let record = engine
            .rolling_deploy(
                &[],
                "repo/app:v2",
                quick_options(),
                CancelToken::new(),
                &EventSink::none(),
            )
            .await;

        assert_eq!(record.status, DeployStatus::Completed);
        assert_eq!(record.pod_count, 0);
        assert!(record.pod_ids.is_empty());
        assert!(fleet.calls().is_empty());
        assert_eq!(engine.journal().load(10).len(), 1);
    }
}
