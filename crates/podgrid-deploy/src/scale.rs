//! Bulk scale-up and scale-down coordinators.
//!
//! Scale-up creates pods one at a time so a sold-out GPU type stops the run
//! early instead of burning the remaining requests. Scale-down fans out one
//! task per pod; each stop or terminate succeeds or fails on its own.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use podgrid_fleet::{CloudTier, FleetClient, PodSpec};
use podgrid_journal::{DeployAction, DeployRecord, DeployStatus};

use crate::engine::DeployEngine;
use crate::event::{DeployEvent, EventSink};

/// Parameters for a bulk scale-up.
#[derive(Debug, Clone)]
pub struct ScaleUpRequest {
    /// Number of pods to create.
    pub count: u32,
    /// Pods are named `{name_prefix}-{deploy_id}-{index}`.
    pub name_prefix: String,
    pub image: String,
    pub gpu_type_id: String,
    pub gpu_count: u32,
    pub cloud_tier: CloudTier,
    pub volume_gb: u32,
    pub disk_gb: u32,
    pub ports: String,
    pub mount_path: String,
    /// Environment as KEY=VALUE pairs.
    pub env: Vec<String>,
    pub template_id: Option<String>,
}

impl ScaleUpRequest {
    /// Request with provider defaults for everything but the essentials.
    pub fn new(count: u32, name_prefix: &str, image: &str, gpu_type_id: &str) -> Self {
        let defaults = PodSpec::default();
        Self {
            count,
            name_prefix: name_prefix.to_string(),
            image: image.to_string(),
            gpu_type_id: gpu_type_id.to_string(),
            gpu_count: defaults.gpu_count,
            cloud_tier: defaults.cloud_tier,
            volume_gb: defaults.volume_gb,
            disk_gb: defaults.disk_gb,
            ports: defaults.ports,
            mount_path: defaults.mount_path,
            env: Vec::new(),
            template_id: None,
        }
    }

    fn pod_spec(&self, name: String) -> PodSpec {
        PodSpec {
            name,
            image: self.image.clone(),
            gpu_type_id: self.gpu_type_id.clone(),
            gpu_count: self.gpu_count,
            cloud_tier: self.cloud_tier,
            volume_gb: self.volume_gb,
            disk_gb: self.disk_gb,
            ports: self.ports.clone(),
            mount_path: self.mount_path.clone(),
            env: self.env.clone(),
            template_id: self.template_id.clone(),
        }
    }
}

/// What a scale-down does to each pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDownAction {
    /// Stop the pod, keeping its volume.
    Stop,
    /// Terminate the pod, releasing its resources.
    Terminate,
}

impl fmt::Display for ScaleDownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleDownAction::Stop => write!(f, "stop"),
            ScaleDownAction::Terminate => write!(f, "terminate"),
        }
    }
}

impl DeployEngine {
    /// Create `request.count` pods sequentially.
    ///
    /// A single failed creation is recorded and the loop continues, except
    /// when the provider reports capacity exhaustion, which stops the run
    /// immediately. The record finishes `failed` only when zero pods were
    /// created despite errors; partial success is still `completed`, with
    /// the per-pod errors semicolon-joined in the record's error field.
    /// `count == 0` is a no-op success. Journaled unconditionally.
    pub async fn scale_up(&self, request: &ScaleUpRequest, events: &EventSink) -> DeployRecord {
        let started = Instant::now();
        let mut record = DeployRecord::begin(DeployAction::ScaleUp);
        record.gpu_type = request.gpu_type_id.clone();
        record.pod_count = request.count;
        record.new_image = request.image.clone();

        info!(
            deploy_id = %record.deploy_id,
            count = request.count,
            gpu_type = %request.gpu_type_id,
            "scale-up started"
        );

        let mut created: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for i in 0..request.count {
            let name = format!("{}-{}-{}", request.name_prefix, record.deploy_id, i);
            match self.fleet.create_pod(&request.pod_spec(name)).await {
                Ok(pod) => {
                    created.push(pod.id);
                    events.emit(DeployEvent::Progress {
                        completed: created.len() as u32,
                        total: request.count,
                    });
                }
                Err(e) => {
                    errors.push(format!("pod {}: {e}", i + 1));
                    if e.is_capacity_exhausted() {
                        errors.push(format!(
                            "stopped after {}/{} - no GPUs available",
                            created.len(),
                            request.count
                        ));
                        warn!(
                            deploy_id = %record.deploy_id,
                            created = created.len(),
                            "scale-up stopped early, GPU type sold out"
                        );
                        break;
                    }
                }
            }
        }

        record.pod_count = created.len() as u32;
        record.pod_ids = created;
        record.duration_seconds = started.elapsed().as_secs_f64();
        record.error = errors.join("; ");
        record.status = if !errors.is_empty() && record.pod_ids.is_empty() {
            DeployStatus::Failed
        } else {
            DeployStatus::Completed
        };

        info!(
            deploy_id = %record.deploy_id,
            status = ?record.status,
            created = record.pod_count,
            "scale-up finished"
        );
        self.journal.append(&record);
        record
    }

    /// Stop or terminate the given pods concurrently.
    ///
    /// One task per pod; a failing task never cancels its siblings.
    /// Progress events fire in completion order, not submission order.
    /// The record finishes `failed` if any pod failed, with `pod_count`
    /// and `pod_ids` fixed to the requested set. An empty set is a no-op
    /// success. Journaled unconditionally.
    pub async fn scale_down(
        &self,
        pod_ids: &[String],
        action: ScaleDownAction,
        events: &EventSink,
    ) -> DeployRecord {
        let started = Instant::now();
        let mut record = DeployRecord::begin(DeployAction::ScaleDown);
        record.pod_count = pod_ids.len() as u32;
        record.pod_ids = pod_ids.to_vec();
        record.notes = format!("action={action}");

        info!(
            deploy_id = %record.deploy_id,
            pods = pod_ids.len(),
            %action,
            "scale-down started"
        );

        let total = pod_ids.len() as u32;
        let completed = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::with_capacity(pod_ids.len());
        for pod_id in pod_ids {
            let fleet = Arc::clone(&self.fleet);
            let events = events.clone();
            let completed = Arc::clone(&completed);
            let pod_id = pod_id.clone();
            handles.push(tokio::spawn(async move {
                let result = match action {
                    ScaleDownAction::Stop => fleet.stop_pod(&pod_id).await,
                    ScaleDownAction::Terminate => fleet.terminate_pod(&pod_id).await,
                };
                match result {
                    Ok(()) => {
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        events.emit(DeployEvent::Progress {
                            completed: done,
                            total,
                        });
                        None
                    }
                    Err(e) => Some(format!("{pod_id}: {e}")),
                }
            }));
        }

        let mut errors = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(error)) => errors.push(error),
                Ok(None) => {}
                Err(e) => errors.push(format!("task failed: {e}")),
            }
        }

        record.duration_seconds = started.elapsed().as_secs_f64();
        record.error = errors.join("; ");
        record.status = if errors.is_empty() {
            DeployStatus::Completed
        } else {
            DeployStatus::Failed
        };

        info!(
            deploy_id = %record.deploy_id,
            status = ?record.status,
            failed = errors.len(),
            "scale-down finished"
        );
        self.journal.append(&record);
        record
    }
}
