//! Deploy audit records.
//!
//! One `DeployRecord` is created per orchestration operation, finalized
//! exactly once when the operation concludes, and appended to the journal.
//! Records are immutable after journaling.

use serde::{Deserialize, Serialize};

/// Kind of fleet-mutating operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployAction {
    ScaleUp,
    ScaleDown,
    RollingDeploy,
}

/// States of an orchestration operation.
///
/// Used both as a record's terminal value and, for rolling deploys, as the
/// displayed per-pod sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    #[default]
    Pending,
    InProgress,
    HealthCheck,
    Draining,
    RollingBack,
    Completed,
    Failed,
    RolledBack,
}

impl DeployStatus {
    /// Whether this status is terminal for a record.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeployStatus::Completed | DeployStatus::Failed | DeployStatus::RolledBack
        )
    }
}

/// One audit entry describing an orchestration operation's inputs, outcome,
/// and timing. Serialized as a single self-contained JSON line; fields
/// absent from older lines deserialize to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployRecord {
    /// Generated 8-character operation id.
    pub deploy_id: String,
    /// ISO-8601 UTC timestamp of operation start.
    pub timestamp: String,
    pub action: DeployAction,
    pub status: DeployStatus,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub gpu_type: String,
    #[serde(default)]
    pub pod_count: u32,
    #[serde(default)]
    pub pod_ids: Vec<String>,
    #[serde(default)]
    pub old_image: String,
    #[serde(default)]
    pub new_image: String,
    #[serde(default)]
    pub region: String,
    /// Aggregated error text; empty when the operation fully succeeded.
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub notes: String,
}

impl DeployRecord {
    /// Open a record for a new operation: generated short id, UTC start
    /// stamp, status `in_progress`.
    pub fn begin(action: DeployAction) -> Self {
        Self {
            deploy_id: short_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            action,
            status: DeployStatus::InProgress,
            template_name: String::new(),
            gpu_type: String::new(),
            pod_count: 0,
            pod_ids: Vec::new(),
            old_image: String::new(),
            new_image: String::new(),
            region: String::new(),
            error: String::new(),
            duration_seconds: 0.0,
            notes: String::new(),
        }
    }
}

/// 8-character deploy id (hex-truncated v4 uuid).
fn short_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
