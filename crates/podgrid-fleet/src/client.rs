//! The `FleetClient` trait — the wire-client contract the engine drives.
//!
//! The concrete transport lives outside this workspace. The engine only
//! ever holds an `Arc<dyn FleetClient>`; the five calls below are
//! everything it needs from the provider.

use async_trait::async_trait;

use crate::error::FleetResult;
use crate::types::{Pod, PodSpec};

/// Async contract for the remote fleet provider.
#[async_trait]
pub trait FleetClient: Send + Sync {
    /// Lease a new pod. The provider may reject with a capacity-exhaustion
    /// message when the requested GPU type is sold out.
    async fn create_pod(&self, spec: &PodSpec) -> FleetResult<Pod>;

    /// Fetch the current state of a pod.
    async fn get_pod(&self, pod_id: &str) -> FleetResult<Pod>;

    /// Stop a pod, keeping its volume for a later resume.
    async fn stop_pod(&self, pod_id: &str) -> FleetResult<()>;

    /// Terminate a pod, releasing its resources.
    async fn terminate_pod(&self, pod_id: &str) -> FleetResult<()>;

    /// Resume a stopped pod at the given GPU count.
    async fn resume_pod(&self, pod_id: &str, gpu_count: u32) -> FleetResult<()>;
}
