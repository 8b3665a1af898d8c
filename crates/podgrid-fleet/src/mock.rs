//! Scriptable in-memory fleet client for tests.
//!
//! Behavior is configured up front: create failures by call index, how many
//! polls a fresh pod needs before it reports uptime, and per-pod failures
//! for stop/terminate/resume. Every call is appended to an ordered log so
//! tests can assert exactly which fleet mutations an operation issued.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::FleetClient;
use crate::error::{FleetError, FleetResult};
use crate::types::{Pod, PodRuntime, PodSpec};

#[derive(Default)]
struct MockState {
    /// Pods known to the provider, by id.
    pods: HashMap<String, Pod>,
    /// Create calls seen so far, failed ones included.
    create_calls: u32,
    /// Create failures scripted by zero-based call index.
    create_failures: HashMap<u32, FleetError>,
    /// get_pod polls seen per pod id.
    polls: HashMap<String, u32>,
    /// Polls a created pod needs before it reports uptime. `u32::MAX` = never.
    healthy_after_polls: u32,
    fail_stop: HashMap<String, FleetError>,
    fail_terminate: HashMap<String, FleetError>,
    fail_resume: HashMap<String, FleetError>,
    /// Ordered log of every call, e.g. "create worker-0", "terminate mock-1".
    calls: Vec<String>,
}

/// Scriptable [`FleetClient`] double.
///
/// Created pods are named by the caller and assigned ids `mock-0`,
/// `mock-1`, ... in creation order.
#[derive(Default)]
pub struct MockFleet {
    state: Mutex<MockState>,
}

impl MockFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the nth create call (zero-based) to fail.
    pub fn fail_create_at(&self, index: u32, error: FleetError) {
        self.state
            .lock()
            .unwrap()
            .create_failures
            .insert(index, error);
    }

    /// Require `polls` get_pod calls before a pod reports uptime.
    pub fn healthy_after_polls(&self, polls: u32) {
        self.state.lock().unwrap().healthy_after_polls = polls;
    }

    /// Script pods to never become ready.
    pub fn never_healthy(&self) {
        self.healthy_after_polls(u32::MAX);
    }

    pub fn fail_stop(&self, pod_id: &str, error: FleetError) {
        self.state
            .lock()
            .unwrap()
            .fail_stop
            .insert(pod_id.to_string(), error);
    }

    pub fn fail_terminate(&self, pod_id: &str, error: FleetError) {
        self.state
            .lock()
            .unwrap()
            .fail_terminate
            .insert(pod_id.to_string(), error);
    }

    pub fn fail_resume(&self, pod_id: &str, error: FleetError) {
        self.state
            .lock()
            .unwrap()
            .fail_resume
            .insert(pod_id.to_string(), error);
    }

    /// Seed a pre-existing pod (e.g. a rolling-deploy target).
    pub fn insert_pod(&self, pod: Pod) {
        self.state.lock().unwrap().pods.insert(pod.id.clone(), pod);
    }

    /// Ordered log of every call issued against this client.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Log entries naming the given pod id or name.
    pub fn calls_for(&self, pod: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.ends_with(pod))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FleetClient for MockFleet {
    async fn create_pod(&self, spec: &PodSpec) -> FleetResult<Pod> {
        let mut state = self.state.lock().unwrap();
        let index = state.create_calls;
        state.create_calls += 1;
        state.calls.push(format!("create {}", spec.name));

        if let Some(error) = state.create_failures.get(&index) {
            return Err(error.clone());
        }

        let pod = Pod {
            id: format!("mock-{index}"),
            name: spec.name.clone(),
            image: spec.image.clone(),
            desired_status: "RUNNING".to_string(),
            gpu_type_id: spec.gpu_type_id.clone(),
            gpu_display_name: spec.gpu_type_id.clone(),
            gpu_count: spec.gpu_count,
            volume_gb: spec.volume_gb,
            disk_gb: spec.disk_gb,
            mount_path: spec.mount_path.clone(),
            ports: spec.ports.clone(),
            env: spec.env.clone(),
            template_id: spec.template_id.clone().unwrap_or_default(),
            ..Default::default()
        };
        state.pods.insert(pod.id.clone(), pod.clone());
        Ok(pod)
    }

    async fn get_pod(&self, pod_id: &str) -> FleetResult<Pod> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.calls.push(format!("get {pod_id}"));

        let seen = state.polls.entry(pod_id.to_string()).or_insert(0);
        *seen += 1;
        let ready = *seen > state.healthy_after_polls;

        let pod = state
            .pods
            .get_mut(pod_id)
            .ok_or_else(|| FleetError::NotFound(format!("pod {pod_id}")))?;
        if ready && pod.runtime.is_none() {
            pod.runtime = Some(PodRuntime {
                uptime_seconds: 30,
                ..Default::default()
            });
        }
        Ok(pod.clone())
    }

    async fn stop_pod(&self, pod_id: &str) -> FleetResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("stop {pod_id}"));
        if let Some(error) = state.fail_stop.get(pod_id) {
            return Err(error.clone());
        }
        if let Some(pod) = state.pods.get_mut(pod_id) {
            pod.desired_status = "EXITED".to_string();
        }
        Ok(())
    }

    async fn terminate_pod(&self, pod_id: &str) -> FleetResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("terminate {pod_id}"));
        if let Some(error) = state.fail_terminate.get(pod_id) {
            return Err(error.clone());
        }
        state.pods.remove(pod_id);
        Ok(())
    }

    async fn resume_pod(&self, pod_id: &str, _gpu_count: u32) -> FleetResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("resume {pod_id}"));
        if let Some(error) = state.fail_resume.get(pod_id) {
            return Err(error.clone());
        }
        if let Some(pod) = state.pods.get_mut(pod_id) {
            pod.desired_status = "RUNNING".to_string();
        }
        Ok(())
    }
}
