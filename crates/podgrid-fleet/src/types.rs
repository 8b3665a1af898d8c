//! Domain types shared across the fleet boundary.
//!
//! `Pod` and `GpuType` are read-mostly snapshots owned by the remote
//! provider: the engine fetches fresh copies per operation and never mutates
//! them locally. Every state change is a fleet round-trip.

use serde::{Deserialize, Serialize};

// ── Pod ────────────────────────────────────────────────────────────

/// A leased GPU compute instance as reported by the fleet provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Pod {
    pub id: String,
    pub name: String,
    /// Container image the pod is running.
    pub image: String,
    /// Provider-reported desired status ("RUNNING", "EXITED", ...).
    pub desired_status: String,
    pub cost_per_hr: f64,
    pub gpu_type_id: String,
    pub gpu_display_name: String,
    pub gpu_count: u32,
    /// Persistent volume size in GB.
    pub volume_gb: u32,
    /// Container disk size in GB.
    pub disk_gb: u32,
    pub mount_path: String,
    /// Port spec string, e.g. "8888/http,22/tcp".
    pub ports: String,
    /// Environment as KEY=VALUE pairs.
    pub env: Vec<String>,
    pub template_id: String,
    pub machine_id: String,
    /// Runtime snapshot; `None` until the pod has booted.
    pub runtime: Option<PodRuntime>,
}

impl Pod {
    /// Whether the pod is running and has reported uptime.
    pub fn is_ready(&self) -> bool {
        self.desired_status == "RUNNING"
            && self.runtime.as_ref().is_some_and(|r| r.uptime_seconds > 0)
    }

    /// Human-readable uptime: "3h 12m", "42m", or "--" before boot.
    pub fn uptime_display(&self) -> String {
        let secs = self.runtime.as_ref().map_or(0, |r| r.uptime_seconds);
        if secs == 0 {
            return "--".to_string();
        }
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }

    /// Mean GPU utilization across all GPUs, if the runtime reports any.
    pub fn avg_gpu_util(&self) -> Option<f64> {
        let gpus = &self.runtime.as_ref()?.gpus;
        if gpus.is_empty() {
            return None;
        }
        Some(gpus.iter().map(|g| g.gpu_util_percent).sum::<f64>() / gpus.len() as f64)
    }

    /// Mean GPU memory utilization across all GPUs.
    pub fn avg_mem_util(&self) -> Option<f64> {
        let gpus = &self.runtime.as_ref()?.gpus;
        if gpus.is_empty() {
            return None;
        }
        Some(gpus.iter().map(|g| g.memory_util_percent).sum::<f64>() / gpus.len() as f64)
    }
}

/// Runtime snapshot reported for a booted pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PodRuntime {
    pub uptime_seconds: u64,
    pub gpus: Vec<GpuMetrics>,
    pub ports: Vec<PortBinding>,
}

/// Utilization figures for one GPU.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct GpuMetrics {
    pub gpu_util_percent: f64,
    pub memory_util_percent: f64,
}

/// One exposed port mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PortBinding {
    pub ip: String,
    pub is_ip_public: bool,
    pub private_port: u16,
    pub public_port: u16,
    pub protocol: String,
}

// ── GPU catalog ────────────────────────────────────────────────────

/// Provider-reported stock level for a GPU type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// Sold out, or the provider reported nothing.
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// One entry in the provider's GPU catalog.
///
/// Read-only reference data; callers refresh the catalog before each
/// orchestration call rather than caching it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GpuType {
    pub id: String,
    pub display_name: String,
    pub memory_gb: u32,
    /// Hourly price on the community tier; 0.0 when not offered there.
    pub community_price: f64,
    /// Hourly price on the secure tier; 0.0 when not offered there.
    pub secure_price: f64,
    pub max_gpu_count: u32,
    pub stock_status: StockStatus,
    pub total_count: u32,
    pub rented_count: u32,
    pub secure_cloud: bool,
    pub community_cloud: bool,
}

impl GpuType {
    /// The cheaper of the two non-zero tier prices, 0.0 if neither is set.
    pub fn lowest_price(&self) -> f64 {
        match (self.community_price > 0.0, self.secure_price > 0.0) {
            (true, true) => self.community_price.min(self.secure_price),
            (true, false) => self.community_price,
            (false, true) => self.secure_price,
            (false, false) => 0.0,
        }
    }

    /// GPUs available to rent right now.
    pub fn available_count(&self) -> u32 {
        self.total_count.saturating_sub(self.rented_count)
    }

    /// Whether the provider reports any stock at all.
    pub fn is_available(&self) -> bool {
        self.stock_status != StockStatus::None
    }
}

/// Provider cloud tier selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudTier {
    /// Either tier; the provider picks the cheaper placement.
    #[default]
    All,
    Community,
    Secure,
}

// ── Pod creation ───────────────────────────────────────────────────

/// Parameters for leasing a single pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodSpec {
    pub name: String,
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

impl Default for PodSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            image: String::new(),
            gpu_type_id: String::new(),
            gpu_count: 1,
            cloud_tier: CloudTier::All,
            volume_gb: 20,
            disk_gb: 20,
            ports: "8888/http".to_string(),
            mount_path: "/workspace".to_string(),
            env: Vec::new(),
            template_id: None,
        }
    }
}
