//! Hourly cost estimation for pod fleets.

use serde::Serialize;

use podgrid_fleet::{CloudTier, GpuType};

/// Cost breakdown for a proposed fleet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    /// Hourly cost of a single pod.
    pub per_pod_hourly: f64,
    /// Hourly cost across all pods.
    pub total_hourly: f64,
    /// Cost across all pods for the requested period.
    pub total_for_period: f64,
}

/// Estimate the cost of running `pod_count` pods with `gpu_count` GPUs each.
///
/// Tier selection: `Community` and `Secure` use that tier's price; `All`
/// uses the cheaper of the two non-zero prices. A GPU type with no price
/// yields a zero estimate. Pure and infallible.
pub fn estimate_cost(
    gpu_type: &GpuType,
    gpu_count: u32,
    pod_count: u32,
    tier: CloudTier,
    hours: f64,
) -> CostEstimate {
    let price = match tier {
        CloudTier::Community => gpu_type.community_price,
        CloudTier::Secure => gpu_type.secure_price,
        CloudTier::All => gpu_type.lowest_price(),
    };
    let per_pod_hourly = price * f64::from(gpu_count);
    let total_hourly = per_pod_hourly * f64::from(pod_count);
    CostEstimate {
        per_pod_hourly,
        total_hourly,
        total_for_period: total_hourly * hours,
    }
}
