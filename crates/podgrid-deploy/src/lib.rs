//! podgrid-deploy — the deployment orchestration engine.
//!
//! Coordinates fleet-mutating operations against a remote GPU pod provider:
//! cost estimation, bulk scale-up/scale-down, and rolling image deploys
//! with health verification, a drain window, and rollback. Every operation
//! produces exactly one journaled [`DeployRecord`](podgrid_journal::DeployRecord)
//! describing its outcome; failures surface through the record's status and
//! error fields, never through `Err` returns.
//!
//! # Components
//!
//! - **`estimator`** — pure hourly/period cost math over the GPU catalog
//! - **`engine`** — [`DeployEngine`], the entry point holding the fleet
//!   client and journal
//! - **`scale`** — sequential scale-up and fan-out scale-down coordinators
//! - **`rolling`** — the per-pod rolling-deploy state machine
//! - **`cancel`** — cooperative [`CancelToken`] for rolling deploys
//! - **`event`** — typed [`DeployEvent`] stream for progress reporting

pub mod cancel;
pub mod engine;
pub mod estimator;
pub mod event;
pub mod rolling;
pub mod scale;

pub use cancel::CancelToken;
pub use engine::DeployEngine;
pub use estimator::{CostEstimate, estimate_cost};
pub use event::{DeployEvent, EventSink, PodPhase};
pub use rolling::RollingOptions;
pub use scale::{ScaleDownAction, ScaleUpRequest};
