//! Typed progress events emitted by the deploy engine.
//!
//! The engine reports sub-state transitions over a channel instead of
//! inline callbacks: callers consume (or drop) a receiver, tests assert
//! against the collected sequence, and a slow consumer can never block an
//! operation mid-flight.

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Per-pod sub-state of a rolling deploy, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PodPhase {
    CreateNew,
    HealthCheck,
    Draining,
    RollingBack,
    TerminateOld,
    Completed,
    Failed,
}

/// Events emitted while an orchestration operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeployEvent {
    /// A rolling-deploy target moved to a new phase. `new_pod` is empty
    /// until a replacement exists.
    StateChange {
        old_pod: String,
        phase: PodPhase,
        new_pod: String,
    },
    /// Units completed so far out of the requested total.
    Progress { completed: u32, total: u32 },
    /// Seconds left in the current drain window.
    Countdown { remaining_secs: u64 },
}

/// Cloneable, non-blocking sink for deploy events.
///
/// [`EventSink::none`] discards everything; [`EventSink::channel`] returns
/// a sink/receiver pair. Send failures (dropped receiver) are ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<DeployEvent>>,
}

impl EventSink {
    /// A sink that discards all events.
    pub fn none() -> Self {
        Self { tx: None }
    }

    /// A sink/receiver pair backed by an unbounded channel.
    pub fn channel() -> (Self, UnboundedReceiver<DeployEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Emit one event. A missing or closed receiver is a no-op.
    pub fn emit(&self, event: DeployEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
