//! The deploy engine — entry point for all orchestration operations.

use std::sync::Arc;

use podgrid_fleet::FleetClient;
use podgrid_journal::Journal;

/// Orchestrates fleet-mutating operations against a [`FleetClient`] and
/// records every terminal outcome in the [`Journal`].
///
/// The engine holds no mutable state between calls: cancellation lives in
/// the [`CancelToken`](crate::CancelToken) passed to each rolling deploy,
/// so independent operations never share anything but the client and the
/// journal path. Run one rolling deploy per token at a time.
pub struct DeployEngine {
    pub(crate) fleet: Arc<dyn FleetClient>,
    pub(crate) journal: Journal,
}

impl DeployEngine {
    /// Engine over a fleet client, journaling to `journal`.
    pub fn new(fleet: Arc<dyn FleetClient>, journal: Journal) -> Self {
        Self { fleet, journal }
    }

    /// The journal this engine appends to.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}
