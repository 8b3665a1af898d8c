//! podgrid-fleet — the fleet provider contract.
//!
//! Domain types for leased GPU pods and the provider's GPU catalog, the
//! [`FleetClient`] trait the orchestration engine drives, and the
//! [`FleetError`] taxonomy surfaced at that boundary.
//!
//! The concrete wire client (GraphQL mutations, REST catalog calls) lives
//! outside this workspace; everything the engine needs from the provider is
//! expressed through `Arc<dyn FleetClient>`. Tests drive the engine with the
//! scriptable [`MockFleet`] behind the `mock` feature.

pub mod client;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod types;

pub use client::FleetClient;
pub use error::{FleetError, FleetResult};
#[cfg(feature = "mock")]
pub use mock::MockFleet;
pub use types::*;
