//! podgrid-journal — append-only deploy history.
//!
//! Every fleet-mutating operation produces one [`DeployRecord`], appended
//! to the journal as a single self-describing JSON line. The journal is
//! diagnostic, never load-bearing: appends swallow write failures, loads
//! skip malformed lines, and compaction only rewrites once the log has
//! doubled past its retention target.

pub mod journal;
pub mod record;

pub use journal::Journal;
pub use record::{DeployAction, DeployRecord, DeployStatus};
