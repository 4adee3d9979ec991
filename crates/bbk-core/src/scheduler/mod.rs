//! Backup orchestration.
//!
//! Walks the catalog as one stream (repositories → packages → files →
//! transfers), fanning each level out across the network pool and handing
//! every discovered file to the transfer pipeline. The first fatal error
//! aborts the whole run.

mod progress;
mod run;

pub use progress::{BackupEvent, EventSink, RunStats, RunSummary};
pub use run::{run_backup, BackupRequest};
