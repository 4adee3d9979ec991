//! CLI command handlers.

mod backup;
mod checksum;

pub use backup::run_backup_command;
#[cfg(test)]
pub(crate) use backup::run_backup_reporting;
pub use checksum::run_checksum;
