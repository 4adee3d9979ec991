pub mod config;
pub mod logging;

pub mod catalog;
pub mod checksum;
pub mod control;
pub mod pool;
pub mod retry;
pub mod scheduler;
pub mod transfer;
