pub mod capture;
pub mod common;
pub mod config;
pub mod pending;
pub mod prune;
pub mod sync;
pub mod watch;
