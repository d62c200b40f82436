//! Database layer for Fieldwatch

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use migrations::CURRENT_VERSION;
pub use repository::LibSqlPendingWriteRepository;
