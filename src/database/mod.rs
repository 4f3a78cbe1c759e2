//! SQLite storage: connection management and one model module per table.

pub mod connection;
pub mod models;
