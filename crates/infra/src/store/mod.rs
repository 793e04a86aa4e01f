//! Durable storage adapters.

pub mod mysql;

pub use mysql::MySqlStore;
