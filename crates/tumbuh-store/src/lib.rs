//! Tumbuh Store - Area persistence port and adapters
//!
//! This crate defines the `AreaStore` port and provides an in-memory adapter
//! for development and tests plus a PostgreSQL adapter for deployments.

pub mod memory;
pub mod ports;
pub mod postgres;

pub use memory::MemoryAreaStore;
pub use ports::AreaStore;
pub use postgres::{PostgresConfig, PostgresStore};
