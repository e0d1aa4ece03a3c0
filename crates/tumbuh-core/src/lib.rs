//! Tumbuh Core - Domain models, errors, and configuration
//!
//! This crate contains the domain types shared by every Tumbuh crate: areas of
//! interest, tiles, variable bags, recommendations and aggregates, plus the
//! error taxonomy and the layered configuration.

pub mod config;
pub mod error;
pub mod models;

pub use error::{Result, TumbuhError};
