//! mediastem-common - Shared types for the mediastem service
//!
//! Holds the error taxonomy, service configuration, filename
//! sanitization, and API wire types used by the mediastem-api binary.

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

pub use error::{Error, Result};
