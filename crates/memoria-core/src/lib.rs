//! Memoria Core
//!
//! Domain models, error taxonomy, and configuration shared by the
//! storage, persistence, synchronization, and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

pub use config::Config;
pub use error::{AppError, LogLevel};
