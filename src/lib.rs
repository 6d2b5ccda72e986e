//! Dashboard Settings Library
//!
//! Layered configuration loading and validation plus cross-platform path
//! resolution for the reporting dashboard.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod paths;
pub mod platform;
