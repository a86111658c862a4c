//! CLI tool for inspecting upstream balancing.
//!
//! Provides commands for:
//! - Routing keys to origins
//! - Measuring key distribution
//! - Inspecting ring and bucket layout
//! - Validating configuration

pub mod commands;
pub mod config;
pub mod logging;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
