//! Command-line configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corelib::{Config, UpstreamManager};

use crate::commands::Command;
use crate::logging::init_logging;

/// Route request keys across upstream origins with consistent hashing.
#[derive(Debug, Parser)]
#[command(name = "edge-balancer", version, about)]
pub struct CliConfig {
    /// Upstream configuration file (JSON).
    #[arg(short, long, global = true, default_value = "upstreams.json")]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn run(self) -> anyhow::Result<()> {
        init_logging(&self.log_level)?;

        let config = Config::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        let manager = UpstreamManager::from_config(&config)
            .with_context(|| format!("building upstreams from {}", self.config.display()))?;
        tracing::info!(groups = manager.groups().len(), "upstreams ready");

        let result = self.command.execute(&manager)?;
        print!("{}", result);
        Ok(())
    }
}
