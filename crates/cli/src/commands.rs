//! CLI subcommands.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Context;
use clap::Subcommand;
use corelib::{Balancer, UpstreamManager};

/// Operations available from the command line.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the origin chosen for each key.
    Route {
        #[arg(short, long)]
        group: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Route synthetic keys and report how they spread.
    Distribution {
        #[arg(short, long)]
        group: String,
        #[arg(short, long, default_value_t = 10_000)]
        samples: usize,
        /// Keys are `<prefix><n>`.
        #[arg(short, long, default_value = "/")]
        prefix: String,
    },
    /// Show the ring (ketama) or bucket order (jump) of a group.
    Ring {
        #[arg(short, long)]
        group: String,
    },
    /// Validate the configuration and summarise every group.
    Check,
}

/// Rendered output of a command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub lines: Vec<String>,
}

impl CommandResult {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl Command {
    pub fn execute(&self, manager: &UpstreamManager) -> anyhow::Result<CommandResult> {
        let mut out = CommandResult::default();
        match self {
            Command::Route { group, keys } => {
                for key in keys {
                    let addr = manager
                        .route(group, key)
                        .with_context(|| format!("routing {:?} in group {}", key, group))?;
                    out.push(format!("{} -> {}", key, addr));
                }
            }
            Command::Distribution {
                group,
                samples,
                prefix,
            } => {
                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for i in 0..*samples {
                    let addr = manager.route(group, &format!("{}{}", prefix, i))?;
                    *counts.entry(addr.to_string()).or_insert(0) += 1;
                }
                out.push(format!("{} keys across {} upstreams", samples, counts.len()));
                for (addr, n) in counts {
                    out.push(format!(
                        "{:<32} {:>8} {:>6.2}%",
                        addr,
                        n,
                        percent(n, *samples)
                    ));
                }
            }
            Command::Ring { group } => {
                let lines = manager.with_balancer(group, describe)?;
                out.lines.extend(lines);
            }
            Command::Check => {
                let groups = manager.groups();
                out.push(format!("{} upstream groups OK", groups.len()));
                for name in groups {
                    let line = manager.with_balancer(&name, |b| match b {
                        Balancer::Jump(lb) => format!("{:<16} jump   {} servers", name, lb.len()),
                        Balancer::Ketama(lb) => {
                            format!("{:<16} ketama {} points", name, lb.len())
                        }
                    })?;
                    out.push(line);
                }
            }
        }
        Ok(out)
    }
}

fn percent(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 * 100.0 / total as f64
    }
}

fn describe(balancer: &Balancer) -> Vec<String> {
    match balancer {
        Balancer::Jump(lb) => {
            let addresses = lb.addresses();
            let mut lines = vec![format!("jump: {} buckets", addresses.len())];
            for (i, addr) in addresses.iter().enumerate() {
                lines.push(format!("  [{}] {}", i, addr));
            }
            lines
        }
        Balancer::Ketama(lb) => {
            let total = lb.len();
            let mut lines = vec![format!("ketama: {} points", total)];
            for (addr, points) in lb.point_counts() {
                lines.push(format!(
                    "  {:<32} weight {:>4} {:>5} points {:>6.2}%",
                    addr.to_string(),
                    addr.weight(),
                    points,
                    percent(points, total)
                ));
            }
            lines
        }
    }
}
