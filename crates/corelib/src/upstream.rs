//! Upstream group management.
//!
//! The manager owns one [`Balancer`] per configured group and is the only
//! place that reacts to configuration reloads. Balancers themselves stay
//! silent; reload outcomes are reported here.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, info};

use crate::address::UpstreamAddress;
use crate::balancer::{Balance, Balancer, BalancerKind};
use crate::jump::JumpBalancer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ketama::{Continuum, KetamaBalancer};

/// Routing state for one group, built before anything is installed.
enum Staged {
    Jump(Vec<UpstreamAddress>),
    Ketama(Continuum),
}

/// Named upstream groups and their balancers.
#[derive(Debug, Default)]
pub struct UpstreamManager {
    groups: DashMap<String, Balancer>,
}

impl UpstreamManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager with every group in `config` installed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let manager = Self::new();
        manager.reload(config)?;
        Ok(manager)
    }

    /// Apply a new configuration.
    ///
    /// The whole document is checked before any group is touched, so a
    /// rejected reload leaves the previous routing state in place. Groups
    /// keeping their balancer kind are updated through `set`; groups that
    /// changed kind are rebuilt; groups no longer configured are dropped.
    pub fn reload(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let mut staged = Vec::with_capacity(config.upstreams.len());
        for group in &config.upstreams {
            let state = match group.balancer {
                BalancerKind::Jump => Staged::Jump(group.servers.clone()),
                BalancerKind::Ketama => match Continuum::build(group.servers.clone()) {
                    Ok(continuum) => Staged::Ketama(continuum),
                    Err(e) => {
                        error!(group = %group.name, error = %e, "rejecting upstream reload");
                        return Err(e);
                    }
                },
            };
            staged.push((group, state));
        }

        let before = self.groups.len();
        self.groups.retain(|name, _| config.group(name).is_some());
        let removed = before - self.groups.len();

        for (group, state) in staged {
            let servers = match &state {
                Staged::Jump(addresses) => addresses.len(),
                Staged::Ketama(continuum) => continuum.addresses().len(),
            };
            let replaced = self.install(&group.name, state);
            debug!(
                group = %group.name,
                balancer = %group.balancer,
                servers,
                replaced,
                "upstream group installed"
            );
        }

        info!(
            groups = self.groups.len(),
            removed, "upstream configuration reloaded"
        );
        Ok(())
    }

    /// Install staged state for `name`, reusing the balancer when the kind
    /// matches. Returns `true` when a new balancer was created.
    fn install(&self, name: &str, state: Staged) -> bool {
        let state = match self.groups.get(name) {
            Some(existing) => match (existing.value(), state) {
                (Balancer::Jump(lb), Staged::Jump(addresses)) => {
                    lb.set(addresses);
                    return false;
                }
                (Balancer::Ketama(lb), Staged::Ketama(continuum)) => {
                    lb.install(continuum);
                    return false;
                }
                (_, state) => state,
            },
            None => state,
        };
        // The shard guard is released above; inserting under it would deadlock.
        self.insert_new(name, state);
        true
    }

    fn insert_new(&self, name: &str, state: Staged) {
        let balancer = match state {
            Staged::Jump(addresses) => {
                let lb = JumpBalancer::new();
                lb.set(addresses);
                Balancer::Jump(lb)
            }
            Staged::Ketama(continuum) => {
                let lb = KetamaBalancer::new();
                lb.install(continuum);
                Balancer::Ketama(lb)
            }
        };
        self.groups.insert(name.to_string(), balancer);
    }

    /// Route `key` within `group`.
    pub fn route(&self, group: &str, key: &str) -> Result<Arc<UpstreamAddress>> {
        let balancer = self
            .groups
            .get(group)
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        balancer.value().get(key)
    }

    /// Configured group names, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn kind(&self, group: &str) -> Option<BalancerKind> {
        self.groups.get(group).map(|b| b.kind())
    }

    /// Run `f` against the balancer serving `group`.
    pub fn with_balancer<R>(&self, group: &str, f: impl FnOnce(&Balancer) -> R) -> Result<R> {
        let balancer = self
            .groups
            .get(group)
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        Ok(f(balancer.value()))
    }
}
