//! Balancer contract shared by every selection algorithm.
//!
//! Upstream code holds one [`Balancer`] per upstream group: `set` on
//! configuration reload, `get` on every request. The variant is chosen once
//! from configuration and never re-checked per call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::address::UpstreamAddress;
use crate::error::{Error, Result};
use crate::jump::JumpBalancer;
use crate::ketama::KetamaBalancer;

/// Route keys to upstream addresses.
///
/// Implementations are thread-safe: `get` may run from many threads while a
/// single writer calls `set`. Readers observe either the old or the new
/// address set, never a mix.
pub trait Balance: Send + Sync {
    /// Replace the routing state.
    fn set(&self, addresses: Vec<UpstreamAddress>) -> Result<()>;

    /// Route `key` to an address.
    fn get(&self, key: &str) -> Result<Arc<UpstreamAddress>>;
}

impl Balance for JumpBalancer {
    fn set(&self, addresses: Vec<UpstreamAddress>) -> Result<()> {
        JumpBalancer::set(self, addresses);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Arc<UpstreamAddress>> {
        JumpBalancer::get(self, key)
    }
}

impl Balance for KetamaBalancer {
    fn set(&self, addresses: Vec<UpstreamAddress>) -> Result<()> {
        KetamaBalancer::set(self, addresses)
    }

    fn get(&self, key: &str) -> Result<Arc<UpstreamAddress>> {
        KetamaBalancer::get(self, key)
    }
}

/// Selection algorithm for an upstream group.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalancerKind {
    /// Unweighted jump consistent hash.
    Jump,
    /// Weighted Ketama continuum.
    #[default]
    Ketama,
}

impl fmt::Display for BalancerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalancerKind::Jump => write!(f, "jump"),
            BalancerKind::Ketama => write!(f, "ketama"),
        }
    }
}

impl FromStr for BalancerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jump" => Ok(BalancerKind::Jump),
            "ketama" => Ok(BalancerKind::Ketama),
            other => Err(Error::Config(format!("unknown balancer kind: {}", other))),
        }
    }
}

/// A balancer of either kind.
#[derive(Debug)]
pub enum Balancer {
    Jump(JumpBalancer),
    Ketama(KetamaBalancer),
}

impl Balancer {
    /// Create an empty balancer of the given kind.
    pub fn new(kind: BalancerKind) -> Self {
        match kind {
            BalancerKind::Jump => Balancer::Jump(JumpBalancer::new()),
            BalancerKind::Ketama => Balancer::Ketama(KetamaBalancer::new()),
        }
    }

    /// Create a balancer and install `addresses`.
    pub fn with_addresses(kind: BalancerKind, addresses: Vec<UpstreamAddress>) -> Result<Self> {
        let balancer = Self::new(kind);
        balancer.set(addresses)?;
        Ok(balancer)
    }

    pub fn kind(&self) -> BalancerKind {
        match self {
            Balancer::Jump(_) => BalancerKind::Jump,
            Balancer::Ketama(_) => BalancerKind::Ketama,
        }
    }
}

impl Balance for Balancer {
    fn set(&self, addresses: Vec<UpstreamAddress>) -> Result<()> {
        match self {
            Balancer::Jump(lb) => Balance::set(lb, addresses),
            Balancer::Ketama(lb) => Balance::set(lb, addresses),
        }
    }

    fn get(&self, key: &str) -> Result<Arc<UpstreamAddress>> {
        match self {
            Balancer::Jump(lb) => lb.get(key),
            Balancer::Ketama(lb) => lb.get(key),
        }
    }
}
