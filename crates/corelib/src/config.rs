//! Upstream group configuration.
//!
//! ```json
//! {
//!   "upstreams": [
//!     {
//!       "name": "video",
//!       "balancer": "ketama",
//!       "servers": [
//!         { "hostname": "cache1", "weight": 2 },
//!         { "hostname": "cache2", "port": "8080" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::UpstreamAddress;
use crate::balancer::BalancerKind;
use crate::error::{Error, Result};

/// One named pool of origins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamGroupConfig {
    pub name: String,
    #[serde(default)]
    pub balancer: BalancerKind,
    #[serde(default)]
    pub servers: Vec<UpstreamAddress>,
}

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstreams: Vec<UpstreamGroupConfig>,
}

impl Config {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Structural checks. Weights are left to the balancers.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for group in &self.upstreams {
            if group.name.trim().is_empty() {
                return Err(Error::Config("upstream group with empty name".into()));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate upstream group: {}",
                    group.name
                )));
            }
            if let Some(server) = group.servers.iter().find(|s| s.hostname().is_empty()) {
                return Err(Error::Config(format!(
                    "group {}: server with empty hostname ({})",
                    group.name, server
                )));
            }
        }
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<&UpstreamGroupConfig> {
        self.upstreams.iter().find(|g| g.name == name)
    }
}
