//! Upstream address abstractions.
//!
//! An `UpstreamAddress` describes one backend origin: where to dial it and how
//! much of the traffic it should receive. Addresses are plain values; two
//! addresses with identical fields are interchangeable for routing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Port assumed when none is configured.
pub const DEFAULT_PORT: &str = "80";

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

fn default_weight() -> u32 {
    1
}

/// One backend origin server.
///
/// Immutable once constructed. Balancers share addresses behind `Arc`, so
/// keep this struct small and cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpstreamAddress {
    hostname: String,
    /// Kept as a string so ring labels concatenate exactly as configured.
    #[serde(default = "default_port")]
    port: String,
    #[serde(default = "default_weight")]
    weight: u32,
}

impl UpstreamAddress {
    /// Construct a new address.
    pub fn new(hostname: impl Into<String>, port: impl Into<String>, weight: u32) -> Self {
        Self {
            hostname: hostname.into(),
            port: port.into(),
            weight,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Relative capacity of this backend.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Host label used to name ring points.
    ///
    /// The default port is elided: `"cache1"` for port 80, `"cache1:8080"`
    /// otherwise.
    pub fn host_label(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.hostname.clone()
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }
}

impl fmt::Display for UpstreamAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

impl FromStr for UpstreamAddress {
    type Err = Error;

    /// Parses `host[:port][@weight]`.
    fn from_str(s: &str) -> Result<Self> {
        let (endpoint, weight) = match s.rsplit_once('@') {
            Some((endpoint, weight)) => {
                let weight = weight
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| Error::InvalidAddress(format!("bad weight in {:?}", s)))?;
                (endpoint.trim(), weight)
            }
            None => (s.trim(), default_weight()),
        };

        let (hostname, port) = match endpoint.rsplit_once(':') {
            Some((host, port)) => (host, port.to_string()),
            None => (endpoint, default_port()),
        };

        if hostname.is_empty() {
            return Err(Error::InvalidAddress(format!("missing host in {:?}", s)));
        }
        if port.is_empty() {
            return Err(Error::InvalidAddress(format!("missing port in {:?}", s)));
        }

        Ok(Self::new(hostname, port, weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_label_elides_default_port() {
        let addr = UpstreamAddress::new("cache1", "80", 1);
        assert_eq!(addr.host_label(), "cache1");
        assert_eq!(addr.to_string(), "cache1:80");
    }

    #[test]
    fn test_host_label_keeps_other_ports() {
        let addr = UpstreamAddress::new("10.0.0.1", "8080", 3);
        assert_eq!(addr.host_label(), "10.0.0.1:8080");
        assert_eq!(addr.weight(), 3);
    }

    #[test]
    fn test_parse_full() {
        let addr: UpstreamAddress = "origin.example.com:8443@5".parse().unwrap();
        assert_eq!(addr, UpstreamAddress::new("origin.example.com", "8443", 5));
    }

    #[test]
    fn test_parse_defaults() {
        let addr: UpstreamAddress = "origin".parse().unwrap();
        assert_eq!(addr.port(), "80");
        assert_eq!(addr.weight(), 1);

        let addr: UpstreamAddress = "origin@2".parse().unwrap();
        assert_eq!(addr, UpstreamAddress::new("origin", "80", 2));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ":8080".parse::<UpstreamAddress>(),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            "host:".parse::<UpstreamAddress>(),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            "host:80@heavy".parse::<UpstreamAddress>(),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_deserialize_defaults() {
        let addr: UpstreamAddress = serde_json::from_str(r#"{"hostname":"cache2"}"#).unwrap();
        assert_eq!(addr, UpstreamAddress::new("cache2", "80", 1));
    }
}
