//! Core library for upstream selection at a caching edge.
//!
//! This crate maps request keys onto backend origins with consistent hashing:
//! - Upstream addresses and their parsing
//! - Hashing primitives
//! - Jump consistent hash (unweighted)
//! - Ketama continuum (weighted)
//! - The balancer contract tying both together
//! - Upstream group configuration and management

pub mod address;
pub mod balancer;
pub mod config;
pub mod error;
pub mod hash;
pub mod jump;
pub mod ketama;
pub mod upstream;

pub use address::UpstreamAddress;
pub use balancer::{Balance, Balancer, BalancerKind};
pub use config::{Config, UpstreamGroupConfig};
pub use error::{Error, Result};
pub use jump::JumpBalancer;
pub use ketama::{Continuum, ContinuumPoint, KetamaBalancer};
pub use upstream::UpstreamManager;
