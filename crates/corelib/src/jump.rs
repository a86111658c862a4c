//! Unweighted consistent hashing over an ordered address list.
//!
//! # Jump Consistent Hash
//!
//! Lamping & Veach's recurrence maps a 64-bit key onto `n` buckets using no
//! memory beyond the bucket count. Growing the pool from `n` to `n + 1` moves
//! roughly `1/(n + 1)` of the keys, and every key that moves lands in the new
//! bucket `n`.
//!
//! The bucket id is the position of an address in the configured list, so
//! callers must keep the order stable across reloads to keep disruption
//! minimal.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::address::UpstreamAddress;
use crate::error::{Error, Result};
use crate::hash::key_hash64;

const JUMP_MULTIPLIER: u64 = 2862933555777941757;

/// Map a pre-hashed key onto `buckets` buckets.
///
/// Returns `None` when there are no buckets.
///
/// # Performance
/// - **Time**: O(ln n)
/// - **Space**: O(1)
pub fn jump_hash(mut key: u64, buckets: usize) -> Option<usize> {
    if buckets == 0 {
        return None;
    }

    let buckets = buckets as i64;
    let mut b: i64 = -1;
    let mut j: i64 = 0;

    while j < buckets {
        b = j;
        key = key.wrapping_mul(JUMP_MULTIPLIER).wrapping_add(1);
        j = ((b + 1) as f64 * ((1_i64 << 31) as f64 / ((key >> 33) + 1) as f64)) as i64;
    }

    Some(b as usize)
}

/// Unweighted selector using the jump recurrence.
///
/// Weights on the configured addresses are ignored.
#[derive(Debug, Default)]
pub struct JumpBalancer {
    addresses: RwLock<Vec<Arc<UpstreamAddress>>>,
}

impl JumpBalancer {
    /// Create an empty balancer. `get` fails until `set` installs addresses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the address list wholesale.
    pub fn set(&self, addresses: Vec<UpstreamAddress>) {
        let addresses = addresses.into_iter().map(Arc::new).collect();
        *self.addresses.write() = addresses;
    }

    /// Route `key` to an address.
    pub fn get(&self, key: &str) -> Result<Arc<UpstreamAddress>> {
        let addresses = self.addresses.read();
        let bucket = jump_hash(key_hash64(key.as_bytes()), addresses.len())
            .ok_or(Error::NoUpstreams)?;
        Ok(Arc::clone(&addresses[bucket]))
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.addresses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.read().is_empty()
    }

    /// Snapshot of the addresses in bucket order.
    pub fn addresses(&self) -> Vec<Arc<UpstreamAddress>> {
        self.addresses.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<UpstreamAddress> {
        (0..n)
            .map(|i| UpstreamAddress::new(format!("cache{}", i), "80", 1))
            .collect()
    }

    #[test]
    fn test_jump_hash_zero_buckets() {
        assert_eq!(jump_hash(42, 0), None);
    }

    #[test]
    fn test_jump_hash_in_range() {
        for key in 0..1_000u64 {
            let bucket = jump_hash(key_hash64(&key.to_le_bytes()), 7).unwrap();
            assert!(bucket < 7);
        }
    }

    #[test]
    fn test_jump_hash_single_bucket() {
        for key in [0, 1, u64::MAX, 0xdead_beef] {
            assert_eq!(jump_hash(key, 1), Some(0));
        }
    }

    #[test]
    fn test_empty_balancer() {
        let lb = JumpBalancer::new();
        assert!(lb.is_empty());
        assert!(matches!(lb.get("/index.html"), Err(Error::NoUpstreams)));
    }

    #[test]
    fn test_set_replaces() {
        let lb = JumpBalancer::new();
        lb.set(pool(3));
        assert_eq!(lb.len(), 3);

        lb.set(pool(1));
        assert_eq!(lb.len(), 1);
        assert_eq!(lb.get("/a").unwrap().hostname(), "cache0");

        lb.set(Vec::new());
        assert!(matches!(lb.get("/a"), Err(Error::NoUpstreams)));
    }

    #[test]
    fn test_empty_key_routes() {
        let lb = JumpBalancer::new();
        lb.set(pool(4));
        let first = lb.get("").unwrap();
        assert_eq!(first, lb.get("").unwrap());
    }
}
