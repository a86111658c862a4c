//! Weighted consistent hashing on a Ketama continuum.
//!
//! # Continuum Construction
//!
//! Every address owns a share of `POINTS_PER_SERVER * address_count` virtual
//! points proportional to its weight. Points are minted four at a time: the
//! label `"<host>[:port]-<i>"` is digested and each 4-byte alignment of the
//! digest becomes one point. The per-address budget is therefore rounded up
//! to a multiple of four, and the ring stops growing once it holds the full
//! `max_points` budget, so addresses late in configured order can lose a few
//! points when rounding overshoots.
//!
//! Label format, byte assembly and the capping order all decide which key
//! maps to which backend. Changing any of them reshuffles an existing
//! deployment.
//!
//! # Lookup
//!
//! A key's position is found with [`key_point`]; the owner is the first
//! point at or above it, wrapping to the lowest point past the end of the
//! ring.
//!
//! # Performance Characteristics
//!
//! - **Build**: O(p log p) where p = ring points (sort dominates)
//! - **Lookup**: O(log p)
//! - **Memory**: one `Arc` and one `u32` per point

use std::sync::Arc;

use parking_lot::RwLock;

use crate::address::UpstreamAddress;
use crate::error::{Error, Result};
use crate::hash::{content_digest, digest_point, key_point, POINTS_PER_HASH};

/// Virtual points budgeted per address before weighting.
pub const POINTS_PER_SERVER: usize = 160;

/// A single point on the continuum, bound to the address that owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuumPoint {
    pub address: Arc<UpstreamAddress>,
    pub point: u32,
}

/// Build a sorted continuum for `addresses`.
///
/// An empty address list yields an empty ring. A non-empty list whose weights
/// sum to zero is rejected.
pub fn build_continuum(addresses: &[UpstreamAddress]) -> Result<Vec<ContinuumPoint>> {
    let owners: Vec<Arc<UpstreamAddress>> = addresses.iter().cloned().map(Arc::new).collect();
    build_ring(&owners)
}

fn build_ring(owners: &[Arc<UpstreamAddress>]) -> Result<Vec<ContinuumPoint>> {
    if owners.is_empty() {
        return Ok(Vec::new());
    }

    let total_weight: u64 = owners.iter().map(|a| u64::from(a.weight())).sum();
    if total_weight == 0 {
        return Err(Error::InvalidWeightConfiguration);
    }

    let max_points = owners.len() * POINTS_PER_SERVER;
    let mut ring = Vec::with_capacity(max_points);

    'addresses: for owner in owners {
        let budget = u64::from(owner.weight()) * max_points as u64 / total_weight;
        let hashes = (budget as usize).div_ceil(POINTS_PER_HASH);
        let label = owner.host_label();

        for i in 0..hashes {
            let digest = content_digest(format!("{}-{}", label, i).as_bytes());
            for alignment in 0..POINTS_PER_HASH {
                if ring.len() >= max_points {
                    break 'addresses;
                }
                ring.push(ContinuumPoint {
                    address: Arc::clone(owner),
                    point: digest_point(&digest, alignment),
                });
            }
        }
    }

    // Stable, so equal points keep configured order.
    ring.sort_by_key(|p| p.point);
    Ok(ring)
}

/// Index of the left-most point `>= target`, wrapping to 0 past the end.
///
/// Returns `None` for an empty ring.
pub fn search(ring: &[ContinuumPoint], target: u32) -> Option<usize> {
    if ring.is_empty() {
        return None;
    }
    let idx = ring.partition_point(|p| p.point < target);
    Some(if idx == ring.len() { 0 } else { idx })
}

/// A built ring together with the addresses it was built from.
///
/// Every point's `address` is one of `addresses`, shared by pointer.
#[derive(Clone, Debug, Default)]
pub struct Continuum {
    addresses: Vec<Arc<UpstreamAddress>>,
    points: Vec<ContinuumPoint>,
}

impl Continuum {
    pub fn build(addresses: Vec<UpstreamAddress>) -> Result<Self> {
        let addresses: Vec<Arc<UpstreamAddress>> = addresses.into_iter().map(Arc::new).collect();
        let points = build_ring(&addresses)?;
        Ok(Self { addresses, points })
    }

    /// Addresses in configured order.
    pub fn addresses(&self) -> &[Arc<UpstreamAddress>] {
        &self.addresses
    }

    /// Ring points, sorted.
    pub fn points(&self) -> &[ContinuumPoint] {
        &self.points
    }
}

/// Weighted selector over a Ketama continuum.
#[derive(Debug, Default)]
pub struct KetamaBalancer {
    state: RwLock<Continuum>,
}

impl KetamaBalancer {
    /// Create an empty balancer. `get` fails until `set` installs addresses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the continuum from `addresses`.
    ///
    /// The new ring is built before the write lock is taken; on error the
    /// previous ring stays in place.
    pub fn set(&self, addresses: Vec<UpstreamAddress>) -> Result<()> {
        let continuum = Continuum::build(addresses)?;
        self.install(continuum);
        Ok(())
    }

    /// Swap in a continuum built ahead of time.
    pub fn install(&self, continuum: Continuum) {
        *self.state.write() = continuum;
    }

    /// Route `key` to an address.
    pub fn get(&self, key: &str) -> Result<Arc<UpstreamAddress>> {
        let state = self.state.read();
        let idx = search(&state.points, key_point(key)).ok_or(Error::NoUpstreams)?;
        Ok(Arc::clone(&state.points[idx].address))
    }

    /// Number of points on the ring.
    pub fn len(&self) -> usize {
        self.state.read().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().points.is_empty()
    }

    /// Snapshot of the continuum, sorted by point.
    pub fn continuum(&self) -> Vec<ContinuumPoint> {
        self.state.read().points.clone()
    }

    /// Virtual point count per address, in configured order.
    ///
    /// Addresses that received no points are listed with a count of zero.
    pub fn point_counts(&self) -> Vec<(Arc<UpstreamAddress>, usize)> {
        let state = self.state.read();
        state
            .addresses
            .iter()
            .map(|addr| {
                let n = state
                    .points
                    .iter()
                    .filter(|p| Arc::ptr_eq(&p.address, addr))
                    .count();
                (Arc::clone(addr), n)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(host: &str, weight: u32) -> UpstreamAddress {
        UpstreamAddress::new(host, "80", weight)
    }

    fn count_for(ring: &[ContinuumPoint], host: &str) -> usize {
        ring.iter().filter(|p| p.address.hostname() == host).count()
    }

    #[test]
    fn test_empty_ring() {
        let lb = KetamaBalancer::new();
        assert!(lb.is_empty());
        assert!(matches!(lb.get("/a"), Err(Error::NoUpstreams)));
        assert_eq!(search(&[], 7), None);
    }

    #[test]
    fn test_zero_total_weight_rejected() {
        let lb = KetamaBalancer::new();
        let err = lb.set(vec![addr("a", 0), addr("b", 0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidWeightConfiguration));
        assert!(lb.is_empty());
    }

    #[test]
    fn test_failed_set_keeps_previous_ring() {
        let lb = KetamaBalancer::new();
        lb.set(vec![addr("a", 1)]).unwrap();
        assert!(lb.set(vec![addr("b", 0)]).is_err());
        assert_eq!(lb.get("/x").unwrap().hostname(), "a");
    }

    #[test]
    fn test_equal_weights_fill_budget() {
        let ring = build_continuum(&[addr("a", 1), addr("b", 1), addr("c", 1)]).unwrap();
        assert_eq!(ring.len(), 3 * POINTS_PER_SERVER);
        for host in ["a", "b", "c"] {
            assert_eq!(count_for(&ring, host), POINTS_PER_SERVER);
        }
    }

    #[test]
    fn test_rounding_is_capped() {
        // 320 * 1/3 = 106 -> 108, 320 * 2/3 = 213 -> 216; the last 4 are dropped.
        let ring = build_continuum(&[addr("a", 1), addr("b", 2)]).unwrap();
        assert_eq!(ring.len(), 320);
        assert_eq!(count_for(&ring, "a"), 108);
        assert_eq!(count_for(&ring, "b"), 212);
    }

    #[test]
    fn test_cap_hits_last_address() {
        let ring = build_continuum(&[addr("a", 1), addr("b", 1), addr("c", 1), addr("d", 4)])
            .unwrap();
        assert_eq!(ring.len(), 640);
        assert_eq!(count_for(&ring, "a"), 92);
        assert_eq!(count_for(&ring, "d"), 364);
    }

    #[test]
    fn test_zero_weight_address_gets_no_points() {
        let ring = build_continuum(&[addr("a", 0), addr("b", 1)]).unwrap();
        assert_eq!(count_for(&ring, "a"), 0);
        assert_eq!(count_for(&ring, "b"), 320);
    }

    #[test]
    fn test_ring_sorted() {
        let ring = build_continuum(&[addr("a", 3), addr("b", 1), addr("c", 7)]).unwrap();
        assert!(ring.windows(2).all(|w| w[0].point <= w[1].point));
    }

    #[test]
    fn test_search_wraps() {
        let owner = Arc::new(addr("a", 1));
        let ring: Vec<ContinuumPoint> = [10, 20, 30]
            .into_iter()
            .map(|point| ContinuumPoint {
                address: Arc::clone(&owner),
                point,
            })
            .collect();
        assert_eq!(search(&ring, 0), Some(0));
        assert_eq!(search(&ring, 10), Some(0));
        assert_eq!(search(&ring, 11), Some(1));
        assert_eq!(search(&ring, 30), Some(2));
        assert_eq!(search(&ring, 31), Some(0));
        assert_eq!(search(&ring, u32::MAX), Some(0));
    }

    fn hosts_and_counts(lb: &KetamaBalancer) -> Vec<(String, usize)> {
        lb.point_counts()
            .into_iter()
            .map(|(a, n)| (a.hostname().to_string(), n))
            .collect()
    }

    #[test]
    fn test_point_counts() {
        let lb = KetamaBalancer::new();
        lb.set(vec![addr("a", 1), addr("b", 2)]).unwrap();
        assert_eq!(
            hosts_and_counts(&lb),
            vec![("a".to_string(), 108), ("b".to_string(), 212)]
        );
    }

    #[test]
    fn test_point_counts_follow_configured_order() {
        let lb = KetamaBalancer::new();
        lb.set(vec![addr("a", 1), addr("b", 1), addr("c", 1)]).unwrap();
        let hosts: Vec<String> = hosts_and_counts(&lb).into_iter().map(|(h, _)| h).collect();
        assert_eq!(hosts, vec!["a", "b", "c"]);

        lb.set(vec![addr("c", 1), addr("z", 0), addr("a", 1)]).unwrap();
        assert_eq!(
            hosts_and_counts(&lb),
            vec![
                ("c".to_string(), 240),
                ("z".to_string(), 0),
                ("a".to_string(), 240)
            ]
        );
    }

    #[test]
    fn test_install_prebuilt_continuum() {
        let continuum = Continuum::build(vec![addr("a", 1), addr("b", 1)]).unwrap();
        assert_eq!(continuum.addresses().len(), 2);
        assert_eq!(continuum.points().len(), 2 * POINTS_PER_SERVER);

        let lb = KetamaBalancer::new();
        lb.install(continuum.clone());
        assert_eq!(lb.continuum(), continuum.points());
    }
}
