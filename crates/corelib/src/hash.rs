//! Hashing primitives shared by the balancers.
//!
//! Two hash families are in play:
//! - XXH64 (seed 0) feeds the jump recurrence with a 64-bit key.
//! - MD5 names points on the Ketama ring; one 16-byte digest yields four
//!   32-bit points.

use xxhash_rust::xxh64::xxh64;

/// Number of ring points carved out of a single digest.
pub const POINTS_PER_HASH: usize = 4;

/// 64-bit non-cryptographic hash of a routing key.
#[inline]
pub fn key_hash64(key: &[u8]) -> u64 {
    xxh64(key, 0)
}

/// 16-byte content digest.
#[inline]
pub fn content_digest(data: &[u8]) -> [u8; 16] {
    md5::compute(data).0
}

/// Assemble a ring point from four bytes of `bytes` starting at `4 * alignment`.
///
/// The byte at the highest offset becomes the most significant byte.
///
/// # Panics
///
/// Panics if `bytes` is shorter than `4 * alignment + 4`.
#[inline]
pub fn digest_point(bytes: &[u8], alignment: usize) -> u32 {
    let base = alignment * 4;
    u32::from_be_bytes([
        bytes[base + 3],
        bytes[base + 2],
        bytes[base + 1],
        bytes[base],
    ])
}

/// Ring position of a routing key.
///
/// The key digest is hex-encoded and that string is hashed like a point
/// label; the first alignment of the result is the position.
pub fn key_point(key: &str) -> u32 {
    let hex_digest = hex::encode(content_digest(key.as_bytes()));
    digest_point(&content_digest(hex_digest.as_bytes()), 0)
}
