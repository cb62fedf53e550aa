//! Key-to-shard hashing.
//!
//! A fixed-seed CRC32 over the key bytes, reduced by modulus. The seed
//! never changes, so a given key maps to the same shard across process
//! restarts - callers relying on data locality get sticky routing for
//! free, and the mapping only moves when the shard count itself changes.

/// Seed folded into every key hash. Constant for the process lifetime
/// and across restarts.
const HASH_SEED: u32 = 3453;

/// Map a key to a shard index in `0..shard_count`.
///
/// `shard_count` must be non-zero; the router guarantees this once
/// started.
pub fn shard_index(key: &[u8], shard_count: usize) -> usize {
    debug_assert!(shard_count > 0);
    let mut hasher = crc32fast::Hasher::new_with_initial(HASH_SEED);
    hasher.update(key);
    hasher.finalize() as usize % shard_count
}
