//! Deterministic utilities for reproducible generation and splitting
//!
//! Provides xxhash-style mixing for per-row seeds and hash-ordered shuffles
//! so that datasets and train/test partitions are identical across runs.

/// Deterministic xxhash64-like hash over a slice of words
pub fn xxhash64(data: &[u64], seed: u64) -> u64 {
    const PRIME1: u64 = 0x9E37_79B1_85EB_CA87;
    const PRIME2: u64 = 0xC2B2_AE3D_27D4_EB4F;
    const PRIME3: u64 = 0x1656_67B1_9E37_79F9;
    const PRIME5: u64 = 0x85EB_CA77_C2B2_AE63;

    let mut h = seed.wrapping_add(PRIME5);

    for &val in data {
        h = h.wrapping_add(val.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// Seed for the RNG of one generated row
pub fn row_seed(seed: u64, index: usize) -> u64 {
    xxhash64(&[index as u64], seed)
}

/// Permutation of `0..n` ordered by `(hash(index, seed), index)`
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut keyed: Vec<(u64, usize)> = (0..n)
        .map(|i| (xxhash64(&[i as u64, 0x5eed], seed), i))
        .collect();
    keyed.sort_unstable();
    keyed.into_iter().map(|(_, i)| i).collect()
}

/// Split `0..n` into `(train, test)` index sets.
///
/// The test partition holds `round(n * test_ratio)` rows, but always leaves at
/// least one row on each side when `n >= 2`.
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let order = shuffled_indices(n, seed);
    let mut n_test = (n as f64 * test_ratio).round() as usize;
    if n >= 2 {
        n_test = n_test.clamp(1, n - 1);
    } else {
        n_test = 0;
    }
    let test = order[..n_test].to_vec();
    let train = order[n_test..].to_vec();
    (train, test)
}
