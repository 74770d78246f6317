//! Probabilistic URL deduplication filter.
//!
//! A fixed-size bloom filter sized from a maximum entry count and a target
//! false-positive probability. `test` answering `false` means the key is
//! definitely new; `true` means it was probably seen before. No deletions:
//! resources are append-only, so bits only ever get set.

const HASH_SEEDS: [u64; 2] = [0x517c_c1b7_2722_0a95, 0x6d0f_27bd_ceb7_b067];

#[derive(Debug, Clone)]
pub struct DedupFilter {
    bits: Vec<u8>,
    bit_count: usize,
    hashes: u32,
    max_entries: usize,
    fpp: f64,
}

impl DedupFilter {
    /// Size the filter from `max_entries` and `fpp` using the standard
    /// formulas: m = -n ln p / (ln 2)^2 bits, k = m/n ln 2 hash functions.
    /// `existing` restores a previously serialized bitset; a length mismatch
    /// (changed sizing parameters) starts fresh.
    pub fn create(max_entries: usize, fpp: f64, existing: Option<Vec<u8>>) -> Self {
        let max_entries = max_entries.max(1);
        let fpp = fpp.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let bit_count = ((-(max_entries as f64) * fpp.ln()) / (ln2 * ln2)).ceil() as usize;
        let bit_count = bit_count.max(8);
        let hashes = ((bit_count as f64 / max_entries as f64) * ln2).round().max(1.0) as u32;

        let byte_len = bit_count.div_ceil(8);
        let bits = match existing {
            Some(existing) if existing.len() == byte_len => existing,
            Some(_) => {
                tracing::warn!("dedup filter bitset length mismatch, starting fresh");
                vec![0u8; byte_len]
            }
            None => vec![0u8; byte_len],
        };

        Self {
            bits,
            bit_count,
            hashes,
            max_entries,
            fpp,
        }
    }

    /// `false` means definitely new; `true` means probably present.
    pub fn test(&self, key: &str) -> bool {
        let (h1, h2) = self.base_hashes(key);
        (0..self.hashes).all(|i| {
            let idx = self.bit_index(h1, h2, i);
            self.bits[idx / 8] & (1 << (idx % 8)) != 0
        })
    }

    pub fn add(&mut self, key: &str) {
        let (h1, h2) = self.base_hashes(key);
        for i in 0..self.hashes {
            let idx = self.bit_index(h1, h2, i);
            self.bits[idx / 8] |= 1 << (idx % 8);
        }
    }

    /// The raw bitset, serialized alongside the owning site record.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn fpp(&self) -> f64 {
        self.fpp
    }

    fn base_hashes(&self, key: &str) -> (u64, u64) {
        let h1 = mix_hash(key.as_bytes(), HASH_SEEDS[0]);
        // An even second hash would degenerate the double-hashing stride.
        let h2 = mix_hash(key.as_bytes(), HASH_SEEDS[1]) | 1;
        (h1, h2)
    }

    fn bit_index(&self, h1: u64, h2: u64, i: u32) -> usize {
        (h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.bit_count as u64) as usize
    }
}

fn mix_hash(data: &[u8], seed: u64) -> u64 {
    let mut hash = seed ^ data.len() as u64;
    for &byte in data {
        hash ^= (byte as u64).wrapping_mul(0x1000_0000_01b3);
        hash = hash.rotate_left(13).wrapping_mul(0xff51_afd7_ed55_8ccd);
    }
    hash ^ (hash >> 33)
}
