//! Chained hash table of airports keyed by ICAO code.
//!
//! A fixed, prime number of buckets addressed by a polynomial string hash;
//! collisions chain inside the bucket. Sized for ~60k airports at a load
//! factor below 0.8.

use common::AirportRecord;

/// 60,000 airports * 1.3, rounded to a prime.
pub const DEFAULT_BUCKETS: usize = 78_007;

const HASH_MULTIPLIER: u64 = 79;

/// Bucket index for `code` in a table of `buckets` buckets.
///
/// `hash = hash * 79 + char`, reduced modulo the table size at every step
/// so the accumulator never overflows.
pub fn bucket_index(code: &str, buckets: usize) -> usize {
    let modulus = buckets.max(1) as u64;
    let hash = code
        .chars()
        .fold(0u64, |hash, c| (hash * HASH_MULTIPLIER + u64::from(c)) % modulus);
    hash as usize
}

/// Not synchronized; see [`crate::cache::AirportCache`] for the shared form.
#[derive(Debug, Clone)]
pub struct AirportTable {
    buckets: Vec<Vec<AirportRecord>>,
    len: usize,
}

impl AirportTable {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); buckets.max(1)],
            len: 0,
        }
    }

    pub fn get(&self, code: &str) -> Option<&AirportRecord> {
        self.buckets[bucket_index(code, self.buckets.len())]
            .iter()
            .find(|record| record.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Insert unless the code is already present. The first record for a
    /// code wins; returns whether `record` was stored.
    pub fn insert(&mut self, record: AirportRecord) -> bool {
        let index = bucket_index(&record.code, self.buckets.len());
        let chain = &mut self.buckets[index];
        if chain.iter().any(|existing| existing.code == record.code) {
            return false;
        }
        chain.push(record);
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Length of the longest collision chain.
    pub fn longest_chain(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Every record, in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = &AirportRecord> {
        self.buckets.iter().flatten()
    }
}

impl Default for AirportTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(code: &str, name: &str) -> AirportRecord {
        AirportRecord::new(code, name, 1.0, 2.0)
    }

    #[test]
    fn test_bucket_index_matches_polynomial_hash() {
        assert_eq!(bucket_index("KJFK", DEFAULT_BUCKETS), 2004);
        assert_eq!(bucket_index("EGLL", DEFAULT_BUCKETS), 67795);
        assert_eq!(bucket_index("LFPG", DEFAULT_BUCKETS), 2823);
        assert_eq!(bucket_index("", DEFAULT_BUCKETS), 0);
    }

    #[test]
    fn test_first_insert_wins() {
        let mut table = AirportTable::new();
        assert!(table.insert(airport("EDDF", "Frankfurt")));
        assert!(!table.insert(airport("EDDF", "Somewhere else")));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("EDDF").map(|r| r.name.as_str()), Some("Frankfurt"));
    }

    #[test]
    fn test_colliding_codes_chain_in_one_bucket() {
        // 'A' (65) and 'H' (72) are both 2 mod 7.
        let mut table = AirportTable::with_buckets(7);
        assert_eq!(bucket_index("A", 7), bucket_index("H", 7));

        assert!(table.insert(airport("A", "Alpha")));
        assert!(table.insert(airport("H", "Hotel")));

        assert_eq!(table.longest_chain(), 2);
        assert_eq!(table.get("A").map(|r| r.name.as_str()), Some("Alpha"));
        assert_eq!(table.get("H").map(|r| r.name.as_str()), Some("Hotel"));
        assert!(table.get("O").is_none());
    }

    #[test]
    fn test_single_bucket_table_still_correct() {
        let mut table = AirportTable::with_buckets(0);
        assert_eq!(table.bucket_count(), 1);

        for code in ["KJFK", "EGLL", "LFPG", "EDDF"] {
            assert!(table.insert(airport(code, code)));
        }
        assert_eq!(table.len(), 4);
        assert!(table.contains("LFPG"));
        assert_eq!(table.iter().count(), 4);
        assert!((table.load_factor() - 4.0).abs() < f64::EPSILON);
    }
}
