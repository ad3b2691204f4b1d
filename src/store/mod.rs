/// Ordered key-value store boundary (§6).
///
/// This module defines the trait the rest of the engine programs against;
/// `rocks` and `memory` are the two shipped implementations. Everything
/// upstream of this module is KV-agnostic.
mod memory;
mod rocks;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

use async_trait::async_trait;

use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Accumulates puts/deletes for one atomic commit. Column families are
/// addressed by name so a single batch can span every indexer's keyspace
/// plus the tip record.
pub trait KvBatch: Send {
    fn put(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>);
    fn delete(&mut self, cf: &str, key: Vec<u8>);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Lets each `KvStore` impl recover its own concrete batch type back
    /// out of the trait object it handed to the caller.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
    pub gte: Option<Vec<u8>>,
    /// Exclusive upper bound — a key is in range only while it sorts
    /// strictly before this.
    pub lt: Option<Vec<u8>>,
    pub reverse: bool,
    pub limit: Option<usize>,
}

impl ScanOptions {
    pub fn prefix(prefix: &[u8]) -> Self {
        ScanOptions {
            gte: Some(prefix.to_vec()),
            lt: prefix_upper_bound(prefix),
            reverse: false,
            limit: None,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn limited(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Smallest key that sorts strictly after every key starting with `prefix`,
/// found by incrementing `prefix`'s last non-`0xff` byte and dropping
/// everything after it. A suffix-insensitive `prefix + [0xff]` bound (the
/// prior approach here) is wrong for multi-byte suffixes: a key whose
/// variable-length suffix itself starts with `0xff` sorts *after*
/// `prefix + [0xff]`, since a shorter byte string that is a prefix of a
/// longer one always sorts first — so that row would be silently dropped
/// from the scan. Returns `None` (no finite upper bound) when `prefix` is
/// empty or made entirely of `0xff` bytes.
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(&last) = out.last() {
        if last == 0xff {
            out.pop();
        } else {
            *out.last_mut().unwrap() += 1;
            return Some(out);
        }
    }
    None
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, cf: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn new_batch(&self) -> Box<dyn KvBatch>;

    async fn write(&self, batch: Box<dyn KvBatch>) -> StoreResult<()>;

    async fn scan(&self, cf: &str, opts: ScanOptions) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Writes `expected` under `key` if absent; otherwise returns whatever
    /// is already stored there. Callers that need a structured mismatch
    /// error decode the returned bytes themselves and compare — this just
    /// carries the common "write-once, read-back" sequence so every
    /// once-per-open record (schema tag, network magic, ...) doesn't
    /// reimplement it.
    async fn verify(&self, cf: &str, key: &[u8], expected: &[u8]) -> StoreResult<Vec<u8>> {
        match self.get(cf, key).await? {
            None => {
                let mut batch = self.new_batch();
                batch.put(cf, key.to_vec(), expected.to_vec());
                self.write(batch).await?;
                Ok(expected.to_vec())
            }
            Some(found) => Ok(found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_upper_bound_increments_last_non_ff_byte() {
        assert_eq!(prefix_upper_bound(&[1, 2, 3]), Some(vec![1, 2, 4]));
    }

    #[test]
    fn prefix_upper_bound_truncates_trailing_ff_bytes() {
        assert_eq!(prefix_upper_bound(&[1, 0xff, 0xff]), Some(vec![2]));
    }

    #[test]
    fn prefix_upper_bound_is_unbounded_for_all_ff_or_empty() {
        assert_eq!(prefix_upper_bound(&[0xff, 0xff]), None);
        assert_eq!(prefix_upper_bound(&[]), None);
    }

    #[test]
    fn prefix_upper_bound_dominates_any_suffix_starting_with_ff() {
        let prefix = vec![5u8];
        let bound = prefix_upper_bound(&prefix).unwrap();
        let mut key_with_ff_suffix = prefix.clone();
        key_with_ff_suffix.extend_from_slice(&[0xff, 0x00]);
        assert!(key_with_ff_suffix < bound);
    }
}
