use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{KvBatch, KvStore, ScanOptions, StoreResult};
use crate::error::StoreError;

#[derive(Clone)]
enum Op {
    Put(String, Vec<u8>, Vec<u8>),
    Delete(String, Vec<u8>),
}

/// In-process `BTreeMap`-backed store used for `memory: true` deployments
/// and for the test suite. One map per column family, keyed identically to
/// `RocksStore` so the two implementations are interchangeable in tests.
#[derive(Default)]
pub struct MemoryStore {
    cfs: Mutex<BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            cfs: Mutex::new(BTreeMap::new()),
        }
    }
}

struct MemoryBatch {
    ops: Vec<Op>,
}

impl KvBatch for MemoryBatch {
    fn put(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(Op::Put(cf.to_string(), key, value));
    }

    fn delete(&mut self, cf: &str, key: Vec<u8>) {
        self.ops.push(Op::Delete(cf.to_string(), key));
    }

    fn len(&self) -> usize {
        self.ops.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, cf: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let cfs = self.cfs.lock().unwrap();
        Ok(cfs.get(cf).and_then(|m| m.get(key)).cloned())
    }

    fn new_batch(&self) -> Box<dyn KvBatch> {
        Box::new(MemoryBatch { ops: Vec::new() })
    }

    async fn write(&self, mut batch: Box<dyn KvBatch>) -> StoreResult<()> {
        let memory_batch = batch
            .as_any_mut()
            .downcast_mut::<MemoryBatch>()
            .ok_or_else(|| StoreError::TaskJoin("batch built for a different store".into()))?;
        let ops = std::mem::take(&mut memory_batch.ops);

        let mut cfs = self.cfs.lock().unwrap();
        for op in ops {
            match op {
                Op::Put(cf, k, v) => {
                    cfs.entry(cf).or_default().insert(k, v);
                }
                Op::Delete(cf, k) => {
                    if let Some(m) = cfs.get_mut(&cf) {
                        m.remove(&k);
                    }
                }
            }
        }
        Ok(())
    }

    async fn scan(&self, cf: &str, opts: ScanOptions) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let cfs = self.cfs.lock().unwrap();
        let Some(map) = cfs.get(cf) else {
            return Ok(Vec::new());
        };

        let mut items: Vec<(Vec<u8>, Vec<u8>)> = map
            .range(range_bounds(&opts))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if opts.reverse {
            items.reverse();
        }
        if let Some(limit) = opts.limit {
            items.truncate(limit);
        }
        Ok(items)
    }
}

fn range_bounds(opts: &ScanOptions) -> (std::ops::Bound<Vec<u8>>, std::ops::Bound<Vec<u8>>) {
    use std::ops::Bound;
    let lo = opts.gte.clone().map(Bound::Included).unwrap_or(Bound::Unbounded);
    let hi = opts.lt.clone().map(Bound::Excluded).unwrap_or(Bound::Unbounded);
    (lo, hi)
}
