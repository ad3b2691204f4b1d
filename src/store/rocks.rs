/// RocksDB-backed `KvStore`.
///
/// Grounded on the teacher's `atomic_writer.rs`: every blocking RocksDB call
/// runs inside `tokio::task::spawn_blocking`, and a whole batch — spanning
/// every column family an indexing pass touches — commits through a single
/// `rocksdb::WriteBatch` so a crash mid-commit can never leave the tip
/// record and the per-indexer rows out of sync.
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};

use super::{KvBatch, KvStore, ScanOptions, StoreResult};
use crate::error::StoreError;

pub const COLUMN_FAMILIES: [&str; 8] = ["V", "O", "R", "h", "t", "T", "C", "u"];

pub struct RocksStore {
    db: Arc<DB>,
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>, max_files: i32, cache_size: usize, compression: bool) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(max_files);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(cache_size));
        opts.set_block_based_table_factory(&block_opts);

        if compression {
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        } else {
            opts.set_compression_type(rocksdb::DBCompressionType::None);
        }

        let cf_descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(RocksStore { db: Arc::new(db) })
    }
}

enum Op {
    Put(String, Vec<u8>, Vec<u8>),
    Delete(String, Vec<u8>),
}

struct RocksBatch {
    ops: Vec<Op>,
}

impl KvBatch for RocksBatch {
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
impl KvStore for RocksStore {
    async fn get(&self, cf: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let db = self.db.clone();
        let cf = cf.to_string();
        let key = key.to_vec();
        tokio::task::spawn_blocking(move || {
            let handle = db
                .cf_handle(&cf)
                .ok_or_else(|| StoreError::ColumnFamilyMissing(cf.clone()))?;
            Ok(db.get_cf(&handle, key)?)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }

    fn new_batch(&self) -> Box<dyn KvBatch> {
        Box::new(RocksBatch { ops: Vec::new() })
    }

    async fn write(&self, mut batch: Box<dyn KvBatch>) -> StoreResult<()> {
        let rocks_batch = batch
            .as_any_mut()
            .downcast_mut::<RocksBatch>()
            .ok_or_else(|| StoreError::TaskJoin("batch built for a different store".into()))?;
        let ops = std::mem::take(&mut rocks_batch.ops);

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut wb = WriteBatch::default();
            for op in &ops {
                match op {
                    Op::Put(cf, k, v) => {
                        let handle = db
                            .cf_handle(cf)
                            .ok_or_else(|| StoreError::ColumnFamilyMissing(cf.clone()))?;
                        wb.put_cf(&handle, k, v);
                    }
                    Op::Delete(cf, k) => {
                        let handle = db
                            .cf_handle(cf)
                            .ok_or_else(|| StoreError::ColumnFamilyMissing(cf.clone()))?;
                        wb.delete_cf(&handle, k);
                    }
                }
            }
            db.write(wb)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }

    async fn scan(&self, cf: &str, opts: ScanOptions) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let db = self.db.clone();
        let cf = cf.to_string();
        tokio::task::spawn_blocking(move || {
            let handle = db
                .cf_handle(&cf)
                .ok_or_else(|| StoreError::ColumnFamilyMissing(cf.clone()))?;

            let mode = match (&opts.gte, &opts.reverse) {
                (Some(start), false) => {
                    rocksdb::IteratorMode::From(start, rocksdb::Direction::Forward)
                }
                (Some(start), true) => {
                    rocksdb::IteratorMode::From(start, rocksdb::Direction::Reverse)
                }
                (None, false) => rocksdb::IteratorMode::Start,
                (None, true) => rocksdb::IteratorMode::End,
            };

            let mut out = Vec::new();
            for item in db.iterator_cf(&handle, mode) {
                let (key, value) = item?;
                if let Some(bound) = &opts.lt {
                    if key.as_ref() >= bound.as_slice() {
                        if opts.reverse {
                            continue;
                        }
                        break;
                    }
                }
                if let Some(gte) = &opts.gte {
                    if key.as_ref() < gte.as_slice() {
                        if opts.reverse {
                            break;
                        }
                        continue;
                    }
                }
                out.push((key.to_vec(), value.to_vec()));
                if let Some(limit) = opts.limit {
                    if out.len() >= limit {
                        break;
                    }
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }
}
