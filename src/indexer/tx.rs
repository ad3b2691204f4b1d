/// Maps tx hash to its extended record (§4.3).
use async_trait::async_trait;

use crate::chain::{Block, CoinView, Entry};
use crate::error::IndexError;
use crate::keys::{self, CF_TX};
use crate::record::TxMeta;
use crate::store::KvBatch;

use super::Indexer;

pub struct TxIndexer;

const OWNED_CFS: [&str; 1] = [CF_TX];

#[async_trait]
impl Indexer for TxIndexer {
    fn id(&self) -> &'static str {
        "tx"
    }

    fn owned_cfs(&self) -> &'static [&'static str] {
        &OWNED_CFS
    }

    async fn index_block(
        &self,
        entry: &Entry,
        block: &Block,
        _view: &dyn CoinView,
        batch: &mut dyn KvBatch,
    ) -> Result<(), IndexError> {
        for (i, tx) in block.txs.iter().enumerate() {
            let meta = TxMeta {
                height: entry.height,
                time: entry.time,
                index: i as u32,
                block_hash: entry.hash,
                raw: tx.raw.clone(),
            };
            batch.put(CF_TX, keys::tx_key(&tx.hash), meta.encode());
        }
        Ok(())
    }

    async fn unindex_block(
        &self,
        _entry: &Entry,
        block: &Block,
        _view: &dyn CoinView,
        batch: &mut dyn KvBatch,
    ) -> Result<(), IndexError> {
        for tx in &block.txs {
            batch.delete(CF_TX, keys::tx_key(&tx.hash));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::EmptyView;
    use crate::hash::Hash256;
    use crate::store::{KvStore, MemoryStore};

    fn sample_block() -> Block {
        Block {
            txs: vec![
                crate::chain::Tx {
                    hash: Hash256([1u8; 32]),
                    raw: vec![0xaa],
                    is_coinbase: true,
                    inputs: vec![],
                    outputs: vec![],
                },
                crate::chain::Tx {
                    hash: Hash256([2u8; 32]),
                    raw: vec![0xbb],
                    is_coinbase: false,
                    inputs: vec![],
                    outputs: vec![],
                },
            ],
        }
    }

    fn sample_entry() -> Entry {
        Entry {
            hash: Hash256([9u8; 32]),
            height: 7,
            time: 12345,
            prev: Hash256::ZERO,
        }
    }

    #[tokio::test]
    async fn index_then_unindex_is_a_noop() {
        let store = MemoryStore::new();
        let indexer = TxIndexer;
        let entry = sample_entry();
        let block = sample_block();

        let mut batch = store.new_batch();
        indexer
            .index_block(&entry, &block, &EmptyView, batch.as_mut())
            .await
            .unwrap();
        store.write(batch).await.unwrap();

        for tx in &block.txs {
            assert!(store.get(CF_TX, &keys::tx_key(&tx.hash)).await.unwrap().is_some());
        }

        let mut batch = store.new_batch();
        indexer
            .unindex_block(&entry, &block, &EmptyView, batch.as_mut())
            .await
            .unwrap();
        store.write(batch).await.unwrap();

        for tx in &block.txs {
            assert!(store.get(CF_TX, &keys::tx_key(&tx.hash)).await.unwrap().is_none());
        }
    }
}
