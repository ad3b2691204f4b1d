/// Maps address hash to touching tx hashes, and to unspent coin outpoints
/// (§4.4).
use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::chain::{Block, CoinView, Entry, OutPoint, Tx};
use crate::error::IndexError;
use crate::hash::AddrHash;
use crate::keys::{self, CF_ADDR_COIN, CF_ADDR_TX};
use crate::store::KvBatch;

use super::Indexer;

pub struct AddrIndexer;

const OWNED_CFS: [&str; 2] = [CF_ADDR_TX, CF_ADDR_COIN];

/// Every address touched by `tx`'s outputs, plus (when `view` resolves them)
/// its spent inputs. Deduplicated so a tx with two outputs to the same
/// address only produces one `T` edge.
fn addr_hashes(tx: &Tx, view: &dyn CoinView) -> BTreeSet<AddrHash> {
    let mut out = BTreeSet::new();
    for output in &tx.outputs {
        if let Some(addr) = output.address {
            out.insert(addr);
        }
    }
    if !tx.is_coinbase {
        for input in &tx.inputs {
            if let Some(coin) = view.get_output(&input.prevout) {
                if let Some(addr) = coin.address {
                    out.insert(addr);
                }
            }
        }
    }
    out
}

#[async_trait]
impl Indexer for AddrIndexer {
    fn id(&self) -> &'static str {
        "addr"
    }

    fn owned_cfs(&self) -> &'static [&'static str] {
        &OWNED_CFS
    }

    async fn index_block(
        &self,
        _entry: &Entry,
        block: &Block,
        view: &dyn CoinView,
        batch: &mut dyn KvBatch,
    ) -> Result<(), IndexError> {
        for tx in &block.txs {
            for addr in addr_hashes(tx, view) {
                batch.put(CF_ADDR_TX, keys::addr_tx_key(&addr, &tx.hash), Vec::new());
            }

            // An unresolved input (`scan()`'s catch-up pass runs with an
            // `EmptyView`) just means this spend's coin-edge can't be
            // removed yet — left in place rather than treated as fatal.
            if !tx.is_coinbase {
                for input in &tx.inputs {
                    if let Some(coin) = view.get_output(&input.prevout) {
                        if let Some(addr) = coin.address {
                            batch.delete(
                                CF_ADDR_COIN,
                                keys::addr_coin_key(&addr, &input.prevout.txhash, input.prevout.index),
                            );
                        }
                    }
                }
            }

            for (j, output) in tx.outputs.iter().enumerate() {
                if let Some(addr) = output.address {
                    batch.put(CF_ADDR_COIN, keys::addr_coin_key(&addr, &tx.hash, j as u32), Vec::new());
                }
            }
        }
        Ok(())
    }

    async fn unindex_block(
        &self,
        _entry: &Entry,
        block: &Block,
        view: &dyn CoinView,
        batch: &mut dyn KvBatch,
    ) -> Result<(), IndexError> {
        for tx in &block.txs {
            for addr in addr_hashes(tx, view) {
                batch.delete(CF_ADDR_TX, keys::addr_tx_key(&addr, &tx.hash));
            }

            for (j, output) in tx.outputs.iter().enumerate() {
                if let Some(addr) = output.address {
                    batch.delete(CF_ADDR_COIN, keys::addr_coin_key(&addr, &tx.hash, j as u32));
                }
            }

            if !tx.is_coinbase {
                for input in &tx.inputs {
                    if let Some(coin) = view.get_output(&input.prevout) {
                        if let Some(addr) = coin.address {
                            batch.put(
                                CF_ADDR_COIN,
                                keys::addr_coin_key(&addr, &input.prevout.txhash, input.prevout.index),
                                Vec::new(),
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
