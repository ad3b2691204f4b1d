/// Indexer plugin contract (§4.2) and the fixed registry of identifiers.
mod addr;
mod tx;

pub use addr::AddrIndexer;
pub use tx::TxIndexer;

use async_trait::async_trait;

use crate::chain::{Block, CoinView, Entry};
use crate::error::IndexError;
use crate::store::KvBatch;

/// A single plugin contributing mutations into the batch `IndexDb` composes
/// for one block. A plugin never owns or commits a batch; it only records
/// puts/deletes into the one it is handed.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Identifier as it appears in the `indexers` configuration list.
    fn id(&self) -> &'static str;

    /// Column families this plugin is allowed to write. `IndexDb` checks
    /// writes against this list in debug builds only (§4.2).
    fn owned_cfs(&self) -> &'static [&'static str];

    async fn index_block(
        &self,
        entry: &Entry,
        block: &Block,
        view: &dyn CoinView,
        batch: &mut dyn KvBatch,
    ) -> Result<(), IndexError>;

    async fn unindex_block(
        &self,
        entry: &Entry,
        block: &Block,
        view: &dyn CoinView,
        batch: &mut dyn KvBatch,
    ) -> Result<(), IndexError>;
}

/// Constructs the configured indexer stack from an ordered list of
/// identifiers. An unrecognized identifier is fatal at construction time.
pub fn build_indexers(ids: &[String]) -> Result<Vec<Box<dyn Indexer>>, IndexError> {
    ids.iter()
        .map(|id| match id.as_str() {
            "tx" => Ok(Box::new(TxIndexer) as Box<dyn Indexer>),
            "addr" => Ok(Box::new(AddrIndexer) as Box<dyn Indexer>),
            other => Err(IndexError::UnknownIndexer(other.to_string())),
        })
        .collect()
}
