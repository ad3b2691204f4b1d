/// Tip tracker, sync loop, and batch composer (§4.5) — the coordinator
/// tying the store, the chain client, and the indexer stack together under
/// a single exclusion lock (§5).
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::chain::{Block, ChainEvent, CoinView, EmptyView, Entry, HeightOrHash};
use crate::client::ChainClient;
use crate::error::IndexError;
use crate::hash::Hash256;
use crate::indexer::{build_indexers, Indexer};
use crate::keys::{self, CF_HEIGHT, CF_NETWORK, CF_SCHEMA, CF_STATE, CF_UNDO, NETWORK_KEY, SCHEMA_KEY, STATE_KEY};
use crate::record::{self, IndexState};
use crate::store::{KvBatch, KvStore};

/// A mutation recorded by one indexer during `index_block`, before it has
/// been split into the real store batch plus the undo log.
enum CollectedOp {
    Put(String, Vec<u8>, Vec<u8>),
    Delete(String, Vec<u8>),
}

impl CollectedOp {
    fn cf(&self) -> &str {
        match self {
            CollectedOp::Put(cf, _, _) => cf,
            CollectedOp::Delete(cf, _) => cf,
        }
    }
}

#[derive(Default)]
struct CollectingBatch {
    ops: Vec<CollectedOp>,
}

impl KvBatch for CollectingBatch {
    fn put(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(CollectedOp::Put(cf.to_string(), key, value));
    }

    fn delete(&mut self, cf: &str, key: Vec<u8>) {
        self.ops.push(CollectedOp::Delete(cf.to_string(), key));
    }

    fn len(&self) -> usize {
        self.ops.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// The inverse of one `CollectedOp`. All deletes our built-in indexers issue
/// target presence-only rows (empty value), so re-inserting one never needs
/// the original payload — `PutEmpty` is sufficient.
enum UndoOp {
    Delete(String, Vec<u8>),
    PutEmpty(String, Vec<u8>),
}

fn encode_undo(ops: &[UndoOp]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        let (kind, cf, key): (u8, &str, &[u8]) = match op {
            UndoOp::Delete(cf, key) => (0, cf, key),
            UndoOp::PutEmpty(cf, key) => (1, cf, key),
        };
        out.push(kind);
        out.push(cf.len() as u8);
        out.extend_from_slice(cf.as_bytes());
        out.extend_from_slice(&(key.len() as u32).to_le_bytes());
        out.extend_from_slice(key);
    }
    out
}

fn decode_undo(mut buf: &[u8]) -> Vec<UndoOp> {
    let mut out = Vec::new();
    while !buf.is_empty() {
        let kind = buf[0];
        let cf_len = buf[1] as usize;
        let cf = String::from_utf8_lossy(&buf[2..2 + cf_len]).to_string();
        buf = &buf[2 + cf_len..];
        let key_len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
        let key = buf[4..4 + key_len].to_vec();
        buf = &buf[4 + key_len..];
        out.push(if kind == 0 {
            UndoOp::Delete(cf, key)
        } else {
            UndoOp::PutEmpty(cf, key)
        });
    }
    out
}

pub struct IndexDb {
    store: Arc<dyn KvStore>,
    client: Arc<dyn ChainClient>,
    indexers: Vec<Box<dyn Indexer>>,
    network: u32,
    rollback_chunk_size: usize,
    state: Mutex<Option<IndexState>>,
}

impl IndexDb {
    pub async fn open(
        store: Arc<dyn KvStore>,
        client: Arc<dyn ChainClient>,
        indexer_ids: &[String],
        network: u32,
        rollback_chunk_size: usize,
    ) -> Result<Self, IndexError> {
        let db = IndexDb {
            store,
            client,
            indexers: build_indexers(indexer_ids)?,
            network,
            rollback_chunk_size,
            state: Mutex::new(None),
        };
        db.verify_schema().await?;
        db.verify_network().await?;
        let loaded = db.load_state().await?;
        *db.state.lock().await = loaded;
        Ok(db)
    }

    async fn verify_schema(&self) -> Result<(), IndexError> {
        let bytes = self
            .store
            .verify(CF_SCHEMA, SCHEMA_KEY, &record::encode_schema_tag())
            .await?;
        let (tag, version) = record::decode_schema_tag(&bytes).ok_or_else(|| IndexError::SchemaMismatch {
            expected: format!("{}@{}", keys::SCHEMA_TAG, keys::SCHEMA_VERSION),
            found: "corrupt schema record".to_string(),
        })?;
        if tag != keys::SCHEMA_TAG || version != keys::SCHEMA_VERSION {
            return Err(IndexError::SchemaMismatch {
                expected: format!("{}@{}", keys::SCHEMA_TAG, keys::SCHEMA_VERSION),
                found: format!("{}@{}", tag, version),
            });
        }
        Ok(())
    }

    async fn verify_network(&self) -> Result<(), IndexError> {
        let bytes = self
            .store
            .verify(CF_NETWORK, NETWORK_KEY, &record::encode_network_magic(self.network))
            .await?;
        let found = record::decode_network_magic(&bytes)
            .ok_or_else(|| IndexError::InvariantViolation("corrupt network magic record".into()))?;
        if found != self.network {
            return Err(IndexError::NetworkMismatch {
                expected: self.network,
                found,
            });
        }
        Ok(())
    }

    async fn load_state(&self) -> Result<Option<IndexState>, IndexError> {
        match self.store.get(CF_STATE, STATE_KEY).await? {
            Some(bytes) => IndexState::decode(&bytes)
                .map(Some)
                .ok_or_else(|| IndexError::InvariantViolation("corrupt IndexState record".into())),
            None => Ok(None),
        }
    }

    pub async fn tip(&self) -> Option<IndexState> {
        *self.state.lock().await
    }

    /// Consumes chain events one at a time, holding the exclusion lock from
    /// dequeue through commit. Runs until `events` closes.
    pub async fn run(&self, mut events: mpsc::Receiver<ChainEvent>, errors: mpsc::UnboundedSender<IndexError>) {
        while let Some(event) = events.recv().await {
            let mut guard = self.state.lock().await;
            if let Err(err) = self.dispatch(event, &mut guard).await {
                tracing::error!(error = %err, "event handling failed, tip not advanced");
                let _ = errors.send(err);
            }
        }
    }

    /// Drops this instance's store/client handles. Any handler already in
    /// flight inside `run` completes on its own before its `Mutex` guard is
    /// released; callers stop new events by dropping their sender.
    pub fn close(self) {
        tracing::info!("index db closed");
    }

    /// `sync_state` then `sync_chain`, run under the exclusion lock (§4.5).
    pub async fn sync_node(&self) -> Result<(), IndexError> {
        let mut guard = self.state.lock().await;
        self.sync_state(&mut guard).await?;
        self.sync_chain(&mut guard).await?;
        Ok(())
    }

    async fn sync_state(&self, state: &mut Option<IndexState>) -> Result<(), IndexError> {
        match *state {
            None => {
                let tip = self.client.get_tip().await?;
                let hashes = self.client.get_hashes(0, tip.height).await?;
                let mut batch = self.store.new_batch();
                for (h, hash) in hashes.iter().enumerate() {
                    batch.put(CF_HEIGHT, keys::height_key(h as u32), hash.0.to_vec());
                }
                let new_state = IndexState::genesis(tip.height, tip.hash);
                batch.put(CF_STATE, STATE_KEY.to_vec(), new_state.encode());
                self.store.write(batch).await?;
                *state = Some(new_state);
            }
            Some(cur) => {
                if self.store.get(CF_HEIGHT, &keys::height_key(0)).await?.is_none() {
                    self.migrate_state(cur).await?;
                }
            }
        }
        Ok(())
    }

    /// Rebuilds `h[0..=R.height]` from the client when a persisted `R`
    /// exists but the per-height map does not (§4.5).
    async fn migrate_state(&self, cur: IndexState) -> Result<(), IndexError> {
        let hashes = self.client.get_hashes(0, cur.height).await?;
        let mut batch = self.store.new_batch();
        for (h, hash) in hashes.iter().enumerate() {
            batch.put(CF_HEIGHT, keys::height_key(h as u32), hash.0.to_vec());
        }
        self.store.write(batch).await
    }

    async fn sync_chain(&self, state: &mut Option<IndexState>) -> Result<(), IndexError> {
        let cur = state.ok_or_else(|| IndexError::InvariantViolation("sync_chain called before sync_state".into()))?;
        let mut height = cur.height;
        loop {
            let hash = self.local_height_hash(height).await?;
            if self.client.get_entry(HeightOrHash::Hash(hash)).await?.is_some() {
                break;
            }
            if height == 0 {
                return Err(IndexError::InvariantViolation("client no longer recognizes height 0".into()));
            }
            height -= 1;
        }
        self.scan(state, height).await
    }

    async fn local_height_hash(&self, height: u32) -> Result<Hash256, IndexError> {
        let bytes = self
            .store
            .get(CF_HEIGHT, &keys::height_key(height))
            .await?
            .ok_or_else(|| IndexError::InvariantViolation(format!("missing local height map entry at {}", height)))?;
        Hash256::from_slice(&bytes).ok_or_else(|| IndexError::InvariantViolation("corrupt height map entry".into()))
    }

    /// `rollback(height)` followed by a forward catch-up using the client's
    /// `get_entry`/`get_next`, with an `EmptyView` (§4.5, §9).
    async fn scan(&self, state: &mut Option<IndexState>, height: u32) -> Result<(), IndexError> {
        self.rollback(state, height).await?;

        let Some(mut entry) = self.client.get_entry(HeightOrHash::Height(height)).await? else {
            return Ok(());
        };
        let view = EmptyView;
        loop {
            let Some(next_entry) = self.client.get_next(&entry).await? else {
                break;
            };
            let block = self.client.get_block(next_entry.hash).await?;
            self.apply_connect(state, &next_entry, &block, &view).await?;
            entry = next_entry;
        }
        Ok(())
    }

    /// Rewinds committed indexer state down to `target_height`, replaying
    /// each height's undo log in chunks of at most `rollback_chunk_size`
    /// deletions so a crash mid-rollback leaves a recoverable prefix.
    async fn rollback(&self, state: &mut Option<IndexState>, target_height: u32) -> Result<(), IndexError> {
        let mut cur = state.ok_or_else(|| IndexError::InvariantViolation("rollback called before sync_state".into()))?;

        while cur.height > target_height {
            let undo_key = keys::height_key(cur.height);
            let ops = match self.store.get(CF_UNDO, &undo_key).await? {
                Some(bytes) => decode_undo(&bytes),
                None => Vec::new(),
            };

            for chunk in ops.chunks(self.rollback_chunk_size.max(1)) {
                let mut batch = self.store.new_batch();
                for op in chunk {
                    match op {
                        UndoOp::Delete(cf, key) => batch.delete(cf, key.clone()),
                        UndoOp::PutEmpty(cf, key) => batch.put(cf, key.clone(), Vec::new()),
                    }
                }
                self.store.write(batch).await?;
            }

            let prev_height = cur.height - 1;
            let prev_hash = self.local_height_hash(prev_height).await?;

            let mut batch = self.store.new_batch();
            batch.delete(CF_UNDO, undo_key);
            self.set_tip(&mut cur, prev_height, prev_hash, batch.as_mut())?;
            self.store.write(batch).await?;
        }

        *state = Some(cur);
        Ok(())
    }

    /// Dispatches one event per the state machine in §4.5. Invoked with the
    /// exclusion lock already held.
    async fn dispatch(&self, event: ChainEvent, state: &mut Option<IndexState>) -> Result<(), IndexError> {
        match event {
            ChainEvent::Connect { entry, block, view } => {
                let cur = state.ok_or_else(|| IndexError::InvariantViolation("connect before sync_node".into()))?;
                if entry.height == cur.height + 1 || entry.height == cur.height {
                    if entry.height == cur.height {
                        tracing::warn!(height = entry.height, "reapplying already-indexed tip");
                    }
                    self.apply_connect(state, &entry, &block, view.as_ref()).await
                } else {
                    tracing::warn!(
                        connect_height = entry.height,
                        tip_height = cur.height,
                        "non-contiguous connect, forcing a scan"
                    );
                    self.scan(state, cur.height).await
                }
            }
            ChainEvent::Disconnect { entry, block, view } => {
                if entry.height == 0 {
                    return Err(IndexError::BadDisconnect {
                        height: 0,
                        reason: "cannot disconnect genesis".into(),
                    });
                }
                let cur = state.ok_or_else(|| IndexError::InvariantViolation("disconnect before sync_node".into()))?;
                if entry.height != cur.height {
                    return Err(IndexError::BadDisconnect {
                        height: entry.height,
                        reason: format!("expected disconnect at tip height {}", cur.height),
                    });
                }
                self.apply_disconnect(state, &entry, &block, view.as_ref()).await
            }
            ChainEvent::Reset { tip } => {
                let cur = state.ok_or_else(|| IndexError::InvariantViolation("reset before sync_node".into()))?;
                if tip.height < cur.height {
                    self.rollback(state, tip.height).await
                } else {
                    Ok(())
                }
            }
            // No built-in indexer acts on unconfirmed transactions; the
            // dispatch path exists for future mempool-aware plugins.
            ChainEvent::Tx { .. } => Ok(()),
        }
    }

    async fn apply_connect(
        &self,
        state: &mut Option<IndexState>,
        entry: &Entry,
        block: &Block,
        view: &dyn CoinView,
    ) -> Result<(), IndexError> {
        let mut cur = state.ok_or_else(|| IndexError::InvariantViolation("apply_connect before sync_node".into()))?;

        let mut collector = CollectingBatch::default();
        for indexer in &self.indexers {
            let before = collector.ops.len();
            indexer.index_block(entry, block, view, &mut collector).await?;
            if cfg!(debug_assertions) {
                for op in &collector.ops[before..] {
                    let cf = op.cf();
                    debug_assert!(
                        indexer.owned_cfs().contains(&cf),
                        "indexer {} wrote outside its declared prefix ({})",
                        indexer.id(),
                        cf
                    );
                }
            }
        }

        let mut batch = self.store.new_batch();
        let mut undo_ops = Vec::with_capacity(collector.ops.len());
        for op in collector.ops {
            match op {
                CollectedOp::Put(cf, key, value) => {
                    undo_ops.push(UndoOp::Delete(cf.clone(), key.clone()));
                    batch.put(&cf, key, value);
                }
                CollectedOp::Delete(cf, key) => {
                    undo_ops.push(UndoOp::PutEmpty(cf.clone(), key.clone()));
                    batch.delete(&cf, key);
                }
            }
        }
        undo_ops.reverse();
        batch.put(CF_UNDO, keys::height_key(entry.height), encode_undo(&undo_ops));

        self.set_tip(&mut cur, entry.height, entry.hash, batch.as_mut())?;
        self.store.write(batch).await?;
        *state = Some(cur);
        Ok(())
    }

    async fn apply_disconnect(
        &self,
        state: &mut Option<IndexState>,
        entry: &Entry,
        block: &Block,
        view: &dyn CoinView,
    ) -> Result<(), IndexError> {
        let mut cur =
            state.ok_or_else(|| IndexError::InvariantViolation("apply_disconnect before sync_node".into()))?;

        let mut batch = self.store.new_batch();
        for indexer in &self.indexers {
            indexer.unindex_block(entry, block, view, batch.as_mut()).await?;
        }
        batch.delete(CF_UNDO, keys::height_key(entry.height));
        self.set_tip(&mut cur, entry.height - 1, entry.prev, batch.as_mut())?;
        self.store.write(batch).await?;
        *state = Some(cur);
        Ok(())
    }

    /// Mutates `state` in place per the four cases in §4.5 and appends the
    /// height-map/state writes to `batch`. The caller commits.
    fn set_tip(
        &self,
        state: &mut IndexState,
        tip_height: u32,
        tip_hash: Hash256,
        batch: &mut dyn KvBatch,
    ) -> Result<(), IndexError> {
        if tip_height > state.height + 1 {
            return Err(IndexError::InvariantViolation(format!(
                "forbidden tip jump from {} to {}",
                state.height, tip_height
            )));
        }
        if tip_height < state.height {
            for h in (tip_height + 1)..=state.height {
                batch.delete(CF_HEIGHT, keys::height_key(h));
            }
        }
        state.height = tip_height;
        if tip_height < state.start_height {
            state.start_height = tip_height;
            state.start_hash = tip_hash;
        }
        batch.put(CF_HEIGHT, keys::height_key(tip_height), tip_hash.0.to_vec());
        batch.put(CF_STATE, STATE_KEY.to_vec(), state.encode());
        Ok(())
    }

    /// Advances only `start_height`/`start_hash`, used after a completed
    /// rescan (§4.5). Committed by the caller as a single-row batch.
    #[allow(dead_code)]
    fn mark_state(&self, state: &mut IndexState, block: Entry, batch: &mut dyn KvBatch) {
        state.start_height = block.height;
        state.start_hash = block.hash;
        batch.put(CF_STATE, STATE_KEY.to_vec(), state.encode());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MapView, OutPoint, Tx, TxInput, TxOutput};
    use crate::client::ScriptedClient;
    use crate::hash::{AddrHash, Hash160};
    use crate::keys::{CF_ADDR_COIN, CF_ADDR_TX, CF_TX};
    use crate::store::MemoryStore;

    fn entry(height: u32, tag: u8, prev_tag: u8) -> Entry {
        Entry {
            hash: Hash256([tag; 32]),
            height,
            time: height,
            prev: Hash256([prev_tag; 32]),
        }
    }

    fn block_with_tx(tag: u8) -> (Block, Hash256) {
        let txhash = Hash256([tag; 32]);
        let tx = Tx {
            hash: txhash,
            raw: vec![tag],
            is_coinbase: true,
            inputs: vec![],
            outputs: vec![TxOutput {
                value: 50,
                address: Some(AddrHash::Hash160(Hash160([tag; 20]))),
            }],
        };
        (Block { txs: vec![tx] }, txhash)
    }

    async fn open_bootstrapped(client: Arc<ScriptedClient>) -> IndexDb {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let client: Arc<dyn ChainClient> = client;
        let db = IndexDb::open(store, client, &["tx".to_string(), "addr".to_string()], 1, 10_000)
            .await
            .unwrap();
        db.sync_node().await.unwrap();
        db
    }

    #[tokio::test]
    async fn bootstrap_two_blocks_then_connect_third() {
        let client = Arc::new(ScriptedClient::new());
        client.push(entry(0, 10, 0), Block { txs: vec![] });
        client.push(entry(1, 11, 10), Block { txs: vec![] });
        let db = open_bootstrapped(client).await;

        let (block2, txhash2) = block_with_tx(20);
        let e2 = entry(2, 12, 11);
        let mut guard = db.state.lock().await;
        db.dispatch(
            ChainEvent::Connect { entry: e2, block: block2, view: Box::new(MapView::new()) },
            &mut guard,
        )
        .await
        .unwrap();

        let state = guard.unwrap();
        assert_eq!(state.height, 2);
        assert!(db
            .store
            .get(CF_HEIGHT, &keys::height_key(0))
            .await
            .unwrap()
            .is_some());
        assert!(db.store.get(CF_TX, &txhash2.0.to_vec()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn idempotent_replay_of_tip_is_a_noop() {
        let client = Arc::new(ScriptedClient::new());
        client.push(entry(0, 10, 0), Block { txs: vec![] });
        let db = open_bootstrapped(client).await;

        let (block1, txhash1) = block_with_tx(20);
        let e1 = entry(1, 11, 10);
        {
            let mut guard = db.state.lock().await;
            db.dispatch(
                ChainEvent::Connect { entry: e1, block: block1.clone(), view: Box::new(MapView::new()) },
                &mut guard,
            )
            .await
            .unwrap();
        }

        {
            let mut guard = db.state.lock().await;
            db.dispatch(
                ChainEvent::Connect { entry: e1, block: block1, view: Box::new(MapView::new()) },
                &mut guard,
            )
            .await
            .unwrap();
            assert_eq!(guard.unwrap().height, 1);
        }

        let addr = AddrHash::Hash160(Hash160([20u8; 20]));
        let rows = db
            .store
            .scan(CF_ADDR_TX, crate::store::ScanOptions::prefix(&keys::addr_prefix(&addr)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let _ = txhash1;
    }

    #[tokio::test]
    async fn disconnect_then_connect_is_a_one_block_reorg() {
        let client = Arc::new(ScriptedClient::new());
        client.push(entry(0, 10, 0), Block { txs: vec![] });
        let db = open_bootstrapped(client).await;

        let (block_a, txhash_a) = block_with_tx(21);
        let e_a = entry(1, 11, 10);
        {
            let mut guard = db.state.lock().await;
            db.dispatch(
                ChainEvent::Connect { entry: e_a, block: block_a.clone(), view: Box::new(MapView::new()) },
                &mut guard,
            )
            .await
            .unwrap();
        }

        {
            let mut guard = db.state.lock().await;
            db.dispatch(
                ChainEvent::Disconnect { entry: e_a, block: block_a, view: Box::new(MapView::new()) },
                &mut guard,
            )
            .await
            .unwrap();
            assert_eq!(guard.unwrap().height, 0);
        }
        assert!(db.store.get(CF_TX, &txhash_a.0.to_vec()).await.unwrap().is_none());

        let (block_b, txhash_b) = block_with_tx(22);
        let e_b = entry(1, 12, 10);
        {
            let mut guard = db.state.lock().await;
            db.dispatch(
                ChainEvent::Connect { entry: e_b, block: block_b, view: Box::new(MapView::new()) },
                &mut guard,
            )
            .await
            .unwrap();
            assert_eq!(guard.unwrap().height, 1);
        }
        assert!(db.store.get(CF_TX, &txhash_b.0.to_vec()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn genesis_disconnect_is_fatal() {
        let client = Arc::new(ScriptedClient::new());
        client.push(entry(0, 10, 0), Block { txs: vec![] });
        let db = open_bootstrapped(client).await;

        let mut guard = db.state.lock().await;
        let err = db
            .dispatch(
                ChainEvent::Disconnect {
                    entry: entry(0, 10, 0),
                    block: Block { txs: vec![] },
                    view: Box::new(MapView::new()),
                },
                &mut guard,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::BadDisconnect { height: 0, .. }));
        assert_eq!(guard.unwrap().height, 0);
    }

    #[tokio::test]
    async fn gap_forces_scan_via_fresh_chain() {
        let scripted = Arc::new(ScriptedClient::new());
        scripted.push(entry(0, 10, 0), Block { txs: vec![] });

        // Height 1 pays an address; height 2 spends that same coin. The
        // forward catch-up this test forces runs both `tx` and `addr`
        // against an `EmptyView`, so it must get past the spend at height 2
        // without the addr indexer erroring on the unresolved input.
        let coinbase_txhash = Hash256([41u8; 32]);
        let coinbase = Tx {
            hash: coinbase_txhash,
            raw: vec![41],
            is_coinbase: true,
            inputs: vec![],
            outputs: vec![TxOutput { value: 50, address: Some(AddrHash::Hash160(Hash160([41u8; 20]))) }],
        };
        let block1 = Block { txs: vec![coinbase] };
        scripted.push(entry(1, 41, 10), block1.clone());

        let spender = Tx {
            hash: Hash256([42u8; 32]),
            raw: vec![42],
            is_coinbase: false,
            inputs: vec![TxInput { prevout: OutPoint { txhash: coinbase_txhash, index: 0 } }],
            outputs: vec![TxOutput { value: 50, address: Some(AddrHash::Hash160(Hash160([42u8; 20]))) }],
        };
        let block2 = Block { txs: vec![spender] };
        scripted.push(entry(2, 42, 41), block2.clone());

        let (block3, _) = block_with_tx(43);
        scripted.push(entry(3, 43, 42), block3.clone());

        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let client_for_db: Arc<dyn ChainClient> = scripted.clone();
        let db = IndexDb::open(store, client_for_db, &["tx".to_string(), "addr".to_string()], 1, 10_000)
            .await
            .unwrap();

        // Bootstrap against only height 0 by truncating the scripted chain,
        // then restore the rest and deliver a non-contiguous connect.
        scripted.truncate(0);
        db.sync_node().await.unwrap();
        scripted.push(entry(1, 41, 10), block1);
        scripted.push(entry(2, 42, 41), block2);
        scripted.push(entry(3, 43, 42), block3);

        let mut guard = db.state.lock().await;
        db.dispatch(
            ChainEvent::Connect {
                entry: entry(3, 43, 42),
                block: block_with_tx(43).0,
                view: Box::new(MapView::new()),
            },
            &mut guard,
        )
        .await
        .unwrap();
        assert_eq!(guard.unwrap().height, 3);
    }

    #[tokio::test]
    async fn missing_spent_coin_on_disconnect_is_tolerated() {
        let client = Arc::new(ScriptedClient::new());
        client.push(entry(0, 10, 0), Block { txs: vec![] });
        let db = open_bootstrapped(client).await;

        let prevout = OutPoint { txhash: Hash256([99u8; 32]), index: 0 };
        let spent_addr = AddrHash::Hash160(Hash160([1u8; 20]));
        let spender = Tx {
            hash: Hash256([21u8; 32]),
            raw: vec![21],
            is_coinbase: false,
            inputs: vec![TxInput { prevout }],
            outputs: vec![],
        };
        let mut view = MapView::new();
        view.insert(prevout, crate::chain::Coin { value: 1, address: Some(spent_addr) });
        let block = Block { txs: vec![spender] };
        let e1 = entry(1, 21, 10);

        {
            let mut guard = db.state.lock().await;
            db.dispatch(
                ChainEvent::Connect { entry: e1, block: block.clone(), view: Box::new(view) },
                &mut guard,
            )
            .await
            .unwrap();
        }

        let spent_coin_key = keys::addr_coin_key(&spent_addr, &prevout.txhash, prevout.index);
        assert!(db.store.get(CF_ADDR_COIN, &spent_coin_key).await.unwrap().is_none());

        // Disconnecting with a view that can't resolve the spent coin must
        // not fail outright — it just can't restore that coin-edge.
        let mut guard = db.state.lock().await;
        db.dispatch(
            ChainEvent::Disconnect { entry: e1, block, view: Box::new(MapView::new()) },
            &mut guard,
        )
        .await
        .unwrap();
        assert_eq!(guard.unwrap().height, 0);
        assert!(db.store.get(CF_ADDR_COIN, &spent_coin_key).await.unwrap().is_none());
    }
}
