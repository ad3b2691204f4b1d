/// Chain producer adapter contract (§4.1).
///
/// `ChainClient` is the query half of the producer relationship; the event
/// half arrives over the `mpsc` channel `IndexDb::run` consumes. `NullClient`
/// answers every query with nothing, for isolated unit tests that never
/// reach `sync_chain`. `ScriptedClient` replays a fixed in-memory chain and
/// lets a test mutate it and push events, used by the reorg/rescan suite.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::chain::{Block, Entry, HeightOrHash};
use crate::error::IndexError;
use crate::hash::Hash256;

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_entry(&self, selector: HeightOrHash) -> Result<Option<Entry>, IndexError>;
    async fn get_block(&self, hash: Hash256) -> Result<Block, IndexError>;
    async fn get_next(&self, entry: &Entry) -> Result<Option<Entry>, IndexError>;
    async fn get_hashes(&self, start: u32, end: u32) -> Result<Vec<Hash256>, IndexError>;
    async fn get_tip(&self) -> Result<Entry, IndexError>;
}

/// Satisfies the contract with no events and empty queries.
pub struct NullClient;

#[async_trait]
impl ChainClient for NullClient {
    async fn get_entry(&self, _selector: HeightOrHash) -> Result<Option<Entry>, IndexError> {
        Ok(None)
    }

    async fn get_block(&self, hash: Hash256) -> Result<Block, IndexError> {
        Err(IndexError::Client(format!("NullClient has no blocks ({:?})", hash)))
    }

    async fn get_next(&self, _entry: &Entry) -> Result<Option<Entry>, IndexError> {
        Ok(None)
    }

    async fn get_hashes(&self, _start: u32, _end: u32) -> Result<Vec<Hash256>, IndexError> {
        Ok(Vec::new())
    }

    async fn get_tip(&self) -> Result<Entry, IndexError> {
        Err(IndexError::Client("NullClient has no tip".into()))
    }
}

struct ScriptedState {
    entries_by_height: HashMap<u32, Entry>,
    entries_by_hash: HashMap<Hash256, Entry>,
    blocks: HashMap<Hash256, Block>,
    tip_height: u32,
}

/// In-memory chain a test can mutate (`connect_entry`/`disconnect_tip`)
/// independently of the events it later pushes through the channel, so the
/// sync loop's idea of "what does the producer currently recognize" can be
/// exercised deterministically.
pub struct ScriptedClient {
    state: Mutex<ScriptedState>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        ScriptedClient {
            state: Mutex::new(ScriptedState {
                entries_by_height: HashMap::new(),
                entries_by_hash: HashMap::new(),
                blocks: HashMap::new(),
                tip_height: 0,
            }),
        }
    }

    /// Appends `entry`/`block` as the new tip. Panics if `entry.height` isn't
    /// exactly one past the current tip — scripted tests build the chain in
    /// order.
    pub fn push(&self, entry: Entry, block: Block) {
        let mut state = self.state.lock().unwrap();
        state.entries_by_height.insert(entry.height, entry);
        state.entries_by_hash.insert(entry.hash, entry);
        state.blocks.insert(entry.hash, block);
        if entry.height > state.tip_height || state.entries_by_height.len() == 1 {
            state.tip_height = entry.height;
        }
    }

    /// Discards every entry/block above `height`, simulating the producer
    /// forgetting a reorged-away suffix.
    pub fn truncate(&self, height: u32) {
        let mut state = self.state.lock().unwrap();
        let stale: Vec<u32> = state
            .entries_by_height
            .keys()
            .filter(|h| **h > height)
            .copied()
            .collect();
        for h in stale {
            if let Some(entry) = state.entries_by_height.remove(&h) {
                state.entries_by_hash.remove(&entry.hash);
                state.blocks.remove(&entry.hash);
            }
        }
        state.tip_height = height;
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for ScriptedClient {
    async fn get_entry(&self, selector: HeightOrHash) -> Result<Option<Entry>, IndexError> {
        let state = self.state.lock().unwrap();
        Ok(match selector {
            HeightOrHash::Height(h) => state.entries_by_height.get(&h).copied(),
            HeightOrHash::Hash(hash) => state.entries_by_hash.get(&hash).copied(),
        })
    }

    async fn get_block(&self, hash: Hash256) -> Result<Block, IndexError> {
        let state = self.state.lock().unwrap();
        state
            .blocks
            .get(&hash)
            .cloned()
            .ok_or_else(|| IndexError::Client(format!("no such block: {:?}", hash)))
    }

    async fn get_next(&self, entry: &Entry) -> Result<Option<Entry>, IndexError> {
        let state = self.state.lock().unwrap();
        Ok(state.entries_by_height.get(&(entry.height + 1)).copied())
    }

    async fn get_hashes(&self, start: u32, end: u32) -> Result<Vec<Hash256>, IndexError> {
        let state = self.state.lock().unwrap();
        let mut out = Vec::new();
        for h in start..=end {
            match state.entries_by_height.get(&h) {
                Some(entry) => out.push(entry.hash),
                None => break,
            }
        }
        Ok(out)
    }

    async fn get_tip(&self) -> Result<Entry, IndexError> {
        let state = self.state.lock().unwrap();
        state
            .entries_by_height
            .get(&state.tip_height)
            .copied()
            .ok_or_else(|| IndexError::Client("ScriptedClient has no tip yet".into()))
    }
}
