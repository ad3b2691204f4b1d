/// Chain-producer-facing value types (§4.1, GLOSSARY).
///
/// These are the shapes the core receives from whatever sits upstream of
/// it. The core never constructs a `Block` or resolves a script itself; it
/// only ever receives these already-resolved from the producer.
use crate::hash::{AddrHash, Hash256};

/// The producer's lightweight handle for a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub hash: Hash256,
    pub height: u32,
    pub time: u32,
    pub prev: Hash256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutPoint {
    pub txhash: Hash256,
    pub index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub address: Option<AddrHash>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub prevout: OutPoint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    pub hash: Hash256,
    pub raw: Vec<u8>,
    pub is_coinbase: bool,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub txs: Vec<Tx>,
}

/// A previously created, possibly already-spent output — what `CoinView`
/// resolves a `TxInput`'s `prevout` to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub value: u64,
    pub address: Option<AddrHash>,
}

/// Lookup from outpoint to originating output, used to resolve spent inputs
/// for address indexing. The producer supplies a populated view on
/// `Connect`/`Disconnect`; `scan()` falls back to `EmptyView` during
/// catch-up (§4.5, §9).
pub trait CoinView: Send + Sync {
    fn get_output(&self, outpoint: &OutPoint) -> Option<Coin>;
}

pub struct EmptyView;

impl CoinView for EmptyView {
    fn get_output(&self, _outpoint: &OutPoint) -> Option<Coin> {
        None
    }
}

/// Test/tool-friendly view backed by an explicit map, used by the
/// `ScriptedClient` harness and by tests exercising disconnect.
#[derive(Default)]
pub struct MapView {
    coins: std::collections::HashMap<OutPoint, Coin>,
}

impl MapView {
    pub fn new() -> Self {
        MapView {
            coins: std::collections::HashMap::new(),
        }
    }

    pub fn insert(&mut self, outpoint: OutPoint, coin: Coin) {
        self.coins.insert(outpoint, coin);
    }
}

impl std::hash::Hash for OutPoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.txhash.hash(state);
        self.index.hash(state);
    }
}

impl CoinView for MapView {
    fn get_output(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.get(outpoint).cloned()
    }
}

/// Selector used by `ChainClient::get_entry`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeightOrHash {
    Height(u32),
    Hash(Hash256),
}

impl From<u32> for HeightOrHash {
    fn from(height: u32) -> Self {
        HeightOrHash::Height(height)
    }
}

impl From<Hash256> for HeightOrHash {
    fn from(hash: Hash256) -> Self {
        HeightOrHash::Hash(hash)
    }
}

/// Events the producer pushes into `IndexDb` (§4.1).
pub enum ChainEvent {
    Connect {
        entry: Entry,
        block: Block,
        view: Box<dyn CoinView>,
    },
    Disconnect {
        entry: Entry,
        block: Block,
        view: Box<dyn CoinView>,
    },
    Reset {
        tip: Entry,
    },
    Tx {
        tx: Tx,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash160;

    #[test]
    fn map_view_resolves_inserted_outpoint() {
        let mut view = MapView::new();
        let outpoint = OutPoint {
            txhash: Hash256([1u8; 32]),
            index: 0,
        };
        view.insert(
            outpoint,
            Coin {
                value: 100,
                address: Some(AddrHash::Hash160(Hash160([2u8; 20]))),
            },
        );
        assert!(view.get_output(&outpoint).is_some());
        assert!(view
            .get_output(&OutPoint {
                txhash: Hash256([9u8; 32]),
                index: 0
            })
            .is_none());
    }

    #[test]
    fn empty_view_never_resolves() {
        let view = EmptyView;
        assert!(view
            .get_output(&OutPoint {
                txhash: Hash256::ZERO,
                index: 0
            })
            .is_none());
    }
}
