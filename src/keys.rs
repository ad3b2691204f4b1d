/// Key-schema tags and composite-key builders (§3, §6).
///
/// Every persisted key starts with one of these tag bytes, so a prefix scan
/// for a whole record kind (or everything under one address) is just a
/// `ScanOptions::prefix` call against the tag plus whatever fields are
/// already known. Column families double the tag bytes as CF names so a
/// given record kind lives in its own CF as well as its own key range —
/// belt and suspenders, grounded on the teacher's `tx_keys.rs` convention of
/// keeping one byte prefix per record kind.
use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::hash::{AddrHash, Hash256};

pub const CF_SCHEMA: &str = "V";
pub const CF_NETWORK: &str = "O";
pub const CF_STATE: &str = "R";
pub const CF_HEIGHT: &str = "h";
pub const CF_TX: &str = "t";
pub const CF_ADDR_TX: &str = "T";
pub const CF_ADDR_COIN: &str = "C";

/// Per-height undo log, internal to `IndexDb`: not part of the distilled
/// key schema, added so `rollback` can invert a block's indexer writes
/// without depending on the chain producer still recognizing it (the
/// producer may have long forgotten a height the core is rewinding past).
pub const CF_UNDO: &str = "u";

pub const SCHEMA_TAG: &str = "indexers";
pub const SCHEMA_VERSION: u32 = 0;

pub const STATE_KEY: &[u8] = b"R";
pub const NETWORK_KEY: &[u8] = b"O";
pub const SCHEMA_KEY: &[u8] = b"V";

/// `h[height]` — big-endian so the CF iterates in height order.
pub fn height_key(height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    out.write_u32_be(height);
    out
}

pub fn decode_height_key(key: &[u8]) -> Option<u32> {
    if key.len() != 4 {
        return None;
    }
    Some(BigEndian::read_u32(key))
}

/// `t[hash]`.
pub fn tx_key(hash: &Hash256) -> Vec<u8> {
    hash.0.to_vec()
}

/// `T[addr, txhash]`.
pub fn addr_tx_key(addr: &AddrHash, txhash: &Hash256) -> Vec<u8> {
    let mut out = Vec::with_capacity(addr.encoded_len() + 32);
    addr.write_to(&mut out);
    out.extend_from_slice(&txhash.0);
    out
}

/// `C[addr, txhash, vout]` — `vout` big-endian so a whole address's coins
/// iterate grouped by tx in a stable order.
pub fn addr_coin_key(addr: &AddrHash, txhash: &Hash256, vout: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(addr.encoded_len() + 32 + 4);
    addr.write_to(&mut out);
    out.extend_from_slice(&txhash.0);
    out.write_u32_be(vout);
    out
}

/// Smallest/largest key sharing `addr`'s prefix within its CF — used to scan
/// every `T`/`C` row for one address.
pub fn addr_prefix(addr: &AddrHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(addr.encoded_len());
    addr.write_to(&mut out);
    out
}

trait WriteU32Be {
    fn write_u32_be(&mut self, v: u32);
}

impl WriteU32Be for Vec<u8> {
    fn write_u32_be(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, v);
        self.extend_from_slice(&buf);
    }
}

/// Scalar u32 fields that are never range-scanned (e.g. inside `TxMeta`) use
/// little-endian, matching the teacher's convention for non-key scalars.
pub fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, v);
    out.extend_from_slice(&buf);
}

pub fn read_u32_le(buf: &[u8]) -> Option<(u32, &[u8])> {
    if buf.len() < 4 {
        return None;
    }
    let (head, tail) = buf.split_at(4);
    Some((LittleEndian::read_u32(head), tail))
}
