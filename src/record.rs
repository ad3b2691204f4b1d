/// Record encodings for the schema tag, network magic, `IndexState`, and
/// `TxMeta` (§6). Every `encode`/`decode` pair here is exercised by a
/// roundtrip test; these are the only byte layouts the rest of the crate is
/// allowed to depend on.
use byteorder::{ByteOrder, LittleEndian};

use crate::hash::Hash256;
use crate::keys::{SCHEMA_TAG, SCHEMA_VERSION};

/// `R` — the persisted cursor. `height` is the greatest fully-committed
/// height; `start_height`/`start_hash` mark the earliest block the indexes
/// are known-complete from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexState {
    pub start_height: u32,
    pub start_hash: Hash256,
    pub height: u32,
}

impl IndexState {
    pub fn genesis(height: u32, hash: Hash256) -> Self {
        IndexState {
            start_height: height,
            start_hash: hash,
            height,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(40);
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, self.start_height);
        out.extend_from_slice(&buf);
        out.extend_from_slice(&self.start_hash.0);
        LittleEndian::write_u32(&mut buf, self.height);
        out.extend_from_slice(&buf);
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != 40 {
            return None;
        }
        let start_height = LittleEndian::read_u32(&buf[0..4]);
        let start_hash = Hash256::from_slice(&buf[4..36])?;
        let height = LittleEndian::read_u32(&buf[36..40]);
        Some(IndexState {
            start_height,
            start_hash,
            height,
        })
    }
}

/// `BlockMeta` — a compact block handle, used by the client interface and by
/// the alternate single-tip-key encoding documented (but not used) in §6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockMeta {
    pub hash: Hash256,
    pub height: u32,
    pub time: u32,
}

impl BlockMeta {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(40);
        out.extend_from_slice(&self.hash.0);
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, self.height);
        out.extend_from_slice(&buf);
        LittleEndian::write_u32(&mut buf, self.time);
        out.extend_from_slice(&buf);
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != 40 {
            return None;
        }
        let hash = Hash256::from_slice(&buf[0..32])?;
        let height = LittleEndian::read_u32(&buf[32..36]);
        let time = LittleEndian::read_u32(&buf[36..40]);
        Some(BlockMeta { hash, height, time })
    }
}

/// `O` — network magic, 4 bytes little-endian.
pub fn encode_network_magic(magic: u32) -> Vec<u8> {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, magic);
    buf.to_vec()
}

pub fn decode_network_magic(buf: &[u8]) -> Option<u32> {
    if buf.len() != 4 {
        return None;
    }
    Some(LittleEndian::read_u32(buf))
}

/// `V` — schema tag: ASCII tag concatenated with a little-endian version.
pub fn encode_schema_tag() -> Vec<u8> {
    let mut out = SCHEMA_TAG.as_bytes().to_vec();
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, SCHEMA_VERSION);
    out.extend_from_slice(&buf);
    out
}

pub fn decode_schema_tag(buf: &[u8]) -> Option<(String, u32)> {
    if buf.len() < 4 {
        return None;
    }
    let (tag, version) = buf.split_at(buf.len() - 4);
    let tag = std::str::from_utf8(tag).ok()?.to_string();
    Some((tag, LittleEndian::read_u32(version)))
}

/// `t[hash]` — extended transaction record, stored by `TxIndexer`. `raw` is
/// opaque to the core and stored verbatim after the fixed-width header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxMeta {
    pub height: u32,
    pub time: u32,
    pub index: u32,
    pub block_hash: Hash256,
    pub raw: Vec<u8>,
}

impl TxMeta {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + 32 + self.raw.len());
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, self.height);
        out.extend_from_slice(&buf);
        LittleEndian::write_u32(&mut buf, self.time);
        out.extend_from_slice(&buf);
        LittleEndian::write_u32(&mut buf, self.index);
        out.extend_from_slice(&buf);
        out.extend_from_slice(&self.block_hash.0);
        out.extend_from_slice(&self.raw);
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < 44 {
            return None;
        }
        let height = LittleEndian::read_u32(&buf[0..4]);
        let time = LittleEndian::read_u32(&buf[4..8]);
        let index = LittleEndian::read_u32(&buf[8..12]);
        let block_hash = Hash256::from_slice(&buf[12..44])?;
        let raw = buf[44..].to_vec();
        Some(TxMeta {
            height,
            time,
            index,
            block_hash,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_state_roundtrip() {
        let s = IndexState {
            start_height: 10,
            start_hash: Hash256([7u8; 32]),
            height: 42,
        };
        let buf = s.encode();
        assert_eq!(buf.len(), 40);
        assert_eq!(IndexState::decode(&buf), Some(s));
    }

    #[test]
    fn block_meta_roundtrip() {
        let m = BlockMeta {
            hash: Hash256([1u8; 32]),
            height: 5,
            time: 1_600_000_000,
        };
        let buf = m.encode();
        assert_eq!(BlockMeta::decode(&buf), Some(m));
    }

    #[test]
    fn network_magic_roundtrip() {
        let buf = encode_network_magic(0xDEAD_BEEF);
        assert_eq!(decode_network_magic(&buf), Some(0xDEAD_BEEF));
    }

    #[test]
    fn schema_tag_roundtrip() {
        let buf = encode_schema_tag();
        let (tag, version) = decode_schema_tag(&buf).unwrap();
        assert_eq!(tag, "indexers");
        assert_eq!(version, 0);
    }

    #[test]
    fn tx_meta_roundtrip_with_raw_payload() {
        let meta = TxMeta {
            height: 100,
            time: 123,
            index: 2,
            block_hash: Hash256([9u8; 32]),
            raw: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let buf = meta.encode();
        assert_eq!(TxMeta::decode(&buf), Some(meta));
    }
}
