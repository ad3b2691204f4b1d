/// Fixed-width hash and address-hash types
///
/// The core never hashes anything itself — hashes arrive already computed
/// from the chain producer. These are thin newtypes so the rest of the
/// crate can lean on the type system instead of passing `Vec<u8>` around.
use std::fmt;

pub const HASH256_LEN: usize = 32;
pub const HASH160_LEN: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; HASH256_LEN]);

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash160(pub [u8; HASH160_LEN]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; HASH256_LEN]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != HASH256_LEN {
            return None;
        }
        let mut out = [0u8; HASH256_LEN];
        out.copy_from_slice(bytes);
        Some(Hash256(out))
    }
}

impl Hash160 {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != HASH160_LEN {
            return None;
        }
        let mut out = [0u8; HASH160_LEN];
        out.copy_from_slice(bytes);
        Some(Hash160(out))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A 20- or 32-byte output address digest, tagged so every key built from
/// one `AddrHash` shares a single fixed-width prefix regardless of kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum AddrHash {
    Hash160(Hash160),
    Hash256(Hash256),
}

impl AddrHash {
    const KIND_160: u8 = 0;
    const KIND_256: u8 = 1;

    /// Encoded length including the leading kind byte.
    pub fn encoded_len(&self) -> usize {
        match self {
            AddrHash::Hash160(_) => 1 + HASH160_LEN,
            AddrHash::Hash256(_) => 1 + HASH256_LEN,
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            AddrHash::Hash160(h) => {
                out.push(Self::KIND_160);
                out.extend_from_slice(&h.0);
            }
            AddrHash::Hash256(h) => {
                out.push(Self::KIND_256);
                out.extend_from_slice(&h.0);
            }
        }
    }

    /// Parse an `AddrHash` from the front of `buf`, returning the remaining
    /// bytes. Returns `None` on truncated or unrecognized input.
    pub fn read_from(buf: &[u8]) -> Option<(Self, &[u8])> {
        let (&kind, rest) = buf.split_first()?;
        match kind {
            Self::KIND_160 => {
                if rest.len() < HASH160_LEN {
                    return None;
                }
                let (head, tail) = rest.split_at(HASH160_LEN);
                Some((AddrHash::Hash160(Hash160::from_slice(head)?), tail))
            }
            Self::KIND_256 => {
                if rest.len() < HASH256_LEN {
                    return None;
                }
                let (head, tail) = rest.split_at(HASH256_LEN);
                Some((AddrHash::Hash256(Hash256::from_slice(head)?), tail))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_hash_roundtrip_160() {
        let a = AddrHash::Hash160(Hash160([7u8; 20]));
        let mut buf = Vec::new();
        a.write_to(&mut buf);
        assert_eq!(buf.len(), a.encoded_len());
        let (parsed, rest) = AddrHash::read_from(&buf).unwrap();
        assert_eq!(parsed, a);
        assert!(rest.is_empty());
    }

    #[test]
    fn addr_hash_roundtrip_256() {
        let a = AddrHash::Hash256(Hash256([9u8; 32]));
        let mut buf = Vec::new();
        a.write_to(&mut buf);
        buf.extend_from_slice(b"trailer");
        let (parsed, rest) = AddrHash::read_from(&buf).unwrap();
        assert_eq!(parsed, a);
        assert_eq!(rest, b"trailer");
    }

    #[test]
    fn hash256_from_slice_rejects_wrong_length() {
        assert!(Hash256::from_slice(&[0u8; 31]).is_none());
        assert!(Hash256::from_slice(&[0u8; 32]).is_some());
    }
}
