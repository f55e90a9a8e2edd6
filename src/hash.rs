//! 256-bit identifiers for blocks and game transactions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// The all-zero value.
            #[must_use]
            pub const fn zero() -> Self {
                Self([0; 32])
            }

            /// Whether this is the all-zero value.
            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0 == [0; 32]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..8]))
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }
    };
}

hash_type!(
    /// Hash of a block, supplied by the ledger.
    BlockHash
);

hash_type!(
    /// Deterministic identifier of a game transaction.
    TxId
);

impl BlockHash {
    /// Derive a reproducible block hash from arbitrary bytes.
    ///
    /// Used by simulations and tests that have no real ledger.
    #[must_use]
    pub fn derive(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"huntercore/blockhash/v1");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let h = BlockHash::from_bytes([0xab; 32]);
        let s = h.to_string();
        assert_eq!(s.len(), 64);
        assert_eq!(s.parse::<BlockHash>().unwrap(), h);
        assert!("zz".parse::<TxId>().is_err());
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = BlockHash::derive(&[b"chain", &1u32.to_le_bytes()]);
        let b = BlockHash::derive(&[b"chain", &1u32.to_le_bytes()]);
        let c = BlockHash::derive(&[b"chain", &2u32.to_le_bytes()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
        assert!(BlockHash::zero().is_zero());
    }
}
