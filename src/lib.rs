//! XELIS memory-hard proof-of-work hash family.
//!
//! Three generations of the same fill -> mix -> finalize construction. Each
//! version expands the input into a caller-owned scratchpad that is large
//! relative to on-die cache, then runs a data-dependent mixing loop over it
//! (integer arithmetic, 128-bit multiplies, rotations and a single AES round
//! per step), and derives a 32-byte digest.
//!
//! The scratchpad is reusable: every fill stage obliterates whatever a
//! previous invocation left behind, so a miner keeps one pad per worker.
//!
//! ```
//! let mut pad = xelishash::v2::ScratchPad::default();
//! let digest = xelishash::v2::hash(b"block header bytes", &mut pad);
//! println!("{digest}");
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error as ThisError;

pub mod v1;
pub mod v2;
pub mod v3;

mod fill;
mod math;
mod scratchpad;

pub use scratchpad::ScratchPad;

// Number of bytes in a digest
pub const HASH_SIZE: usize = 32;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("input does not fit the padded v1 block")]
    InvalidInputLength,
    #[error("invalid hash")]
    InvalidHash,
}

// A 32-byte digest. Comparison and hex formatting are all it supports.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    // Parse from exactly 64 lowercase or uppercase hex digits
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        if s.len() != HASH_SIZE * 2 {
            return Err(Error::InvalidHash);
        }

        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| Error::InvalidHash)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; HASH_SIZE] {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self, Error> {
        let bytes = <[u8; HASH_SIZE]>::try_from(data).map_err(|_| Error::InvalidHash)?;
        Ok(Self(bytes))
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let mut bytes = [0u8; HASH_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8 * 7;
        }

        let hash = Hash::from(bytes);
        let parsed = Hash::from_hex(&hash.to_string()).unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(parsed.as_bytes(), &bytes);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        // wrong length
        assert!(Hash::from_hex("ab").is_err());
        assert!(Hash::from_hex(&"ab".repeat(33)).is_err());
        // right length, not hex
        assert!(Hash::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn try_from_checks_the_length() {
        assert!(Hash::try_from([1u8; HASH_SIZE].as_slice()).is_ok());
        assert!(Hash::try_from([1u8; 31].as_slice()).is_err());
        assert!(Hash::try_from([1u8; 33].as_slice()).is_err());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let hash = Hash::from([0xABu8; HASH_SIZE]);
        assert_eq!(hash.to_string(), "ab".repeat(32));
        assert_eq!("ab".repeat(32).parse::<Hash>().unwrap(), hash);
    }
}
