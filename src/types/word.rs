//! Fixed-Width Words
//!
//! The storage keyspace, capability parameters and both wire encodings are
//! built from 256-bit words. `Word` keeps them big-endian so that the
//! derived byte ordering is also the numeric ordering.
//!
//! # Security Properties
//! - Range ends are computed with `checked_add`; overflow is reported,
//!   never wrapped
//! - Narrowing conversions are fallible

use core::fmt;

/// Width of a word in bytes.
pub const WORD_LEN: usize = 32;

/// A 256-bit unsigned big-endian word.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Word([u8; WORD_LEN]);

impl Word {
    /// The zero word.
    pub const ZERO: Self = Self([0; WORD_LEN]);

    /// The largest representable word.
    pub const MAX: Self = Self([0xFF; WORD_LEN]);

    /// Create a word from its big-endian bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; WORD_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a word holding a `u64`.
    pub const fn from_u64(value: u64) -> Self {
        let src = value.to_be_bytes();
        let mut bytes = [0u8; WORD_LEN];
        let mut i = 0;
        while i < src.len() {
            bytes[WORD_LEN - src.len() + i] = src[i];
            i += 1;
        }
        Self(bytes)
    }

    /// Big-endian bytes of this word.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; WORD_LEN] {
        &self.0
    }

    /// Consume the word and return its bytes.
    #[inline]
    pub const fn to_bytes(self) -> [u8; WORD_LEN] {
        self.0
    }

    /// Check if every byte is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Narrow to a `u64`, failing if any high byte is set.
    pub fn to_u64(&self) -> Option<u64> {
        let (high, low) = self.0.split_at(WORD_LEN - 8);
        if high.iter().any(|&b| b != 0) {
            return None;
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(low);
        Some(u64::from_be_bytes(buf))
    }

    /// Narrow to a `usize`, failing if the value does not fit.
    pub fn to_usize(&self) -> Option<usize> {
        self.to_u64().and_then(|v| usize::try_from(v).ok())
    }

    /// Add two words, returning `None` on overflow past 2^256 - 1.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let mut out = [0u8; WORD_LEN];
        let mut carry = 0u16;
        for i in (0..WORD_LEN).rev() {
            let sum = self.0[i] as u16 + rhs.0[i] as u16 + carry;
            out[i] = sum as u8;
            carry = sum >> 8;
        }
        if carry != 0 {
            None
        } else {
            Some(Self(out))
        }
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u128> for Word {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; WORD_LEN];
        bytes[WORD_LEN - 16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<[u8; WORD_LEN]> for Word {
    fn from(bytes: [u8; WORD_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.0.iter().position(|&b| b != 0) else {
            return write!(f, "0x0");
        };
        write!(f, "0x{:x}", self.0[first])?;
        for byte in &self.0[first + 1..] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", self)
    }
}
