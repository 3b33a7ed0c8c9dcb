//! Procedure Names, Selectors and Code Locations
//!
//! A procedure is addressed by a fixed 24-byte ASCII key, null padded. The
//! function inside the procedure's module is picked by a 4-byte selector
//! derived from a human-readable signature string.
//!
//! # Security Properties
//! - The all-zero key terminates the table encoding and can never name a
//!   procedure; `ProcedureKey::new` refuses to build it
//! - Keys are compared byte-for-byte, padding included

use core::fmt;

use sha2::{Digest, Sha256};

use super::word::{Word, WORD_LEN};

/// Length of a procedure key in bytes.
pub const KEY_LEN: usize = 24;

/// Length of a function selector in bytes.
pub const SELECTOR_LEN: usize = 4;

/// Error type for key construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// The name is empty (it would encode as the reserved null key).
    Empty,
    /// The name does not fit in 24 bytes.
    TooLong,
    /// The name contains a non-ASCII byte.
    NotAscii,
    /// The name contains a NUL byte before its end.
    InteriorNul,
    /// A word carrying a key has bits set below the 24 key bytes.
    Misaligned,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "procedure name is empty"),
            Self::TooLong => write!(f, "procedure name exceeds {} bytes", KEY_LEN),
            Self::NotAscii => write!(f, "procedure name is not ASCII"),
            Self::InteriorNul => write!(f, "procedure name contains a NUL byte"),
            Self::Misaligned => write!(f, "word does not hold a left-aligned key"),
        }
    }
}

/// A procedure name: 24 ASCII bytes, null padded on the right.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ProcedureKey([u8; KEY_LEN]);

impl ProcedureKey {
    /// The reserved end-of-table sentinel.
    pub const NULL: Self = Self([0; KEY_LEN]);

    /// Build a key from a human-readable name.
    pub fn new(name: &str) -> Result<Self, KeyError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        if bytes.len() > KEY_LEN {
            return Err(KeyError::TooLong);
        }
        if !bytes.is_ascii() {
            return Err(KeyError::NotAscii);
        }
        if bytes.contains(&0) {
            return Err(KeyError::InteriorNul);
        }
        let mut key = [0u8; KEY_LEN];
        key[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// The fixed-width, null-padded name.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Check for the reserved sentinel.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == [0; KEY_LEN]
    }

    /// The name with its padding stripped.
    pub fn name(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(KEY_LEN);
        core::str::from_utf8(&self.0[..end]).unwrap_or("<invalid>")
    }

    /// Left-align the key in a word; the low 8 bytes are zero.
    pub fn to_word(self) -> Word {
        let mut bytes = [0u8; WORD_LEN];
        bytes[..KEY_LEN].copy_from_slice(&self.0);
        Word::from_bytes(bytes)
    }

    /// Recover a key from its word form.
    ///
    /// The all-zero word yields [`ProcedureKey::NULL`]; callers decide
    /// whether the sentinel is acceptable where they read it.
    pub fn from_word(word: &Word) -> Result<Self, KeyError> {
        let bytes = word.as_bytes();
        if bytes[KEY_LEN..].iter().any(|&b| b != 0) {
            return Err(KeyError::Misaligned);
        }
        let name = &bytes[..KEY_LEN];
        if !name.is_ascii() {
            return Err(KeyError::NotAscii);
        }
        // Padding is NUL all the way to the end.
        let end = name.iter().position(|&b| b == 0).unwrap_or(KEY_LEN);
        if name[end..].iter().any(|&b| b != 0) {
            return Err(KeyError::InteriorNul);
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(name);
        Ok(Self(key))
    }
}

impl fmt::Display for ProcedureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for ProcedureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcedureKey({:?})", self.name())
    }
}

/// A 4-byte function selector.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Selector([u8; SELECTOR_LEN]);

impl Selector {
    /// Wrap raw selector bytes.
    #[inline]
    pub const fn new(bytes: [u8; SELECTOR_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the selector of a signature such as `"store(uint256)"`:
    /// the first four bytes of its SHA-256 digest.
    pub fn from_signature(signature: &str) -> Self {
        let digest = Sha256::digest(signature.as_bytes());
        let mut bytes = [0u8; SELECTOR_LEN];
        bytes.copy_from_slice(&digest[..SELECTOR_LEN]);
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; SELECTOR_LEN] {
        &self.0
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({:#010x})", u32::from_be_bytes(self.0))
    }
}

/// Reference to a code module, resolved by the host.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Location(Word);

impl Location {
    #[inline]
    pub const fn new(word: Word) -> Self {
        Self(word)
    }

    #[inline]
    pub const fn as_word(&self) -> &Word {
        &self.0
    }
}

impl From<u64> for Location {
    fn from(value: u64) -> Self {
        Self(Word::from_u64(value))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_padding() {
        let key = ProcedureKey::new("ProcA").unwrap();
        assert_eq!(&key.as_bytes()[..5], b"ProcA");
        assert!(key.as_bytes()[5..].iter().all(|&b| b == 0));
        assert_eq!(key.name(), "ProcA");
    }

    #[test]
    fn test_key_rejects_bad_names() {
        assert_eq!(ProcedureKey::new(""), Err(KeyError::Empty));
        assert_eq!(
            ProcedureKey::new("abcdefghijklmnopqrstuvwxy"),
            Err(KeyError::TooLong)
        );
        assert_eq!(ProcedureKey::new("caf\u{e9}"), Err(KeyError::NotAscii));
        assert_eq!(ProcedureKey::new("a\0b"), Err(KeyError::InteriorNul));
        assert!(ProcedureKey::new("abcdefghijklmnopqrstuvwx").is_ok());
    }

    #[test]
    fn test_key_word_alignment() {
        let key = ProcedureKey::new("writer").unwrap();
        let word = key.to_word();
        assert_eq!(&word.as_bytes()[..6], b"writer");
        assert_eq!(ProcedureKey::from_word(&word), Ok(key));
        assert_eq!(
            ProcedureKey::from_word(&Word::from(1u64)),
            Err(KeyError::Misaligned)
        );
    }

    #[test]
    fn test_key_word_rejects_malformed_names() {
        let mut bytes = [0u8; WORD_LEN];
        bytes[..3].copy_from_slice(b"a\0b");
        assert_eq!(
            ProcedureKey::from_word(&Word::from_bytes(bytes)),
            Err(KeyError::InteriorNul)
        );

        let mut bytes = [0u8; WORD_LEN];
        bytes[..2].copy_from_slice(b"a\xff");
        assert_eq!(
            ProcedureKey::from_word(&Word::from_bytes(bytes)),
            Err(KeyError::NotAscii)
        );

        assert_eq!(
            ProcedureKey::from_word(&Word::ZERO),
            Ok(ProcedureKey::NULL)
        );
    }

    #[test]
    fn test_selector_is_stable() {
        let a = Selector::from_signature("store(uint256)");
        let b = Selector::from_signature("store(uint256)");
        let c = Selector::from_signature("load(uint256)");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
