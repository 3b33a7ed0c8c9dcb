//! Procedure Table Wire Encoding
//!
//! ```text
//! [key, index, location, capCount, capBlocks...]  per live procedure
//! [0]                                             end-of-table sentinel
//! ```
//!
//! `key` is the left-aligned procedure name, `capCount` the number of
//! capability blocks that follow (see [`crate::cap::codec`]). A zero key
//! ends the table, which is why zero can never name a procedure.

use alloc::vec::Vec;
use core::fmt;

use super::{ProcedureTable, TableError};
use crate::cap::codec::{self as cap_codec, CodecError};
use crate::cap::CapabilityList;
use crate::types::{KeyError, Location, ProcedureKey, Word};

/// Error type for table decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCodecError {
    /// The input ends before the sentinel.
    Truncated { offset: usize },
    /// A key word is not a valid key.
    BadKey { offset: usize, error: KeyError },
    /// An index word disagrees with the record's position.
    IndexMismatch { offset: usize },
    /// A capability block failed to decode.
    Capability(CodecError),
    /// The records violate a table rule (duplicate key).
    Table(TableError),
    /// Words follow the sentinel.
    Trailing { offset: usize },
}

impl fmt::Display for TableCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { offset } => write!(f, "table truncated at word {}", offset),
            Self::BadKey { offset, error } => write!(f, "bad key at word {}: {}", offset, error),
            Self::IndexMismatch { offset } => write!(f, "index mismatch at word {}", offset),
            Self::Capability(e) => write!(f, "{}", e),
            Self::Table(e) => write!(f, "{}", e),
            Self::Trailing { offset } => write!(f, "unexpected words after sentinel at word {}", offset),
        }
    }
}

impl From<CodecError> for TableCodecError {
    fn from(e: CodecError) -> Self {
        Self::Capability(e)
    }
}

/// Encode every live procedure followed by the sentinel.
pub fn encode(table: &ProcedureTable) -> Vec<Word> {
    let mut out = Vec::new();
    for record in table.iter() {
        out.push(record.key().to_word());
        out.push(Word::from(record.index() as u64));
        out.push(*record.location().as_word());
        out.push(Word::from(record.capabilities().len() as u64));
        for cap in record.capabilities() {
            cap_codec::encode_into(cap, &mut out);
        }
    }
    out.push(Word::ZERO);
    out
}

/// Rebuild a table from its encoding.
pub fn decode(words: &[Word]) -> Result<ProcedureTable, TableCodecError> {
    let mut table = ProcedureTable::new();
    let mut cursor = 0;

    loop {
        let key_word = words
            .get(cursor)
            .ok_or(TableCodecError::Truncated { offset: cursor })?;
        if key_word.is_zero() {
            cursor += 1;
            break;
        }
        let key = ProcedureKey::from_word(key_word)
            .map_err(|error| TableCodecError::BadKey { offset: cursor, error })?;

        let header = words
            .get(cursor + 1..cursor + 4)
            .ok_or(TableCodecError::Truncated { offset: cursor })?;
        if header[0].to_usize() != Some(table.len() + 1) {
            return Err(TableCodecError::IndexMismatch { offset: cursor + 1 });
        }
        let location = Location::new(header[1]);
        let count = header[2]
            .to_usize()
            .ok_or(TableCodecError::Truncated { offset: cursor + 3 })?;

        let (caps, next) = cap_codec::decode_blocks(words, cursor + 4, count)?;
        table
            .create(key, location, CapabilityList::from(caps))
            .map_err(TableCodecError::Table)?;
        cursor = next;
    }

    if cursor != words.len() {
        return Err(TableCodecError::Trailing { offset: cursor });
    }
    Ok(table)
}
