//! Capability Wire Encoding
//!
//! A capability list travels as a flat word sequence with one block per
//! capability:
//!
//! ```text
//! [len, type, v0, v1, ..., v(len-2)]
//! ```
//!
//! `len` counts the type word plus the values. Blocks are concatenated
//! with no terminator; the consumer bounds the list (by total length, or
//! by a block count as the procedure table encoding does).
//!
//! | type | id | values                      |
//! |------|----|-----------------------------|
//! | Call      | 3 | procedure keys (0 = any) |
//! | Register  | 4 | procedure keys (0 = any) |
//! | Delete    | 5 | procedure keys (0 = any) |
//! | SetEntry  | 6 | none                     |
//! | Write     | 7 | address, size            |
//! | Log       | 8 | 0..=4 topics             |

use alloc::vec::Vec;
use core::fmt;

use super::capability::{Capability, CapabilityType, MAX_LOG_TOPICS};
use crate::types::{KeyError, ProcedureKey, Word};

/// Error type for capability decoding.
///
/// Offsets are word positions in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The input ends inside a block.
    Truncated { offset: usize },
    /// A block declares length zero (no room for the type word).
    ZeroLength { offset: usize },
    /// The type word is not a known capability type.
    UnknownType { offset: usize },
    /// The value count does not fit the capability type.
    BadArity {
        offset: usize,
        cap_type: CapabilityType,
        values: usize,
    },
    /// A value that should be a procedure key is not one.
    BadKey { offset: usize, error: KeyError },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { offset } => write!(f, "capability block truncated at word {}", offset),
            Self::ZeroLength { offset } => write!(f, "zero-length capability block at word {}", offset),
            Self::UnknownType { offset } => write!(f, "unknown capability type at word {}", offset),
            Self::BadArity {
                offset,
                cap_type,
                values,
            } => write!(
                f,
                "{:?} capability at word {} cannot take {} values",
                cap_type, offset, values
            ),
            Self::BadKey { offset, error } => write!(f, "bad procedure key at word {}: {}", offset, error),
        }
    }
}

/// Number of words `cap` occupies on the wire.
pub fn encoded_len(cap: &Capability) -> usize {
    2 + value_count(cap)
}

fn value_count(cap: &Capability) -> usize {
    match cap {
        Capability::Write { .. } => 2,
        Capability::Log { topics } => topics.len(),
        Capability::Call { procedures }
        | Capability::Delete { procedures }
        | Capability::Register { procedures } => procedures.len(),
        Capability::SetEntry => 0,
    }
}

/// Append the block for one capability.
pub fn encode_into(cap: &Capability, out: &mut Vec<Word>) {
    out.reserve(encoded_len(cap));
    out.push(Word::from(value_count(cap) as u64 + 1));
    out.push(Word::from(cap.cap_type().id() as u64));
    match cap {
        Capability::Write { address, size } => {
            out.push(*address);
            out.push(*size);
        }
        Capability::Log { topics } => out.extend_from_slice(topics),
        Capability::Call { procedures }
        | Capability::Delete { procedures }
        | Capability::Register { procedures } => {
            out.extend(procedures.iter().map(|key| key.to_word()));
        }
        Capability::SetEntry => {}
    }
}

/// Encode a capability list.
pub fn encode<'a>(caps: impl IntoIterator<Item = &'a Capability>) -> Vec<Word> {
    let mut out = Vec::new();
    for cap in caps {
        encode_into(cap, &mut out);
    }
    out
}

/// Decode one block starting at `words[offset]`.
///
/// Returns the capability and the offset just past its block.
pub fn decode_at(words: &[Word], offset: usize) -> Result<(Capability, usize), CodecError> {
    let len = words
        .get(offset)
        .ok_or(CodecError::Truncated { offset })?
        .to_usize()
        .ok_or(CodecError::Truncated { offset })?;
    if len == 0 {
        return Err(CodecError::ZeroLength { offset });
    }
    let end = len
        .checked_add(1)
        .and_then(|block| offset.checked_add(block))
        .filter(|&end| end <= words.len())
        .ok_or(CodecError::Truncated { offset })?;

    let type_word = &words[offset + 1];
    let cap_type = type_word
        .to_u64()
        .and_then(CapabilityType::from_id)
        .ok_or(CodecError::UnknownType { offset })?;

    let values = &words[offset + 2..end];
    let bad_arity = CodecError::BadArity {
        offset,
        cap_type,
        values: values.len(),
    };

    let cap = match cap_type {
        CapabilityType::Write => match values {
            [address, size] => Capability::Write {
                address: *address,
                size: *size,
            },
            _ => return Err(bad_arity),
        },
        CapabilityType::Log => {
            if values.len() > MAX_LOG_TOPICS {
                return Err(bad_arity);
            }
            Capability::Log {
                topics: values.to_vec(),
            }
        }
        CapabilityType::SetEntry => {
            if !values.is_empty() {
                return Err(bad_arity);
            }
            Capability::SetEntry
        }
        CapabilityType::Call => Capability::Call {
            procedures: decode_keys(values, offset + 2)?,
        },
        CapabilityType::Delete => Capability::Delete {
            procedures: decode_keys(values, offset + 2)?,
        },
        CapabilityType::Register => Capability::Register {
            procedures: decode_keys(values, offset + 2)?,
        },
    };

    Ok((cap, end))
}

fn decode_keys(values: &[Word], base: usize) -> Result<Vec<ProcedureKey>, CodecError> {
    values
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let offset = base + i;
            let key = ProcedureKey::from_word(word).map_err(|error| CodecError::BadKey { offset, error })?;
            if key.is_null() {
                return Err(CodecError::BadKey {
                    offset,
                    error: KeyError::Empty,
                });
            }
            Ok(key)
        })
        .collect()
}

/// Decode exactly `count` blocks starting at `offset`.
pub fn decode_blocks(
    words: &[Word],
    offset: usize,
    count: usize,
) -> Result<(Vec<Capability>, usize), CodecError> {
    let mut caps = Vec::new();
    let mut cursor = offset;
    for _ in 0..count {
        let (cap, next) = decode_at(words, cursor)?;
        caps.push(cap);
        cursor = next;
    }
    Ok((caps, cursor))
}

/// Decode a whole word sequence as a capability list.
pub fn decode(words: &[Word]) -> Result<Vec<Capability>, CodecError> {
    let mut caps = Vec::new();
    let mut cursor = 0;
    while cursor < words.len() {
        let (cap, next) = decode_at(words, cursor)?;
        caps.push(cap);
        cursor = next;
    }
    Ok(caps)
}
