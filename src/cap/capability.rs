//! Capability Types and Scopes
//!
//! Defines the closed set of capability kinds a procedure can hold and the
//! per-kind scope each one carries.
//!
//! # Capability Structure
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Capability                            │
//! ├──────────────────────────────────────────────────────────┤
//! │  Write    { address, size }   - storage range            │
//! │  Log      { topics }          - exact topic vector / any │
//! │  Call     { procedures }      - callable names / any     │
//! │  Delete   { procedures }      - deletable names / any    │
//! │  SetEntry                     - redirect entry pointer   │
//! │  Register { procedures }      - registrable names / any  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! An empty name or topic list is a wildcard. A `Write` with size zero is
//! a valid but inert grant.

use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::types::{ProcedureKey, Word};

/// Maximum number of topics in a log emission (and in a Log scope).
pub const MAX_LOG_TOPICS: usize = 4;

/// Wire type identifiers.
///
/// The numbering is part of the capability encoding and must not change.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[repr(u8)]
pub enum CapabilityType {
    /// Invoke another procedure.
    Call = 3,
    /// Register a new procedure.
    Register = 4,
    /// Delete a procedure.
    Delete = 5,
    /// Redirect the entry pointer.
    SetEntry = 6,
    /// Write a storage slot.
    Write = 7,
    /// Emit a log event.
    Log = 8,
}

impl CapabilityType {
    /// Every capability type, in wire-id order.
    pub const ALL: [Self; 6] = [
        Self::Call,
        Self::Register,
        Self::Delete,
        Self::SetEntry,
        Self::Write,
        Self::Log,
    ];

    /// The wire identifier.
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Look up a type by wire identifier.
    pub const fn from_id(id: u64) -> Option<Self> {
        match id {
            3 => Some(Self::Call),
            4 => Some(Self::Register),
            5 => Some(Self::Delete),
            6 => Some(Self::SetEntry),
            7 => Some(Self::Write),
            8 => Some(Self::Log),
            _ => None,
        }
    }

    /// The summary flag for this type.
    pub const fn kind(self) -> CapabilityKinds {
        match self {
            Self::Call => CapabilityKinds::CALL,
            Self::Register => CapabilityKinds::REGISTER,
            Self::Delete => CapabilityKinds::DELETE,
            Self::SetEntry => CapabilityKinds::SET_ENTRY,
            Self::Write => CapabilityKinds::WRITE,
            Self::Log => CapabilityKinds::LOG,
        }
    }
}

bitflags! {
    /// Summary of which capability types a list holds.
    ///
    /// Lets the engine reject a request without scanning the list when the
    /// caller holds nothing of the relevant type.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
    pub struct CapabilityKinds: u8 {
        const WRITE = 1 << 0;
        const LOG = 1 << 1;
        const CALL = 1 << 2;
        const DELETE = 1 << 3;
        const SET_ENTRY = 1 << 4;
        const REGISTER = 1 << 5;
    }
}

/// Error type for malformed capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    /// A Log scope names more than four topics.
    TooManyTopics,
    /// A procedure scope contains the reserved null key.
    NullProcedure,
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyTopics => write!(f, "log scope exceeds {} topics", MAX_LOG_TOPICS),
            Self::NullProcedure => write!(f, "procedure scope contains the null key"),
        }
    }
}

/// A capability: an explicit, immutable grant of one kind of authority.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum Capability {
    /// Write any slot in `address .. address + size`.
    Write { address: Word, size: Word },
    /// Emit logs whose topics equal `topics`; empty means any topics.
    Log { topics: Vec<Word> },
    /// Call the listed procedures; empty means any procedure.
    Call { procedures: Vec<ProcedureKey> },
    /// Delete the listed procedures; empty means any procedure.
    Delete { procedures: Vec<ProcedureKey> },
    /// Point the entry pointer at any name.
    SetEntry,
    /// Register procedures under the listed names; empty means any name.
    Register { procedures: Vec<ProcedureKey> },
}

impl Capability {
    /// Write grant over `size` slots starting at `address`.
    pub fn write(address: impl Into<Word>, size: impl Into<Word>) -> Self {
        Self::Write {
            address: address.into(),
            size: size.into(),
        }
    }

    /// Log grant for exactly `topics`.
    pub fn log(topics: impl IntoIterator<Item = Word>) -> Self {
        Self::Log {
            topics: topics.into_iter().collect(),
        }
    }

    /// Unrestricted log grant.
    pub fn log_any() -> Self {
        Self::Log { topics: Vec::new() }
    }

    /// Call grant for the listed procedures.
    pub fn call(procedures: impl IntoIterator<Item = ProcedureKey>) -> Self {
        Self::Call {
            procedures: procedures.into_iter().collect(),
        }
    }

    /// Call grant for any procedure.
    pub fn call_any() -> Self {
        Self::Call {
            procedures: Vec::new(),
        }
    }

    /// Delete grant for the listed procedures.
    pub fn delete(procedures: impl IntoIterator<Item = ProcedureKey>) -> Self {
        Self::Delete {
            procedures: procedures.into_iter().collect(),
        }
    }

    /// Delete grant for any procedure.
    pub fn delete_any() -> Self {
        Self::Delete {
            procedures: Vec::new(),
        }
    }

    /// Register grant for the listed names.
    pub fn register(procedures: impl IntoIterator<Item = ProcedureKey>) -> Self {
        Self::Register {
            procedures: procedures.into_iter().collect(),
        }
    }

    /// Register grant for any name.
    pub fn register_any() -> Self {
        Self::Register {
            procedures: Vec::new(),
        }
    }

    /// The capability type.
    pub const fn cap_type(&self) -> CapabilityType {
        match self {
            Self::Write { .. } => CapabilityType::Write,
            Self::Log { .. } => CapabilityType::Log,
            Self::Call { .. } => CapabilityType::Call,
            Self::Delete { .. } => CapabilityType::Delete,
            Self::SetEntry => CapabilityType::SetEntry,
            Self::Register { .. } => CapabilityType::Register,
        }
    }

    /// Check the scope is representable.
    pub fn validate(&self) -> Result<(), CapabilityError> {
        match self {
            Self::Log { topics } if topics.len() > MAX_LOG_TOPICS => {
                Err(CapabilityError::TooManyTopics)
            }
            Self::Call { procedures }
            | Self::Delete { procedures }
            | Self::Register { procedures } => {
                if procedures.iter().any(ProcedureKey::is_null) {
                    Err(CapabilityError::NullProcedure)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Does this grant allow writing `slot`?
    pub fn permits_write(&self, slot: &Word) -> bool {
        match self {
            Self::Write { address, size } => range_contains(address, size, slot),
            _ => false,
        }
    }

    /// Does this grant allow emitting a log with `emitted` topics?
    pub fn permits_log(&self, emitted: &[Word]) -> bool {
        match self {
            Self::Log { topics } if topics.is_empty() => emitted.len() <= MAX_LOG_TOPICS,
            Self::Log { topics } => topics.as_slice() == emitted,
            _ => false,
        }
    }

    /// Does this grant name `target` in its procedure scope?
    ///
    /// Only meaningful for Call, Delete and Register; SetEntry is
    /// unscoped and answers `true`.
    pub fn permits_procedure(&self, target: &ProcedureKey) -> bool {
        match self {
            Self::Call { procedures }
            | Self::Delete { procedures }
            | Self::Register { procedures } => scope_contains(procedures, target),
            Self::SetEntry => true,
            Self::Write { .. } | Self::Log { .. } => false,
        }
    }

    /// Is everything `self` grants also granted by `held`?
    ///
    /// Used when a procedure registers another: the new procedure may only
    /// receive authority its registrant already has.
    pub fn is_subset_of(&self, held: &Capability) -> bool {
        match (self, held) {
            (
                Self::Write { address, size },
                Self::Write {
                    address: held_address,
                    size: held_size,
                },
            ) => range_within(address, size, held_address, held_size),
            (Self::Log { topics }, Self::Log { topics: held_topics }) => {
                held_topics.is_empty() || held_topics == topics
            }
            (Self::Call { procedures }, Self::Call { procedures: held_scope })
            | (Self::Delete { procedures }, Self::Delete { procedures: held_scope })
            | (Self::Register { procedures }, Self::Register { procedures: held_scope }) => {
                scope_within(procedures, held_scope)
            }
            (Self::SetEntry, Self::SetEntry) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write { address, size } => write!(f, "Write({}, {})", address, size),
            Self::Log { topics } => write!(f, "Log({} topics)", topics.len()),
            Self::Call { procedures } => write_scope(f, "Call", procedures),
            Self::Delete { procedures } => write_scope(f, "Delete", procedures),
            Self::SetEntry => write!(f, "SetEntry"),
            Self::Register { procedures } => write_scope(f, "Register", procedures),
        }
    }
}

fn write_scope(f: &mut fmt::Formatter<'_>, name: &str, scope: &[ProcedureKey]) -> fmt::Result {
    if scope.is_empty() {
        return write!(f, "{}(*)", name);
    }
    write!(f, "{}(", name)?;
    for (i, key) in scope.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", key)?;
    }
    write!(f, ")")
}

/// `address <= slot < address + size`, with an overflowing end treated as
/// reaching the top of the keyspace.
fn range_contains(address: &Word, size: &Word, slot: &Word) -> bool {
    if size.is_zero() || slot < address {
        return false;
    }
    match address.checked_add(*size) {
        Some(end) => slot < &end,
        None => true,
    }
}

fn range_within(address: &Word, size: &Word, outer: &Word, outer_size: &Word) -> bool {
    if size.is_zero() {
        return true;
    }
    if outer_size.is_zero() || address < outer {
        return false;
    }
    // `None` is an end past the top of the keyspace.
    match (address.checked_add(*size), outer.checked_add(*outer_size)) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(end), Some(outer_end)) => end <= outer_end,
    }
}

fn scope_contains(scope: &[ProcedureKey], target: &ProcedureKey) -> bool {
    scope.is_empty() || scope.contains(target)
}

fn scope_within(scope: &[ProcedureKey], outer: &[ProcedureKey]) -> bool {
    if outer.is_empty() {
        return true;
    }
    !scope.is_empty() && scope.iter().all(|key| outer.contains(key))
}
