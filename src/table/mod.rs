//! Procedure Table
//!
//! The directory of live procedures: unique names mapped to a code
//! location and the capabilities the procedure holds.
//!
//! # Design
//! - Records live in a dense vector in listing order
//! - A key → position map makes lookup independent of table size
//! - Deletion is swap-delete: the last record fills the hole and its
//!   index is rewritten, so lookups of remaining records stay exact
//!
//! # Invariants
//! - Keys are unique among live records
//! - The null key is never stored
//! - `record.index == position + 1` for every record

pub mod codec;
mod procedure;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use crate::cap::{Capability, CapabilityError, CapabilityList};
use crate::types::{Location, ProcedureKey};

pub use procedure::Procedure;

/// Error type for table operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A procedure with this key already exists.
    DuplicateKey(ProcedureKey),
    /// No procedure with this key exists.
    NotFound(ProcedureKey),
    /// The null key cannot name a procedure.
    NullKey,
    /// A capability being stored is malformed.
    InvalidCapability(CapabilityError),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "procedure {:?} already registered", key.name()),
            Self::NotFound(key) => write!(f, "procedure {:?} not found", key.name()),
            Self::NullKey => write!(f, "null key cannot name a procedure"),
            Self::InvalidCapability(e) => write!(f, "invalid capability: {}", e),
        }
    }
}

/// Directory of live procedures.
#[derive(Clone, Debug, Default)]
pub struct ProcedureTable {
    records: Vec<Procedure>,
    positions: BTreeMap<ProcedureKey, usize>,
}

impl ProcedureTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            positions: BTreeMap::new(),
        }
    }

    /// Insert a new procedure, returning its index.
    pub fn create(
        &mut self,
        key: ProcedureKey,
        location: Location,
        capabilities: CapabilityList,
    ) -> Result<usize, TableError> {
        if key.is_null() {
            return Err(TableError::NullKey);
        }
        if self.positions.contains_key(&key) {
            return Err(TableError::DuplicateKey(key));
        }
        for cap in &capabilities {
            cap.validate().map_err(TableError::InvalidCapability)?;
        }

        let position = self.records.len();
        let index = position + 1;
        self.records.push(Procedure {
            key,
            index,
            location,
            capabilities,
        });
        self.positions.insert(key, position);
        Ok(index)
    }

    /// Remove a procedure, returning its record.
    pub fn delete(&mut self, key: &ProcedureKey) -> Result<Procedure, TableError> {
        let position = self
            .positions
            .remove(key)
            .ok_or(TableError::NotFound(*key))?;
        let removed = self.records.swap_remove(position);

        if let Some(moved) = self.records.get_mut(position) {
            moved.index = position + 1;
            self.positions.insert(moved.key, position);
        }
        Ok(removed)
    }

    /// Look up a live procedure.
    pub fn lookup(&self, key: &ProcedureKey) -> Option<&Procedure> {
        self.positions.get(key).map(|&position| &self.records[position])
    }

    /// Check whether `key` names a live procedure.
    pub fn contains(&self, key: &ProcedureKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Names of all live procedures in listing order.
    pub fn list_procedures(&self) -> Vec<ProcedureKey> {
        self.records.iter().map(|record| record.key).collect()
    }

    /// Append one capability to an existing procedure.
    pub fn add_capability(&mut self, key: &ProcedureKey, cap: Capability) -> Result<(), TableError> {
        cap.validate().map_err(TableError::InvalidCapability)?;
        let position = *self.positions.get(key).ok_or(TableError::NotFound(*key))?;
        self.records[position].grant(cap);
        Ok(())
    }

    /// Records in listing order.
    pub fn iter(&self) -> core::slice::Iter<'_, Procedure> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position recorded for `key` in the lookup map.
    pub(crate) fn position_of(&self, key: &ProcedureKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub(crate) fn position_count(&self) -> usize {
        self.positions.len()
    }
}
