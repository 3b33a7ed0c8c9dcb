//! Procedure Records

use crate::cap::{Capability, CapabilityList};
use crate::types::{Location, ProcedureKey};

/// One registered procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Procedure {
    pub(super) key: ProcedureKey,
    pub(super) index: usize,
    pub(super) location: Location,
    pub(super) capabilities: CapabilityList,
}

impl Procedure {
    /// The procedure's unique name.
    #[inline]
    pub fn key(&self) -> &ProcedureKey {
        &self.key
    }

    /// 1-based position in listing order. Changes when an earlier record
    /// is deleted.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Where the host finds the procedure's code.
    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Capabilities the procedure acts under.
    #[inline]
    pub fn capabilities(&self) -> &CapabilityList {
        &self.capabilities
    }

    pub(super) fn grant(&mut self, cap: Capability) {
        self.capabilities.push(cap);
    }
}
