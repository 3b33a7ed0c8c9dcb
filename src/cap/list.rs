//! Capability List
//!
//! The ordered set of capabilities held by one procedure.
//!
//! # Design
//! - Append-only: capabilities are granted, never revoked
//! - Order is preserved so the wire encoding round-trips exactly
//! - A `CapabilityKinds` summary is kept alongside the list

use alloc::vec::Vec;

use super::capability::{Capability, CapabilityKinds, CapabilityType};

/// Capabilities held by a procedure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilityList {
    caps: Vec<Capability>,
    kinds: CapabilityKinds,
}

impl CapabilityList {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            caps: Vec::new(),
            kinds: CapabilityKinds::empty(),
        }
    }

    /// Append a capability.
    pub fn push(&mut self, cap: Capability) {
        self.kinds |= cap.cap_type().kind();
        self.caps.push(cap);
    }

    /// Which capability types are held.
    #[inline]
    pub fn kinds(&self) -> CapabilityKinds {
        self.kinds
    }

    /// Check whether at least one capability of `ty` is held.
    #[inline]
    pub fn holds(&self, ty: CapabilityType) -> bool {
        self.kinds.contains(ty.kind())
    }

    /// Capabilities of one type, in grant order.
    pub fn of_type(&self, ty: CapabilityType) -> impl Iterator<Item = &Capability> + '_ {
        self.caps.iter().filter(move |cap| cap.cap_type() == ty)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Capability> {
        self.caps.iter()
    }

    pub fn as_slice(&self) -> &[Capability] {
        &self.caps
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

impl FromIterator<Capability> for CapabilityList {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut list = Self::new();
        for cap in iter {
            list.push(cap);
        }
        list
    }
}

impl From<Vec<Capability>> for CapabilityList {
    fn from(caps: Vec<Capability>) -> Self {
        caps.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a CapabilityList {
    type Item = &'a Capability;
    type IntoIter = core::slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.caps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcedureKey;

    #[test]
    fn test_kinds_track_appends() {
        let mut list = CapabilityList::new();
        assert!(list.kinds().is_empty());

        list.push(Capability::write(0x10u64, 1u64));
        list.push(Capability::SetEntry);
        assert!(list.holds(CapabilityType::Write));
        assert!(list.holds(CapabilityType::SetEntry));
        assert!(!list.holds(CapabilityType::Call));
        assert_eq!(list.kinds(), CapabilityKinds::WRITE | CapabilityKinds::SET_ENTRY);
    }

    #[test]
    fn test_order_preserved() {
        let b = ProcedureKey::new("b").unwrap();
        let list: CapabilityList = [
            Capability::call([b]),
            Capability::write(1u64, 1u64),
            Capability::call_any(),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.len(), 3);
        let calls: Vec<_> = list.of_type(CapabilityType::Call).collect();
        assert_eq!(calls, [&Capability::call([b]), &Capability::call_any()]);
    }
}
