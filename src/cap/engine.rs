//! Capability Engine
//!
//! The pure authorization check at the centre of the kernel. Given the
//! capabilities a procedure holds and the operation it asks for, decide
//! whether any single held capability of the matching type permits it.
//!
//! # Security Properties (Verification Targets)
//!
//! 1. **Fail Closed**: holding nothing of the requested type denies
//! 2. **No Side Effects**: `authorize` never modifies anything
//! 3. **No Amplification**: a registration may only hand out capabilities
//!    that are subsets of the registrant's own
//! 4. **Protected Entry**: deleting the entry procedure is denied whatever
//!    the caller holds

use core::fmt;

use super::capability::{Capability, CapabilityType};
use super::list::CapabilityList;
use crate::types::{ProcedureKey, Word};

/// An operation submitted for authorization.
#[derive(Clone, Copy, Debug)]
pub enum Request<'a> {
    /// Write storage slot `address` (the value is unrestricted).
    Write { address: &'a Word },
    /// Emit a log with exactly these topics.
    Log { topics: &'a [Word] },
    /// Invoke procedure `target`.
    Call { target: &'a ProcedureKey },
    /// Delete procedure `target`, given the current entry procedure.
    Delete {
        target: &'a ProcedureKey,
        entry: Option<&'a ProcedureKey>,
    },
    /// Point the entry pointer anywhere.
    SetEntry,
    /// Register `target` holding `grants`.
    Register {
        target: &'a ProcedureKey,
        grants: &'a [Capability],
    },
}

impl Request<'_> {
    /// The capability type that can authorize this request.
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
}

/// Reason a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    /// No capability of the required type is held.
    NoCapability(CapabilityType),
    /// Capabilities of the type are held but none covers the request.
    OutOfScope(CapabilityType),
    /// The target is the entry procedure.
    ProtectedTarget,
    /// The grant at this index is not covered by any held capability.
    Amplification { grant: usize },
}

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCapability(ty) => write!(f, "no {:?} capability held", ty),
            Self::OutOfScope(ty) => write!(f, "request outside every held {:?} scope", ty),
            Self::ProtectedTarget => write!(f, "entry procedure cannot be deleted"),
            Self::Amplification { grant } => {
                write!(f, "grant {} exceeds the registrant's authority", grant)
            }
        }
    }
}

/// Decide whether `held` authorizes `request`.
///
/// Matching capabilities are OR'd: the first one that permits the request
/// authorizes it.
pub fn authorize(held: &CapabilityList, request: &Request<'_>) -> Result<(), Denied> {
    if let Request::Delete {
        target,
        entry: Some(entry),
    } = request
    {
        if target == entry {
            return Err(Denied::ProtectedTarget);
        }
    }

    let ty = request.cap_type();
    if !held.holds(ty) {
        return Err(Denied::NoCapability(ty));
    }

    let permitted = match request {
        Request::Write { address } => held.of_type(ty).any(|cap| cap.permits_write(address)),
        Request::Log { topics } => held.of_type(ty).any(|cap| cap.permits_log(topics)),
        Request::Call { target } | Request::Delete { target, .. } => {
            held.of_type(ty).any(|cap| cap.permits_procedure(target))
        }
        Request::SetEntry => true,
        Request::Register { target, grants } => {
            if !held.of_type(ty).any(|cap| cap.permits_procedure(target)) {
                return Err(Denied::OutOfScope(ty));
            }
            return check_grants(held, grants);
        }
    };

    if permitted {
        Ok(())
    } else {
        Err(Denied::OutOfScope(ty))
    }
}

/// Boolean form of [`authorize`].
#[inline]
pub fn is_authorized(held: &CapabilityList, request: &Request<'_>) -> bool {
    authorize(held, request).is_ok()
}

fn check_grants(held: &CapabilityList, grants: &[Capability]) -> Result<(), Denied> {
    for (index, grant) in grants.iter().enumerate() {
        let covered = held
            .of_type(grant.cap_type())
            .any(|cap| grant.is_subset_of(cap));
        if !covered {
            return Err(Denied::Amplification { grant: index });
        }
    }
    Ok(())
}
