//! Runtime-checkable kernel invariants
//!
//! Used for assertion checking in tests and property tests. None of these
//! can be violated through the public API; a violation is a kernel bug.
//!
//! # Invariants
//!
//! 1. **Key Uniqueness**: no two live records share a key, and the lookup
//!    map covers exactly the live records
//! 2. **Index Consistency**: each record's index is its position plus one
//! 3. **No Null Keys**: the end-of-table sentinel never names a record
//! 4. **Capability Validity**: every held capability is well formed
//! 5. **Frame Discipline**: frame depths count up from zero and each
//!    frame's caller is the callee of the frame below it

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::kernel::Kernel;

/// An invariant violation with details
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all kernel invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants<H>(kernel: &Kernel<H>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_key_uniqueness(kernel));
    violations.extend(check_index_consistency(kernel));
    violations.extend(check_no_null_keys(kernel));
    violations.extend(check_capability_validity(kernel));
    violations.extend(check_frame_discipline(kernel));

    violations
}

/// Invariant 1: keys are unique and the lookup map is exact
fn check_key_uniqueness<H>(kernel: &Kernel<H>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let table = &kernel.table;

    if table.position_count() != table.len() {
        violations.push(InvariantViolation {
            invariant: "key_uniqueness",
            description: format!(
                "{} lookup entries for {} records",
                table.position_count(),
                table.len()
            ),
        });
    }

    for (position, record) in table.iter().enumerate() {
        if table.position_of(record.key()) != Some(position) {
            violations.push(InvariantViolation {
                invariant: "key_uniqueness",
                description: format!(
                    "record {} at position {} is not where lookup finds it",
                    record.key(),
                    position
                ),
            });
        }
    }

    violations
}

/// Invariant 2: index == position + 1
fn check_index_consistency<H>(kernel: &Kernel<H>) -> Vec<InvariantViolation> {
    kernel
        .table
        .iter()
        .enumerate()
        .filter(|(position, record)| record.index() != position + 1)
        .map(|(position, record)| InvariantViolation {
            invariant: "index_consistency",
            description: format!(
                "record {} at position {} has index {}",
                record.key(),
                position,
                record.index()
            ),
        })
        .collect()
}

/// Invariant 3: no record uses the null key
fn check_no_null_keys<H>(kernel: &Kernel<H>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    for record in kernel.table.iter() {
        if record.key().is_null() {
            violations.push(InvariantViolation {
                invariant: "no_null_keys",
                description: format!("record at index {} has the null key", record.index()),
            });
        }
    }
    violations
}

/// Invariant 4: every held capability is well formed
fn check_capability_validity<H>(kernel: &Kernel<H>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    for record in kernel.table.iter() {
        for cap in record.capabilities() {
            if let Err(e) = cap.validate() {
                violations.push(InvariantViolation {
                    invariant: "capability_validity",
                    description: format!("{} holds {}: {}", record.key(), cap, e),
                });
            }
        }
    }
    violations
}

/// Invariant 5: frames nest properly
fn check_frame_discipline<H>(kernel: &Kernel<H>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut below = None;

    for (depth, frame) in kernel.frames.iter().enumerate() {
        if frame.depth != depth {
            violations.push(InvariantViolation {
                invariant: "frame_discipline",
                description: format!("frame {} records depth {}", depth, frame.depth),
            });
        }
        if frame.caller != below {
            violations.push(InvariantViolation {
                invariant: "frame_discipline",
                description: format!(
                    "frame {} caller {:?} is not the callee below it ({:?})",
                    depth, frame.caller, below
                ),
            });
        }
        below = Some(frame.callee);
    }

    violations
}
