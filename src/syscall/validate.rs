//! System Call Input Validation
//!
//! Shape checks that run before any target is resolved or capability
//! consulted.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Reject rather than truncate:
//!   - Oversized topic lists
//!   - Oversized payloads (bounds checking)
//!   - Null procedure keys (explicit checks)
//!   - Malformed capability grants

use super::handler::{ErrorKind, Syscall, SyscallClass, SyscallError};
use crate::cap::{Capability, MAX_LOG_TOPICS};
use crate::config::Config;
use crate::types::{ProcedureKey, Word};

/// Validate the arguments of `syscall`.
///
/// # Returns
/// * `Ok(())` - Arguments are well formed
/// * `Err(SyscallError)` - `InvalidArgument` in the syscall's class
pub fn validate_syscall(syscall: &Syscall, config: &Config) -> Result<(), SyscallError> {
    let class = syscall.class();
    match syscall {
        Syscall::Write { .. } => Ok(()),
        Syscall::Log { topics, data } => {
            validate_topics(topics)?;
            validate_payload(class, data, config)
        }
        Syscall::Call {
            target, payload, ..
        } => {
            validate_target(class, target)?;
            validate_payload(class, payload, config)
        }
        Syscall::Delete { target } | Syscall::SetEntry { target } => validate_target(class, target),
        Syscall::Register {
            target,
            capabilities,
            ..
        } => {
            validate_target(class, target)?;
            validate_grants(capabilities)
        }
    }
}

fn invalid(class: SyscallClass) -> SyscallError {
    SyscallError::rejected(class, ErrorKind::InvalidArgument)
}

/// At most four topics per event.
pub fn validate_topics(topics: &[Word]) -> Result<(), SyscallError> {
    if topics.len() > MAX_LOG_TOPICS {
        return Err(invalid(SyscallClass::Log));
    }
    Ok(())
}

/// Log data and call payloads are bounded by the configured limit.
pub fn validate_payload(
    class: SyscallClass,
    bytes: &[u8],
    config: &Config,
) -> Result<(), SyscallError> {
    if bytes.len() > config.max_payload_len {
        return Err(invalid(class));
    }
    Ok(())
}

/// The null key never names a procedure.
pub fn validate_target(class: SyscallClass, target: &ProcedureKey) -> Result<(), SyscallError> {
    if target.is_null() {
        return Err(invalid(class));
    }
    Ok(())
}

/// Every granted capability must be well formed on its own.
pub fn validate_grants(grants: &[Capability]) -> Result<(), SyscallError> {
    if grants.iter().any(|cap| cap.validate().is_err()) {
        return Err(invalid(SyscallClass::Register));
    }
    Ok(())
}
