//! System Call Handler
//!
//! Dispatches the mediated operations and implements each one.
//!
//! # Security Considerations
//! - The caller must be a live procedure; its own capability list is the
//!   only authority consulted
//! - Every check (caller, arguments, targets, capabilities) completes
//!   before the first effect, so a rejected syscall changes nothing
//! - Rejections are returned as codes, never panics

use alloc::vec::Vec;
use core::fmt;

use log::{debug, trace, warn};

use super::validate;
use crate::cap::{engine, Capability, CapabilityList, Denied, Request};
use crate::host::Host;
use crate::kernel::Kernel;
use crate::table::TableError;
use crate::types::{Location, ProcedureKey, Selector, Word};

/// Syscall classes. The discriminant is the high nibble of every
/// rejection code the class produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyscallClass {
    Write = 0x10,
    Log = 0x20,
    Call = 0x30,
    Delete = 0x40,
    SetEntry = 0x50,
    Register = 0x60,
}

impl SyscallClass {
    const fn from_nibble(bits: u8) -> Option<Self> {
        match bits {
            0x10 => Some(Self::Write),
            0x20 => Some(Self::Log),
            0x30 => Some(Self::Call),
            0x40 => Some(Self::Delete),
            0x50 => Some(Self::SetEntry),
            0x60 => Some(Self::Register),
            _ => None,
        }
    }
}

/// Rejection kinds. The discriminant is the low nibble of the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// No held capability matches the request.
    CapabilityDenied = 1,
    /// A procedure that must exist does not.
    NotFound = 2,
    /// Delete aimed at the entry procedure.
    ProtectedTarget = 3,
    /// Register under a name already in use.
    DuplicateKey = 4,
    /// Malformed arguments.
    InvalidArgument = 5,
    /// The acting procedure is not registered.
    UnknownCaller = 6,
    /// The call chain hit the configured depth limit.
    CallDepthExceeded = 7,
}

impl ErrorKind {
    const fn from_nibble(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::CapabilityDenied),
            2 => Some(Self::NotFound),
            3 => Some(Self::ProtectedTarget),
            4 => Some(Self::DuplicateKey),
            5 => Some(Self::InvalidArgument),
            6 => Some(Self::UnknownCaller),
            7 => Some(Self::CallDepthExceeded),
            _ => None,
        }
    }
}

/// A syscall or invocation result code. Zero is success.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ResultCode(u8);

impl ResultCode {
    pub const SUCCESS: Self = Self(0);
    /// Payload could not be decoded by the module.
    pub const BAD_PAYLOAD: Self = Self(0xFD);
    /// No function in the module answers the selector.
    pub const UNKNOWN_SELECTOR: Self = Self(0xFE);
    /// A module failed without a more specific code.
    pub const REVERTED: Self = Self(0xFF);

    #[inline]
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// The syscall class encoded in a rejection code.
    pub const fn class(self) -> Option<SyscallClass> {
        SyscallClass::from_nibble(self.0 & 0xF0)
    }

    /// The rejection kind encoded in a rejection code.
    pub const fn kind(self) -> Option<ErrorKind> {
        match self.class() {
            Some(_) => ErrorKind::from_nibble(self.0 & 0x0F),
            None => None,
        }
    }

    /// A code that is guaranteed to read as failure.
    pub(crate) const fn into_failure(self) -> Self {
        if self.0 == 0 {
            Self::REVERTED
        } else {
            self
        }
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultCode({:#04x})", self.0)
    }
}

/// A failed syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// The kernel refused the syscall before any effect.
    Rejected { class: SyscallClass, kind: ErrorKind },
    /// A called procedure failed; its code passes through unchanged.
    Reverted(ResultCode),
}

impl SyscallError {
    #[inline]
    pub const fn rejected(class: SyscallClass, kind: ErrorKind) -> Self {
        Self::Rejected { class, kind }
    }

    /// The stable result code for this failure.
    pub const fn code(self) -> ResultCode {
        match self {
            Self::Rejected { class, kind } => ResultCode(class as u8 | kind as u8),
            Self::Reverted(code) => code,
        }
    }

    /// The rejection kind, if the kernel itself refused.
    pub const fn kind(self) -> Option<ErrorKind> {
        match self {
            Self::Rejected { kind, .. } => Some(kind),
            Self::Reverted(_) => None,
        }
    }
}

impl From<SyscallError> for ResultCode {
    fn from(e: SyscallError) -> Self {
        e.code()
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { class, kind } => write!(f, "{:?} rejected: {:?}", class, kind),
            Self::Reverted(code) => write!(f, "callee reverted with {:?}", code),
        }
    }
}

/// A mediated operation requested by a procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Syscall {
    /// Set storage slot `address` to `value`.
    Write { address: Word, value: Word },
    /// Emit an event.
    Log { topics: Vec<Word>, data: Vec<u8> },
    /// Invoke `selector` on procedure `target`.
    Call {
        target: ProcedureKey,
        selector: Selector,
        payload: Vec<u8>,
    },
    /// Remove procedure `target`.
    Delete { target: ProcedureKey },
    /// Point the entry pointer at `target`.
    SetEntry { target: ProcedureKey },
    /// Register a new procedure.
    Register {
        target: ProcedureKey,
        location: Location,
        capabilities: Vec<Capability>,
    },
}

impl Syscall {
    pub const fn class(&self) -> SyscallClass {
        match self {
            Self::Write { .. } => SyscallClass::Write,
            Self::Log { .. } => SyscallClass::Log,
            Self::Call { .. } => SyscallClass::Call,
            Self::Delete { .. } => SyscallClass::Delete,
            Self::SetEntry { .. } => SyscallClass::SetEntry,
            Self::Register { .. } => SyscallClass::Register,
        }
    }
}

impl<H: Host> Kernel<H> {
    /// Dispatch a syscall on behalf of `caller`.
    ///
    /// # Returns
    /// Return data (only Call produces any) or the reason for failure.
    ///
    /// # Security
    /// - Unknown callers are rejected before anything else
    /// - Arguments are validated before targets are resolved
    /// - Capabilities are consulted last, immediately before the effect
    pub fn dispatch(
        &mut self,
        caller: &ProcedureKey,
        syscall: Syscall,
    ) -> Result<Vec<u8>, SyscallError> {
        let class = syscall.class();
        if !self.table.contains(caller) {
            warn!("[SYSCALL] {:?} from unknown procedure {:?}", class, caller.name());
            return Err(SyscallError::rejected(class, ErrorKind::UnknownCaller));
        }

        validate::validate_syscall(&syscall, &self.config)?;
        debug!("[SYSCALL] {} -> {:?}", caller, class);

        match syscall {
            Syscall::Write { address, value } => self.sys_write(caller, address, value),
            Syscall::Log { topics, data } => self.sys_log(caller, &topics, &data),
            Syscall::Call {
                target,
                selector,
                payload,
            } => self.sys_call(caller, target, selector, &payload),
            Syscall::Delete { target } => self.sys_delete(caller, target),
            Syscall::SetEntry { target } => self.sys_set_entry(caller, target),
            Syscall::Register {
                target,
                location,
                capabilities,
            } => self.sys_register(caller, target, location, capabilities),
        }
    }

    /// Dispatch a syscall and reduce the outcome to its result code.
    pub fn execute(&mut self, caller: &ProcedureKey, syscall: Syscall) -> ResultCode {
        match self.dispatch(caller, syscall) {
            Ok(_) => ResultCode::SUCCESS,
            Err(e) => e.code(),
        }
    }

    /// Consult the engine with the caller's own capabilities.
    fn authorize(
        &self,
        caller: &ProcedureKey,
        class: SyscallClass,
        request: &Request<'_>,
    ) -> Result<(), SyscallError> {
        let record = self
            .table
            .lookup(caller)
            .ok_or(SyscallError::rejected(class, ErrorKind::UnknownCaller))?;

        engine::authorize(record.capabilities(), request).map_err(|denied| {
            warn!("[SYSCALL] {:?} denied for {}: {}", class, caller, denied);
            match denied {
                Denied::ProtectedTarget => SyscallError::rejected(class, ErrorKind::ProtectedTarget),
                _ => SyscallError::rejected(class, ErrorKind::CapabilityDenied),
            }
        })
    }

    fn sys_write(
        &mut self,
        caller: &ProcedureKey,
        address: Word,
        value: Word,
    ) -> Result<Vec<u8>, SyscallError> {
        self.authorize(caller, SyscallClass::Write, &Request::Write { address: &address })?;
        trace!("[SYSCALL] write {} <- {}", address, value);
        self.host.storage_set(address, value);
        Ok(Vec::new())
    }

    fn sys_log(
        &mut self,
        caller: &ProcedureKey,
        topics: &[Word],
        data: &[u8],
    ) -> Result<Vec<u8>, SyscallError> {
        self.authorize(caller, SyscallClass::Log, &Request::Log { topics })?;
        trace!("[SYSCALL] log {} topics, {} bytes", topics.len(), data.len());
        self.host.emit(topics, data);
        Ok(Vec::new())
    }

    /// Call another procedure.
    ///
    /// The callee runs under its own capabilities in a fresh frame; its
    /// return data or failure code is handed back unchanged.
    fn sys_call(
        &mut self,
        caller: &ProcedureKey,
        target: ProcedureKey,
        selector: Selector,
        payload: &[u8],
    ) -> Result<Vec<u8>, SyscallError> {
        if !self.table.contains(&target) {
            warn!("[SYSCALL] call: {} not registered", target);
            return Err(SyscallError::rejected(SyscallClass::Call, ErrorKind::NotFound));
        }
        self.authorize(caller, SyscallClass::Call, &Request::Call { target: &target })?;
        trace!("[SYSCALL] call {} -> {} {:?}", caller, target, selector);

        // Outside any running frame the caller gets a root frame of its own.
        if !self.frames.is_empty() {
            return self.enter(Some(*caller), target, selector, payload);
        }
        self.frames
            .push(None, *caller, self.config.max_call_depth)
            .map_err(|_| SyscallError::rejected(SyscallClass::Call, ErrorKind::CallDepthExceeded))?;
        let result = self.enter(Some(*caller), target, selector, payload);
        self.frames.pop();
        result
    }

    /// Delete a procedure.
    ///
    /// # Security
    /// The entry procedure is refused before scope or existence is looked
    /// at, so even a wildcard Delete cannot strand external callers.
    fn sys_delete(
        &mut self,
        caller: &ProcedureKey,
        target: ProcedureKey,
    ) -> Result<Vec<u8>, SyscallError> {
        if self.entry.is(&target) {
            warn!("[SYSCALL] delete: {} is the entry procedure", target);
            return Err(SyscallError::rejected(
                SyscallClass::Delete,
                ErrorKind::ProtectedTarget,
            ));
        }
        if !self.table.contains(&target) {
            warn!("[SYSCALL] delete: {} not registered", target);
            return Err(SyscallError::rejected(SyscallClass::Delete, ErrorKind::NotFound));
        }
        self.authorize(
            caller,
            SyscallClass::Delete,
            &Request::Delete {
                target: &target,
                entry: self.entry.get(),
            },
        )?;

        self.table
            .delete(&target)
            .map_err(|_| SyscallError::rejected(SyscallClass::Delete, ErrorKind::NotFound))?;
        debug!("[SYSCALL] {} deleted {}", caller, target);
        Ok(Vec::new())
    }

    /// Redirect the entry pointer. The target need not exist yet.
    fn sys_set_entry(
        &mut self,
        caller: &ProcedureKey,
        target: ProcedureKey,
    ) -> Result<Vec<u8>, SyscallError> {
        self.authorize(caller, SyscallClass::SetEntry, &Request::SetEntry)?;
        self.entry.set(target);
        debug!("[SYSCALL] {} set entry to {}", caller, target);
        Ok(Vec::new())
    }

    fn sys_register(
        &mut self,
        caller: &ProcedureKey,
        target: ProcedureKey,
        location: Location,
        capabilities: Vec<Capability>,
    ) -> Result<Vec<u8>, SyscallError> {
        if self.table.contains(&target) {
            warn!("[SYSCALL] register: {} already registered", target);
            return Err(SyscallError::rejected(
                SyscallClass::Register,
                ErrorKind::DuplicateKey,
            ));
        }
        self.authorize(
            caller,
            SyscallClass::Register,
            &Request::Register {
                target: &target,
                grants: &capabilities,
            },
        )?;

        self.table
            .create(target, location, CapabilityList::from(capabilities))
            .map_err(|e| {
                let kind = match e {
                    TableError::DuplicateKey(_) => ErrorKind::DuplicateKey,
                    _ => ErrorKind::InvalidArgument,
                };
                SyscallError::rejected(SyscallClass::Register, kind)
            })?;
        debug!("[SYSCALL] {} registered {} at {}", caller, target, location);
        Ok(Vec::new())
    }
}
