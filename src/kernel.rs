//! Kernel Aggregate
//!
//! One [`Kernel`] owns the procedure table, the entry pointer, the frame
//! stack and the host. Every mutation of kernel state goes through it:
//! privileged administration at setup time, syscalls at run time.
//!
//! # Execution Model
//! ```text
//!  external ──invoke──▶ entry procedure ──Call──▶ ProcB ──Call──▶ ...
//!                          (depth 0)             (depth 1)
//! ```
//! A module receives a [`Context`] bound to its own key. Everything it
//! does beyond reading storage is a syscall checked against that key's
//! capabilities.

use alloc::vec::Vec;

use log::{info, trace, warn};

use crate::cap::{Capability, CapabilityList};
use crate::config::Config;
use crate::host::Host;
use crate::invariants::{self, InvariantViolation};
use crate::syscall::{
    CallFrame, ErrorKind, FrameStack, ResultCode, Syscall, SyscallClass, SyscallError,
};
use crate::table::{Procedure, ProcedureTable, TableError};
use crate::types::{Location, ProcedureKey, Selector, Word};

/// The procedure receiving external invocations that name no target.
///
/// Holds a key, not a reference: the named procedure may not exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryPointer(Option<ProcedureKey>);

impl EntryPointer {
    pub const fn unset() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<&ProcedureKey> {
        self.0.as_ref()
    }

    pub fn set(&mut self, key: ProcedureKey) {
        self.0 = Some(key);
    }

    /// Check whether `key` is the entry procedure.
    pub fn is(&self, key: &ProcedureKey) -> bool {
        self.0.as_ref() == Some(key)
    }
}

/// An external request to run a procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Procedure to run; `None` routes to the entry procedure.
    pub target: Option<ProcedureKey>,
    pub selector: Selector,
    pub payload: Vec<u8>,
}

impl Invocation {
    /// Invoke the entry procedure.
    pub fn entry(selector: Selector, payload: &[u8]) -> Self {
        Self {
            target: None,
            selector,
            payload: payload.to_vec(),
        }
    }

    /// Invoke a named procedure.
    pub fn to(target: ProcedureKey, selector: Selector, payload: &[u8]) -> Self {
        Self {
            target: Some(target),
            selector,
            payload: payload.to_vec(),
        }
    }
}

/// The capability kernel.
pub struct Kernel<H> {
    pub(crate) table: ProcedureTable,
    pub(crate) entry: EntryPointer,
    pub(crate) frames: FrameStack,
    pub(crate) config: Config,
    pub(crate) host: H,
}

impl<H: Host> Kernel<H> {
    /// Create a kernel with default limits and an empty table.
    pub fn new(host: H) -> Self {
        Self::with_config(host, Config::default())
    }

    pub fn with_config(host: H, config: Config) -> Self {
        Self {
            table: ProcedureTable::new(),
            entry: EntryPointer::unset(),
            frames: FrameStack::new(),
            config,
            host,
        }
    }

    /// Register the first procedure and make it the entry procedure.
    pub fn bootstrap(
        &mut self,
        key: ProcedureKey,
        location: Location,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<usize, TableError> {
        let index = self.create_procedure(key, location, capabilities)?;
        self.entry.set(key);
        info!("[BOOT] entry procedure {} at {}", key, location);
        Ok(index)
    }

    /// Register a procedure outside any syscall.
    pub fn create_procedure(
        &mut self,
        key: ProcedureKey,
        location: Location,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<usize, TableError> {
        let caps: CapabilityList = capabilities.into_iter().collect();
        let count = caps.len();
        let index = self.table.create(key, location, caps)?;
        info!("[BOOT] registered {} #{} with {} capabilities", key, index, count);
        Ok(index)
    }

    /// Grant one more capability outside any syscall.
    pub fn add_capability(&mut self, key: &ProcedureKey, cap: Capability) -> Result<(), TableError> {
        self.table.add_capability(key, cap)
    }

    pub fn lookup(&self, key: &ProcedureKey) -> Option<&Procedure> {
        self.table.lookup(key)
    }

    /// Code location of a live procedure.
    pub fn resolve_address(&self, key: &ProcedureKey) -> Option<Location> {
        self.table.lookup(key).map(Procedure::location)
    }

    pub fn list_procedures(&self) -> Vec<ProcedureKey> {
        self.table.list_procedures()
    }

    pub fn table(&self) -> &ProcedureTable {
        &self.table
    }

    /// The entry pointer's target, which may be stale.
    pub fn entry_procedure(&self) -> Option<&ProcedureKey> {
        self.entry.get()
    }

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Run a procedure on behalf of the outside world.
    ///
    /// The invocation itself is not capability-gated; the procedure then
    /// acts under its own capabilities.
    pub fn invoke(&mut self, invocation: Invocation) -> Result<Vec<u8>, SyscallError> {
        let Invocation {
            target,
            selector,
            payload,
        } = invocation;

        let target = match target.or_else(|| self.entry.get().copied()) {
            Some(target) => target,
            None => {
                warn!("[INVOKE] no target and no entry procedure");
                return Err(SyscallError::rejected(SyscallClass::Call, ErrorKind::NotFound));
            }
        };
        if !self.table.contains(&target) {
            warn!("[INVOKE] {} is not registered", target);
            return Err(SyscallError::rejected(SyscallClass::Call, ErrorKind::NotFound));
        }
        self.enter(None, target, selector, &payload)
    }

    /// Run `callee`'s module in a new frame.
    pub(crate) fn enter(
        &mut self,
        caller: Option<ProcedureKey>,
        callee: ProcedureKey,
        selector: Selector,
        payload: &[u8],
    ) -> Result<Vec<u8>, SyscallError> {
        let location = self
            .resolve_address(&callee)
            .ok_or(SyscallError::rejected(SyscallClass::Call, ErrorKind::NotFound))?;
        let module = match self.host.resolve_module(&location) {
            Some(module) => module,
            None => {
                warn!("[FRAME] no module deployed for {} at {}", callee, location);
                return Err(SyscallError::rejected(SyscallClass::Call, ErrorKind::NotFound));
            }
        };

        let frame = self
            .frames
            .push(caller, callee, self.config.max_call_depth)
            .map_err(|e| {
                warn!("[FRAME] call to {} exceeds depth {}", callee, e.limit);
                SyscallError::rejected(SyscallClass::Call, ErrorKind::CallDepthExceeded)
            })?;
        trace!("[FRAME] enter {} depth {}", callee, frame.depth);

        let result = module.invoke(
            &mut Context {
                kernel: &mut *self,
                key: callee,
            },
            selector,
            payload,
        );

        self.frames.pop();
        trace!("[FRAME] leave {} depth {}", callee, frame.depth);
        result.map_err(|code| SyscallError::Reverted(code.into_failure()))
    }

    /// Check every structural invariant, returning the violations.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        invariants::check_all_invariants(self)
    }
}

/// A running procedure's handle on the kernel.
///
/// Bound to the procedure's own key; every gated method is a syscall made
/// by that procedure.
pub struct Context<'k, H> {
    kernel: &'k mut Kernel<H>,
    key: ProcedureKey,
}

impl<H: Host> Context<'_, H> {
    /// The procedure this context acts as.
    pub fn key(&self) -> &ProcedureKey {
        &self.key
    }

    /// The frame this procedure is running in.
    pub fn frame(&self) -> Option<&CallFrame> {
        self.kernel.frames.current()
    }

    pub fn depth(&self) -> usize {
        self.frame().map_or(0, |frame| frame.depth)
    }

    /// The calling procedure, `None` when invoked externally.
    pub fn caller(&self) -> Option<ProcedureKey> {
        self.frame().and_then(|frame| frame.caller)
    }

    /// Read a storage slot. Reads are not mediated.
    pub fn read(&self, slot: impl Into<Word>) -> Word {
        self.kernel.host.storage_get(&slot.into())
    }

    pub fn entry_procedure(&self) -> Option<&ProcedureKey> {
        self.kernel.entry_procedure()
    }

    pub fn list_procedures(&self) -> Vec<ProcedureKey> {
        self.kernel.list_procedures()
    }

    /// This procedure's own capabilities.
    pub fn capabilities(&self) -> Option<&CapabilityList> {
        self.kernel.lookup(&self.key).map(Procedure::capabilities)
    }

    /// Make any syscall.
    pub fn syscall(&mut self, syscall: Syscall) -> Result<Vec<u8>, SyscallError> {
        let key = self.key;
        self.kernel.dispatch(&key, syscall)
    }

    /// Make a syscall and reduce the outcome to a code.
    pub fn execute(&mut self, syscall: Syscall) -> ResultCode {
        let key = self.key;
        self.kernel.execute(&key, syscall)
    }

    pub fn write(&mut self, address: impl Into<Word>, value: impl Into<Word>) -> Result<(), SyscallError> {
        self.syscall(Syscall::Write {
            address: address.into(),
            value: value.into(),
        })
        .map(drop)
    }

    pub fn log(
        &mut self,
        topics: impl IntoIterator<Item = Word>,
        data: &[u8],
    ) -> Result<(), SyscallError> {
        self.syscall(Syscall::Log {
            topics: topics.into_iter().collect(),
            data: data.to_vec(),
        })
        .map(drop)
    }

    /// Call another procedure, returning its output.
    pub fn call(
        &mut self,
        target: ProcedureKey,
        selector: Selector,
        payload: &[u8],
    ) -> Result<Vec<u8>, SyscallError> {
        self.syscall(Syscall::Call {
            target,
            selector,
            payload: payload.to_vec(),
        })
    }

    pub fn delete(&mut self, target: ProcedureKey) -> Result<(), SyscallError> {
        self.syscall(Syscall::Delete { target }).map(drop)
    }

    pub fn set_entry(&mut self, target: ProcedureKey) -> Result<(), SyscallError> {
        self.syscall(Syscall::SetEntry { target }).map(drop)
    }

    pub fn register(
        &mut self,
        target: ProcedureKey,
        location: Location,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<(), SyscallError> {
        self.syscall(Syscall::Register {
            target,
            location,
            capabilities: capabilities.into_iter().collect(),
        })
        .map(drop)
    }
}
