//! Panther CapKernel - Capability-Mediated Procedure Kernel
//!
//! A reference monitor that sits between independently addressed code
//! modules ("procedures") and everything they can affect.
//!
//! # Security Features
//! - Explicit, typed capabilities (seL4-inspired), no ambient authority
//! - Every storage write, event, call, deletion, entry redirection and
//!   registration is a syscall checked before it takes effect
//! - A callee acts under its own capabilities only
//! - The entry procedure cannot be deleted
//!
//! # Architecture
//! - [`table`]: the directory of procedures and their capabilities
//! - [`cap`]: capability model, authorization engine, wire codec
//! - [`syscall`]: dispatcher, argument validation, call frames
//! - [`kernel`]: the aggregate tying them to a [`host::Host`]
//!
//! # Example
//! ```
//! use panther_capkernel::cap::Capability;
//! use panther_capkernel::host::memory::MemoryHost;
//! use panther_capkernel::kernel::{Invocation, Kernel};
//! use panther_capkernel::types::{ProcedureKey, Selector, Word};
//!
//! let mut host = MemoryHost::new();
//! let code = host.deploy_fn(|ctx, _selector, _payload| {
//!     ctx.write(0x8000u64, 1u64).map_err(|e| e.code())?;
//!     Ok(Vec::new())
//! });
//!
//! let init = ProcedureKey::new("init").unwrap();
//! let mut kernel = Kernel::new(host);
//! kernel.bootstrap(init, code, [Capability::write(0x8000u64, 1u64)]).unwrap();
//!
//! kernel.invoke(Invocation::entry(Selector::from_signature("run()"), &[])).unwrap();
//! assert_eq!(kernel.host().slot(0x8000u64), Word::from(1u64));
//! ```

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod console;
pub mod logger;

pub mod cap;
pub mod config;
pub mod host;
pub mod invariants;
pub mod kernel;
pub mod syscall;
pub mod table;
pub mod types;

pub use cap::{Capability, CapabilityList, CapabilityType};
pub use config::Config;
pub use host::{Host, Module};
pub use kernel::{Context, EntryPointer, Invocation, Kernel};
pub use syscall::{ErrorKind, ResultCode, Syscall, SyscallClass, SyscallError};
pub use table::{Procedure, ProcedureTable, TableError};
pub use types::{Location, ProcedureKey, Selector, Word};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
