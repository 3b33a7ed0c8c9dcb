//! System Call Interface
//!
//! The only way a procedure affects anything outside itself.
//!
//! # Security Model
//! - Whitelist approach: only the six syscalls below exist
//! - All parameters are validated before use
//! - Invalid inputs return codes, never panic
//! - A rejected syscall has no effect
//!
//! # Syscalls
//! - Write(address, value) - set one storage slot
//! - Log(topics, data) - emit an event
//! - Call(target, selector, payload) - invoke another procedure
//! - Delete(target) - remove a procedure
//! - SetEntry(target) - redirect external invocations
//! - Register(target, location, caps) - add a procedure

pub mod frame;
mod handler;
mod validate;

pub use frame::{CallFrame, DepthExceeded, FrameStack};
pub use handler::{ErrorKind, ResultCode, Syscall, SyscallClass, SyscallError};
