//! Host Substrate
//!
//! The kernel owns no storage, events or code. It reaches them through a
//! [`Host`]: persistent word storage, an event sink, and a resolver that
//! turns a procedure's [`Location`] into runnable [`Module`] code.
//!
//! [`memory::MemoryHost`] is a complete in-memory host; [`router::Router`]
//! builds modules that dispatch on the selector.

pub mod memory;
pub mod router;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::kernel::Context;
use crate::syscall::ResultCode;
use crate::types::{Location, Selector, Word};

/// The environment the kernel runs in.
pub trait Host: Sized {
    /// Read a storage slot. Unwritten slots read as zero.
    fn storage_get(&self, slot: &Word) -> Word;

    /// Set a storage slot.
    fn storage_set(&mut self, slot: Word, value: Word);

    /// Record an event.
    fn emit(&mut self, topics: &[Word], data: &[u8]);

    /// Find the code deployed at `location`.
    fn resolve_module(&self, location: &Location) -> Option<Arc<dyn Module<Self>>>;
}

/// Procedure code.
///
/// A module runs inside a frame of its own and acts only through its
/// [`Context`]. An `Err` reverts the call with that code.
pub trait Module<H> {
    fn invoke(
        &self,
        ctx: &mut Context<'_, H>,
        selector: Selector,
        payload: &[u8],
    ) -> Result<Vec<u8>, ResultCode>;
}

/// An emitted event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub topics: Vec<Word>,
    pub data: Vec<u8>,
}

/// A module backed by a closure.
pub struct FnModule<H, F> {
    f: F,
    _host: PhantomData<fn(&mut H)>,
}

/// Wrap a closure as a module.
pub fn from_fn<H, F>(f: F) -> FnModule<H, F>
where
    H: Host,
    F: Fn(&mut Context<'_, H>, Selector, &[u8]) -> Result<Vec<u8>, ResultCode>,
{
    FnModule {
        f,
        _host: PhantomData,
    }
}

impl<H, F> Module<H> for FnModule<H, F>
where
    H: Host,
    F: Fn(&mut Context<'_, H>, Selector, &[u8]) -> Result<Vec<u8>, ResultCode>,
{
    fn invoke(
        &self,
        ctx: &mut Context<'_, H>,
        selector: Selector,
        payload: &[u8],
    ) -> Result<Vec<u8>, ResultCode> {
        (self.f)(ctx, selector, payload)
    }
}
