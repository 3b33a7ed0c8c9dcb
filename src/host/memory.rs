//! In-Memory Host
//!
//! Storage, events and deployed modules kept in ordinary collections.
//! Suitable for embedding the kernel in a test harness or a simulator.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use super::{from_fn, Event, Host, Module};
use crate::kernel::Context;
use crate::syscall::ResultCode;
use crate::types::{Location, Selector, Word};

/// First location handed out by [`MemoryHost::deploy`].
const FIRST_LOCATION: u64 = 0x1000;

/// Host backed by in-memory maps.
pub struct MemoryHost {
    storage: BTreeMap<Word, Word>,
    events: Vec<Event>,
    modules: BTreeMap<Location, Arc<dyn Module<MemoryHost>>>,
    next_location: u64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            storage: BTreeMap::new(),
            events: Vec::new(),
            modules: BTreeMap::new(),
            next_location: FIRST_LOCATION,
        }
    }

    /// Preset a storage slot.
    pub fn with_slot(mut self, slot: impl Into<Word>, value: impl Into<Word>) -> Self {
        self.storage_set(slot.into(), value.into());
        self
    }

    /// Deploy a module at a fresh location.
    pub fn deploy<M>(&mut self, module: M) -> Location
    where
        M: Module<Self> + 'static,
    {
        let location = Location::from(self.next_location);
        self.next_location += 1;
        self.install(location, Arc::new(module));
        location
    }

    /// Deploy a closure as a module at a fresh location.
    pub fn deploy_fn<F>(&mut self, f: F) -> Location
    where
        F: Fn(&mut Context<'_, Self>, Selector, &[u8]) -> Result<Vec<u8>, ResultCode> + 'static,
    {
        self.deploy(from_fn(f))
    }

    /// Place a module at a chosen location, replacing any module there.
    pub fn install(&mut self, location: Location, module: Arc<dyn Module<Self>>) {
        self.modules.insert(location, module);
    }

    /// Remove the module at `location`.
    pub fn undeploy(&mut self, location: &Location) -> bool {
        self.modules.remove(location).is_some()
    }

    /// Read a slot.
    pub fn slot(&self, slot: impl Into<Word>) -> Word {
        self.storage_get(&slot.into())
    }

    /// Every slot ever written, in slot order.
    pub fn slots(&self) -> impl Iterator<Item = (&Word, &Word)> + '_ {
        self.storage.iter()
    }

    /// Events in emission order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Take the recorded events.
    pub fn take_events(&mut self) -> Vec<Event> {
        core::mem::take(&mut self.events)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("slots", &self.storage.len())
            .field("events", &self.events.len())
            .field("modules", &self.modules.len())
            .finish()
    }
}

impl Host for MemoryHost {
    fn storage_get(&self, slot: &Word) -> Word {
        self.storage.get(slot).copied().unwrap_or(Word::ZERO)
    }

    fn storage_set(&mut self, slot: Word, value: Word) {
        self.storage.insert(slot, value);
    }

    fn emit(&mut self, topics: &[Word], data: &[u8]) {
        self.events.push(Event {
            topics: topics.to_vec(),
            data: data.to_vec(),
        });
    }

    fn resolve_module(&self, location: &Location) -> Option<Arc<dyn Module<Self>>> {
        self.modules.get(location).cloned()
    }
}
