//! Capability-Based Security System
//!
//! Implements the capability model every syscall is checked against.
//!
//! # Design
//! - Each procedure holds one append-only `CapabilityList`
//! - Capabilities are typed grants with a per-type scope
//! - `engine::authorize` is the single decision point
//!
//! # Security Properties
//! - Capabilities cannot be forged: only the kernel appends to a list
//! - Authority is never inherited across a call; a callee acts under its
//!   own list only
//! - Delegation can only narrow: registration grants must be subsets of
//!   the registrant's capabilities

pub mod capability;
pub mod codec;
pub mod engine;
pub mod list;

pub use capability::{Capability, CapabilityError, CapabilityKinds, CapabilityType, MAX_LOG_TOPICS};
pub use codec::CodecError;
pub use engine::{authorize, is_authorized, Denied, Request};
pub use list::CapabilityList;
