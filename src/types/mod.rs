//! Value Types
//!
//! Type-safe wrappers for the fixed-width values the kernel passes around:
//! storage words, procedure keys, function selectors and code locations.
//! Keeping them distinct prevents a storage slot from being used where a
//! procedure name is expected.

pub mod key;
pub mod word;

pub use key::{KeyError, Location, ProcedureKey, Selector, KEY_LEN, SELECTOR_LEN};
pub use word::{Word, WORD_LEN};
