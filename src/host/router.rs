//! Selector Router
//!
//! A module assembled from one handler per function signature. Calls
//! whose selector matches no route fail with
//! [`ResultCode::UNKNOWN_SELECTOR`].
//!
//! Payloads are a flat sequence of 32-byte words; [`arg`] and
//! [`encode_words`] read and build them.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use super::{Host, Module};
use crate::kernel::Context;
use crate::syscall::ResultCode;
use crate::types::{Selector, Word, WORD_LEN};

type Handler<H> = Box<dyn Fn(&mut Context<'_, H>, &[u8]) -> Result<Vec<u8>, ResultCode>>;

/// Selector → handler table.
pub struct Router<H> {
    routes: BTreeMap<Selector, Handler<H>>,
}

impl<H: Host> Router<H> {
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    /// Answer calls to `signature` with `handler`.
    pub fn route<F>(mut self, signature: &str, handler: F) -> Self
    where
        F: Fn(&mut Context<'_, H>, &[u8]) -> Result<Vec<u8>, ResultCode> + 'static,
    {
        self.routes
            .insert(Selector::from_signature(signature), Box::new(handler));
        self
    }
}

impl<H: Host> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> Module<H> for Router<H> {
    fn invoke(
        &self,
        ctx: &mut Context<'_, H>,
        selector: Selector,
        payload: &[u8],
    ) -> Result<Vec<u8>, ResultCode> {
        let handler = self
            .routes
            .get(&selector)
            .ok_or(ResultCode::UNKNOWN_SELECTOR)?;
        handler(ctx, payload)
    }
}

/// The `index`th word argument of a payload.
pub fn arg(payload: &[u8], index: usize) -> Result<Word, ResultCode> {
    let start = index.checked_mul(WORD_LEN).ok_or(ResultCode::BAD_PAYLOAD)?;
    let end = start.checked_add(WORD_LEN).ok_or(ResultCode::BAD_PAYLOAD)?;
    let bytes = payload.get(start..end).ok_or(ResultCode::BAD_PAYLOAD)?;
    let mut word = [0u8; WORD_LEN];
    word.copy_from_slice(bytes);
    Ok(Word::from_bytes(word))
}

/// Concatenate words into a payload.
pub fn encode_words(words: &[Word]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * WORD_LEN);
    for word in words {
        out.extend_from_slice(word.as_bytes());
    }
    out
}
