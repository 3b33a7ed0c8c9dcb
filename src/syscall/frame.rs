//! Call Frames
//!
//! Every invocation, external or nested, runs inside a frame recording who
//! called whom and how deep the chain is. The stack is the only record of
//! which procedures are active, so reentrancy (A calls B calls A) needs no
//! global flags: each activation has its own frame.

use alloc::vec::Vec;

use crate::types::ProcedureKey;

/// One activation of a procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallFrame {
    /// The calling procedure; `None` for an external invocation.
    pub caller: Option<ProcedureKey>,
    /// The procedure running in this frame.
    pub callee: ProcedureKey,
    /// 0 for the external invocation, +1 per nested Call.
    pub depth: usize,
}

/// The depth limit was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthExceeded {
    pub limit: usize,
}

/// Stack of active frames.
#[derive(Clone, Debug, Default)]
pub struct FrameStack {
    frames: Vec<CallFrame>,
}

impl FrameStack {
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Push a frame for `callee`, refusing to go deeper than `max_depth`.
    pub fn push(
        &mut self,
        caller: Option<ProcedureKey>,
        callee: ProcedureKey,
        max_depth: usize,
    ) -> Result<CallFrame, DepthExceeded> {
        let depth = self.frames.len();
        if depth > max_depth {
            return Err(DepthExceeded { limit: max_depth });
        }
        let frame = CallFrame {
            caller,
            callee,
            depth,
        };
        self.frames.push(frame);
        Ok(frame)
    }

    /// Pop the innermost frame.
    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// The innermost frame.
    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Number of active frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from outermost to innermost.
    pub fn iter(&self) -> core::slice::Iter<'_, CallFrame> {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ProcedureKey {
        ProcedureKey::new(name).unwrap()
    }

    #[test]
    fn test_depths_follow_nesting() {
        let mut stack = FrameStack::new();
        let root = stack.push(None, key("a"), 8).unwrap();
        let inner = stack.push(Some(key("a")), key("b"), 8).unwrap();
        let again = stack.push(Some(key("b")), key("a"), 8).unwrap();

        assert_eq!((root.depth, inner.depth, again.depth), (0, 1, 2));
        assert_eq!(stack.current(), Some(&again));
        assert_eq!(stack.iter().filter(|f| f.callee == key("a")).count(), 2);

        stack.pop();
        stack.pop();
        assert_eq!(stack.current(), Some(&root));
        stack.pop();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let mut stack = FrameStack::new();
        assert!(stack.push(None, key("a"), 1).is_ok());
        assert!(stack.push(Some(key("a")), key("a"), 1).is_ok());
        assert_eq!(
            stack.push(Some(key("a")), key("a"), 1),
            Err(DepthExceeded { limit: 1 })
        );
        assert_eq!(stack.len(), 2);
    }
}
