//! Kernel Configuration
//!
//! Limits fixed at kernel construction.

/// Default nesting limit for calls. The external invocation is depth 0.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Default bound on call payloads and log data, in bytes.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Kernel limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Deepest frame a Call may create.
    pub max_call_depth: usize,
    /// Largest accepted call payload or log data.
    pub max_payload_len: usize,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }

    pub const fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub const fn with_max_payload_len(mut self, len: usize) -> Self {
        self.max_payload_len = len;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
