//! Kernel Console
//!
//! A bounded in-memory text sink standing where a serial port would sit
//! on hardware. The embedder drains it to wherever output belongs.
//!
//! # Security Considerations
//! - Bounded: once full, the oldest text is discarded
//! - Uses spinlock for thread-safe access

use alloc::string::String;
use core::fmt::{self, Write};

use spin::Mutex;

/// Bytes retained before the oldest output is dropped.
pub const CONSOLE_CAPACITY: usize = 16 * 1024;

/// Console text buffer.
pub struct Console {
    buf: String,
    capacity: usize,
    dropped: usize,
}

impl Console {
    /// Create an empty console holding at most `capacity` bytes.
    pub const fn new(capacity: usize) -> Self {
        Self {
            buf: String::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Append text, discarding the oldest bytes past capacity.
    pub fn write_str(&mut self, s: &str) {
        self.buf.push_str(s);
        if self.buf.len() > self.capacity {
            let mut cut = self.buf.len() - self.capacity;
            while !self.buf.is_char_boundary(cut) {
                cut += 1;
            }
            self.buf.drain(..cut);
            self.dropped += cut;
        }
    }

    /// Text currently held.
    pub fn contents(&self) -> &str {
        &self.buf
    }

    /// Take all held text, leaving the console empty.
    pub fn take(&mut self) -> String {
        core::mem::take(&mut self.buf)
    }

    /// Total bytes discarded for lack of space.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Console::write_str(self, s);
        Ok(())
    }
}

/// Global console instance protected by spinlock
pub static CONSOLE: Mutex<Console> = Mutex::new(Console::new(CONSOLE_CAPACITY));

/// Take everything written to the global console so far.
pub fn drain() -> String {
    CONSOLE.lock().take()
}

/// Print macro for kernel output
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut console = $crate::console::CONSOLE.lock();
        let _ = write!(console, $($arg)*);
    }};
}

/// Println macro for kernel output
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}
