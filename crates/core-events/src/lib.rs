//! Core event types shared by the input, dispatch and runtime layers.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod key;
pub mod mouse;

pub use key::{Key, KeyParseError, KeyPress, parse_key_sequence};
pub use mouse::{MouseButton, MouseEvent, MouseEventKind};

/// Capacity of the runtime event channel. Input sources wait when it is full.
pub const EVENT_CHANNEL_CAP: usize = 8192;

// Input counters (relaxed atomics), process wide. Read through `InputStats`.
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static PASTE_SESSIONS: AtomicU64 = AtomicU64::new(0);
pub static PASTE_BYTES: AtomicU64 = AtomicU64::new(0);
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Point-in-time copy of the input counters, logged by the runtime on shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputStats {
    pub keypresses: u64,
    pub paste_sessions: u64,
    pub paste_bytes: u64,
    pub send_failures: u64,
}

impl InputStats {
    pub fn snapshot() -> Self {
        Self {
            keypresses: KEYPRESS_TOTAL.load(Ordering::Relaxed),
            paste_sessions: PASTE_SESSIONS.load(Ordering::Relaxed),
            paste_bytes: PASTE_BYTES.load(Ordering::Relaxed),
            send_failures: CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
        }
    }
}

/// Top-level event consumed by the runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Raw bytes read from the terminal.
    Input(Vec<u8>),
    /// Terminal resize (columns, rows).
    Resize(u16, u16),
    /// Periodic tick used to poll terminal size and expire timeouts.
    Tick,
    /// Input source closed (EOF or read error).
    Shutdown,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ModMask: u8 { const CTRL = 1; const ALT = 2; const SHIFT = 4; }
}
