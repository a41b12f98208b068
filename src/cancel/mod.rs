//! Cancellation between archive entries
//!
//! The builder polls a `CancelFlag` before each entry. The CLI raises it from
//! a `ctrlc` handler, built with the `termination` feature so SIGTERM is
//! caught alongside SIGINT; a second signal exits immediately.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Exit code for cancelled builds
pub const EXIT_CODE_CANCELLED: i32 = 80;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    state: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    signal_count: AtomicU8,
}

impl CancelFlag {
    /// Create a flag that is not raised
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Record a signal; returns the action the handler should take
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.state.signal_count.fetch_add(1, Ordering::SeqCst);
        match count {
            0 => {
                self.cancel();
                SignalAction::Cancel
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }

    /// Install a process-wide Ctrl-C handler that raises this flag.
    ///
    /// Can only be installed once per process.
    pub fn install_interrupt_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || match flag.handle_signal() {
            SignalAction::Cancel => {
                eprintln!("\nReceived interrupt, stopping after the current entry...");
            }
            SignalAction::ImmediateExit => {
                eprintln!("\nReceived second interrupt, exiting immediately...");
                std::process::exit(EXIT_CODE_CANCELLED);
            }
            SignalAction::Ignore => {}
        })
    }
}

/// Action to take after a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop between entries
    Cancel,
    /// Second signal: exit now
    ImmediateExit,
    /// Further signals are ignored
    Ignore,
}
