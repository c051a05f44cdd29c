//! Shared application state.
//!
//! The original desktop shell kept process-wide mutable globals for the
//! quitting and dev-mode flags. Here they live in an explicit [`AppState`]
//! passed by `Arc` into the orchestrator and the router: the orchestrator
//! (and quit handling) writes, everything else reads.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct AppState {
    quitting: AtomicBool,
    dev_mode: bool,
}

impl AppState {
    pub fn new(dev_mode: bool) -> Self {
        AppState {
            quitting: AtomicBool::new(false),
            dev_mode,
        }
    }

    /// Mark the process as quitting. Returns `true` only for the call that
    /// actually flipped the flag, so callers can run teardown exactly once.
    pub fn request_quit(&self) -> bool {
        !self.quitting.swap(true, Ordering::SeqCst)
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }
}
