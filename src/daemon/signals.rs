//! Signal handling: SIGTERM/SIGINT graceful shutdown, SIGUSR1/SIGUSR2 as the
//! board's two push buttons.
//!
//! Uses the `signal-hook` crate for safe signal registration. The render loop
//! polls the flags each tick rather than blocking on signals.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::control::debounce::{SwitchSample, Switches};
use crate::core::clock::ticks_diff;

// ──────────────────── signal handler ────────────────────

/// Signal state shared between the OS hooks and the render loop.
///
/// All flags use `Ordering::Relaxed`: the loop polls them every tick and no
/// ordering with other memory is needed.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
    advance_flag: Arc<AtomicBool>,
    toggle_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register OS signal hooks.
    ///
    /// Registration is best-effort; failures are logged to stderr but not fatal.
    pub fn new() -> Self {
        let handler = Self::unregistered();
        handler.register_signals();
        handler
    }

    /// Handler with no OS hooks; flags are only set programmatically.
    #[must_use]
    pub fn unregistered() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            advance_flag: Arc::new(AtomicBool::new(false)),
            toggle_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Check (and clear) whether the advance button was pressed.
    pub fn take_advance(&self) -> bool {
        self.advance_flag.swap(false, Ordering::Relaxed)
    }

    /// Check (and clear) whether the toggle button was pressed.
    pub fn take_toggle(&self) -> bool {
        self.toggle_flag.swap(false, Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_advance(&self) {
        self.advance_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_toggle(&self) {
        self.toggle_flag.store(true, Ordering::Relaxed);
    }

    fn register_signals(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[DB-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[DB-SIGNAL] failed to register SIGINT: {e}");
        }

        #[cfg(unix)]
        {
            use signal_hook::consts::{SIGUSR1, SIGUSR2};
            if let Err(e) = signal_hook::flag::register(SIGUSR1, Arc::clone(&self.advance_flag)) {
                eprintln!("[DB-SIGNAL] failed to register SIGUSR1: {e}");
            }
            if let Err(e) = signal_hook::flag::register(SIGUSR2, Arc::clone(&self.toggle_flag)) {
                eprintln!("[DB-SIGNAL] failed to register SIGUSR2: {e}");
            }
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────── signal switches ────────────────────

/// A latched press that reads as held for a fixed time.
#[derive(Debug, Clone, Copy, Default)]
struct Hold {
    since_ms: Option<u32>,
}

impl Hold {
    fn level(&mut self, fired: bool, now_ms: u32, hold_ms: u32) -> bool {
        if fired {
            self.since_ms = Some(now_ms);
        }
        match self.since_ms {
            Some(since) if ticks_diff(now_ms, since) < hold_ms => true,
            Some(_) => {
                self.since_ms = None;
                false
            }
            None => false,
        }
    }
}

/// Turns SIGUSR1/SIGUSR2 into switch levels: each signal reads as pressed
/// for `hold_ms`, then released.
pub struct SignalSwitches {
    signals: SignalHandler,
    hold_ms: u32,
    advance: Hold,
    toggle: Hold,
}

impl SignalSwitches {
    #[must_use]
    pub fn new(signals: SignalHandler, hold_ms: u32) -> Self {
        Self {
            signals,
            hold_ms: hold_ms.max(1),
            advance: Hold::default(),
            toggle: Hold::default(),
        }
    }
}

impl Switches for SignalSwitches {
    fn sample(&mut self, now_ms: u32) -> SwitchSample {
        SwitchSample {
            advance: self
                .advance
                .level(self.signals.take_advance(), now_ms, self.hold_ms),
            toggle: self
                .toggle
                .level(self.signals.take_toggle(), now_ms, self.hold_ms),
        }
    }
}
