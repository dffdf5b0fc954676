//! Switch debouncing: raw boolean samples in, spaced edges out.

#![allow(missing_docs)]

use crate::core::clock::ticks_diff;

/// Raw levels of the two board switches at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchSample {
    /// Show the next service.
    pub advance: bool,
    /// Flip the local/remote preference.
    pub toggle: bool,
}

/// Physical input seam, sampled once per render-loop tick.
pub trait Switches {
    fn sample(&mut self, now_ms: u32) -> SwitchSample;
}

/// Accepted transition of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

/// Per-input debounce state.
///
/// The stored level only changes when an edge is accepted, so a bounce that
/// settles after the window still produces its edge on the next sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer {
    window_ms: u32,
    last_state: bool,
    last_change_ms: u32,
}

impl Debouncer {
    #[must_use]
    pub fn new(window_ms: u32, initial_state: bool, now_ms: u32) -> Self {
        Self {
            window_ms,
            last_state: initial_state,
            last_change_ms: now_ms,
        }
    }

    /// Feed one raw sample.
    pub fn update(&mut self, raw_state: bool, now_ms: u32) -> Option<Edge> {
        if raw_state == self.last_state
            || ticks_diff(now_ms, self.last_change_ms) <= self.window_ms
        {
            return None;
        }
        self.last_state = raw_state;
        self.last_change_ms = now_ms;
        Some(if raw_state {
            Edge::Pressed
        } else {
            Edge::Released
        })
    }

    /// Convenience: `true` only for an accepted press.
    pub fn pressed(&mut self, raw_state: bool, now_ms: u32) -> bool {
        self.update(raw_state, now_ms) == Some(Edge::Pressed)
    }

    #[must_use]
    pub fn state(&self) -> bool {
        self.last_state
    }
}
