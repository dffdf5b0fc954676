//! Calling-points marquee: text, measured width, scroll offset.

#![allow(missing_docs)]

use crate::core::clock::ticks_diff;
use crate::render::TextMeasure;

const CALLING_PREFIX: &str = "CALLING AT:";
const NO_CALLING_POINTS: &str = "NO CALLING POINTS";
const TRAILING_PAD: &str = "   |   ";

/// Build the ticker string for a calling-points field.
#[must_use]
pub fn build_ticker_text(calling: &str) -> String {
    let trimmed = calling.trim();
    let body = match trimmed.get(..CALLING_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(CALLING_PREFIX) => {
            trimmed[CALLING_PREFIX.len()..].trim_start()
        }
        _ => trimmed,
    };
    let upper = body.to_uppercase();
    let body = if upper.is_empty() {
        NO_CALLING_POINTS
    } else {
        upper.as_str()
    };
    format!("{CALLING_PREFIX} {body}{TRAILING_PAD}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerState {
    text: String,
    width: u32,
    offset: u32,
    last_step_ms: u32,
}

impl TickerState {
    #[must_use]
    pub fn new(calling: &str, measure: &dyn TextMeasure, now_ms: u32) -> Self {
        let mut ticker = Self {
            text: String::new(),
            width: 1,
            offset: 0,
            last_step_ms: now_ms,
        };
        ticker.retext(calling, measure);
        ticker
    }

    /// Replace the text for a new service and rewind to offset zero.
    pub fn retext(&mut self, calling: &str, measure: &dyn TextMeasure) {
        self.text = build_ticker_text(calling);
        self.width = measure.measure(&self.text).max(1);
        self.offset = 0;
    }

    /// Step once per `interval_ms`; returns whether the offset moved.
    pub fn advance(&mut self, now_ms: u32, interval_ms: u32, step_px: u32) -> bool {
        if ticks_diff(now_ms, self.last_step_ms) < interval_ms {
            return false;
        }
        self.last_step_ms = now_ms;
        self.offset = (self.offset + step_px % self.width) % self.width;
        true
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }
}
