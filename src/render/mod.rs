//! Render surface: the frame handed to a display and the text metrics it uses.
//!
//! The controller never lays out pixels. It builds a [`Frame`] each tick and
//! passes it to a [`Display`] implementation, which owns the layout.

#![allow(missing_docs)]

#[cfg(feature = "cli")]
pub mod terminal;

use crate::core::errors::Result;
use crate::schedule::service::Service;
use crate::source::arbiter::SourceLabel;

/// Everything a display needs for one paint.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub service: &'a Service,
    pub source: SourceLabel,
    pub ticker_text: &'a str,
    /// Scroll offset in pixels, always `< ticker_width`.
    pub ticker_offset: u32,
    /// Measured ticker width in pixels, at least 1.
    pub ticker_width: u32,
    /// Local seconds past midnight, `None` while wall time is unavailable.
    pub clock: Option<u32>,
    pub index: usize,
    pub count: usize,
    pub prefer_remote: bool,
}

/// Paint target.
pub trait Display {
    fn paint(&mut self, frame: &Frame<'_>) -> Result<()>;
}

/// Pixel width of rendered text.
pub trait TextMeasure {
    fn measure(&self, text: &str) -> u32;
}

/// Fixed-advance bitmap font: every glyph is `glyph_px` wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapFont {
    pub glyph_px: u32,
}

impl Default for BitmapFont {
    fn default() -> Self {
        Self { glyph_px: 6 }
    }
}

impl TextMeasure for BitmapFont {
    fn measure(&self, text: &str) -> u32 {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        chars.saturating_mul(self.glyph_px).max(1)
    }
}

/// Colour class of a status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    OnTime,
    Disrupted,
    Neutral,
}

impl StatusTone {
    #[must_use]
    pub fn classify(status: &str) -> Self {
        let upper = status.to_uppercase();
        if upper.contains("ON") && upper.contains("TIME") {
            Self::OnTime
        } else if ["CANCEL", "DELAY", "LATE"]
            .iter()
            .any(|word| upper.contains(word))
        {
            Self::Disrupted
        } else {
            Self::Neutral
        }
    }
}

/// Visible slice of the doubled ticker text.
///
/// The ticker is painted twice back to back, so the window starting at
/// `offset / glyph_px` wraps seamlessly.
#[must_use]
pub fn ticker_window(text: &str, offset: u32, columns: usize, glyph_px: u32) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || columns == 0 {
        return String::new();
    }
    let start = (offset / glyph_px.max(1)) as usize % chars.len();
    chars.iter().cycle().skip(start).take(columns).collect()
}
