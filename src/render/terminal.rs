//! Terminal stand-in for the LED panel.
//!
//! Four fixed rows drawn with `crossterm`: departure line, status line,
//! calling-points ticker, clock. Rows are only rewritten when their text
//! changes, so an idle board costs nothing but the ticker row.

#![allow(missing_docs)]

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Attribute, Color, Print, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::core::clock::format_clock;
use crate::core::config::DisplayConfig;
use crate::core::errors::{BoardError, Result};
use crate::render::{Display, Frame, StatusTone, ticker_window};
use crate::source::arbiter::SourceLabel;

const ROWS: usize = 4;
const SOURCE_DOT: &str = "●";

fn source_color(source: SourceLabel) -> Color {
    match source {
        SourceLabel::Remote => Color::Green,
        SourceLabel::Local => Color::Blue,
        SourceLabel::None => Color::DarkYellow,
    }
}

fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::OnTime => Color::Green,
        StatusTone::Disrupted => Color::Red,
        StatusTone::Neutral => Color::DarkYellow,
    }
}

fn paint_error(err: &io::Error) -> BoardError {
    BoardError::Runtime {
        details: format!("terminal paint failed: {err}"),
    }
}

/// One painted row: text plus the colour of its leading segment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    lead: String,
    lead_color: Color,
    rest: String,
}

/// Lay a frame out into rows, `columns` characters wide.
fn layout(frame: &Frame<'_>, columns: usize, glyph_px: u32) -> [Row; ROWS] {
    let service = frame.service;
    let preference = if frame.prefer_remote { "R" } else { "L" };
    let position = format!("{}/{} {preference}", frame.index + 1, frame.count.max(1));
    let status_width = columns.saturating_sub(position.len() + 1);
    let status = format!("{:<status_width$}", service.status);
    let departure = format!(" {:<5} {}", service.scheduled, service.destination);
    [
        Row {
            lead: SOURCE_DOT.to_string(),
            lead_color: source_color(frame.source),
            rest: fit(&departure, columns.saturating_sub(1)),
        },
        Row {
            lead: fit(&status, status_width),
            lead_color: tone_color(StatusTone::classify(&service.status)),
            rest: format!(" {position}"),
        },
        Row {
            lead: ticker_window(frame.ticker_text, frame.ticker_offset, columns, glyph_px),
            lead_color: Color::Yellow,
            rest: String::new(),
        },
        Row {
            lead: format_clock(frame.clock),
            lead_color: Color::White,
            rest: String::new(),
        },
    ]
}

/// Truncate to at most `columns` characters.
fn fit(text: &str, columns: usize) -> String {
    text.chars().take(columns).collect()
}

pub struct TerminalDisplay<W: Write> {
    out: W,
    columns: usize,
    glyph_px: u32,
    no_color: bool,
    alternate_screen: bool,
    painted: Option<[Row; ROWS]>,
}

impl TerminalDisplay<io::Stdout> {
    /// Full-screen display on stdout. The terminal is restored on drop.
    pub fn stdout(config: &DisplayConfig, no_color: bool) -> Result<Self> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))
            .map_err(|e| paint_error(&e))?;
        let mut display = Self::new(out, config, no_color);
        display.alternate_screen = true;
        Ok(display)
    }
}

impl<W: Write> TerminalDisplay<W> {
    /// Display over any writer; no screen switching.
    #[must_use]
    pub fn new(out: W, config: &DisplayConfig, no_color: bool) -> Self {
        let glyph_px = config.glyph_px.max(1);
        Self {
            out,
            columns: (config.width_px / glyph_px).max(1) as usize,
            glyph_px,
            no_color,
            alternate_screen: false,
            painted: None,
        }
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn draw_row(&mut self, row_index: usize, row: &Row) -> io::Result<()> {
        let y = u16::try_from(row_index).unwrap_or(u16::MAX);
        queue!(self.out, MoveTo(0, y), Clear(ClearType::CurrentLine))?;
        if self.no_color {
            queue!(self.out, Print(&row.lead), Print(&row.rest))?;
        } else {
            queue!(
                self.out,
                SetForegroundColor(row.lead_color),
                SetAttribute(Attribute::Bold),
                Print(&row.lead),
                SetAttribute(Attribute::Reset),
                Print(&row.rest),
            )?;
        }
        Ok(())
    }

    fn draw(&mut self, rows: &[Row; ROWS]) -> io::Result<()> {
        for (index, row) in rows.iter().enumerate() {
            let stale = self
                .painted
                .as_ref()
                .is_none_or(|painted| painted[index] != *row);
            if stale {
                self.draw_row(index, row)?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write> Display for TerminalDisplay<W> {
    fn paint(&mut self, frame: &Frame<'_>) -> Result<()> {
        let rows = layout(frame, self.columns, self.glyph_px);
        if self.painted.as_ref() == Some(&rows) {
            return Ok(());
        }
        match self.draw(&rows) {
            Ok(()) => {
                self.painted = Some(rows);
                Ok(())
            }
            Err(e) => {
                // Force a full repaint once the terminal recovers.
                self.painted = None;
                Err(paint_error(&e))
            }
        }
    }
}

impl<W: Write> Drop for TerminalDisplay<W> {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(self.out, Show, LeaveAlternateScreen);
        }
    }
}
