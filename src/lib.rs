#![forbid(unsafe_code)]

//! Departure board (dboard): drives a small LED matrix showing upcoming
//! transit departures.
//!
//! The board cycles through a sorted list of services, scrolls each one's
//! calling points across a ticker row, and refreshes the list from a local
//! JSON file or an HTTP endpoint:
//! 1. **Sources**: local file and remote endpoint behind one arbiter with
//!    a switchable preference and per-source fallback
//! 2. **Schedule**: lenient payload normalisation and `HH:MM` parsing into
//!    a list sorted by departure time
//! 3. **Control**: a non-blocking render loop: background fetches, time
//!    driven rotation, debounced switches, ticker animation
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use departure_board::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use departure_board::core::config::Config;
//! use departure_board::schedule::timeparse::parse_schedule;
//! ```

pub mod prelude;

pub mod control;
pub mod core;
pub mod daemon;
pub mod logger;
pub mod render;
pub mod schedule;
pub mod source;
