//! Core types: errors, configuration, time sources.

pub mod clock;
pub mod config;
pub mod errors;
