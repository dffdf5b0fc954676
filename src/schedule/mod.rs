//! Service data model: payload normalization, schedule parsing, ordered lists.

pub mod list;
pub mod service;
pub mod timeparse;
