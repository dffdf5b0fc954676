//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use departure_board::prelude::*;
//! ```

// Core
pub use crate::core::clock::{Clock, SystemClock};
pub use crate::core::config::Config;
pub use crate::core::errors::{BoardError, Result};

// Schedule
pub use crate::schedule::list::ServiceList;
pub use crate::schedule::service::{Service, extract_services};
pub use crate::schedule::timeparse::parse_schedule;

// Sources
pub use crate::source::arbiter::{
    DataSourceArbiter, FetchRequest, RefreshResult, ServiceProvider, SourceLabel,
};
pub use crate::source::link::Link;
pub use crate::source::provider::BoardProvider;

// Control
pub use crate::control::controller::{BoardController, Collaborators};
pub use crate::control::debounce::{SwitchSample, Switches};

// Render
pub use crate::render::{BitmapFont, Display, Frame, TextMeasure};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
