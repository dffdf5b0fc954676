//! The single mutable aggregate owned by the render loop.

#![allow(missing_docs)]

use crate::control::debounce::Debouncer;
use crate::control::ticker::TickerState;
use crate::control::worker::FetchWorker;
use crate::render::TextMeasure;
use crate::schedule::list::ServiceList;
use crate::schedule::service::Service;
use crate::source::arbiter::{FetchRequest, SourceLabel};

/// Controller state. Components receive it by `&mut` and keep nothing else.
#[derive(Debug)]
pub struct ControllerState {
    pub services: ServiceList,
    /// Always `< services.len()`.
    pub index: usize,
    pub ticker: TickerState,
    pub source: SourceLabel,
    pub prefer_remote: bool,
    pub link_up: bool,
    /// Last successful local-storage read.
    pub local_cache: Option<ServiceList>,
    pub last_fetch_ms: u32,
    pub last_rotate_ms: u32,
    pub advance_switch: Debouncer,
    pub toggle_switch: Debouncer,
    pub worker: FetchWorker,
}

impl ControllerState {
    /// Fresh state showing `default_service` until the first refresh.
    #[must_use]
    pub fn new(
        default_service: Service,
        prefer_remote: bool,
        debounce_ms: u32,
        worker: FetchWorker,
        measure: &dyn TextMeasure,
        now_ms: u32,
    ) -> Self {
        let ticker = TickerState::new(&default_service.calling, measure, now_ms);
        Self {
            services: ServiceList::single(default_service),
            index: 0,
            ticker,
            source: SourceLabel::None,
            prefer_remote,
            link_up: false,
            local_cache: None,
            last_fetch_ms: now_ms,
            last_rotate_ms: now_ms,
            advance_switch: Debouncer::new(debounce_ms, false, now_ms),
            toggle_switch: Debouncer::new(debounce_ms, false, now_ms),
            worker,
        }
    }

    #[must_use]
    pub fn current(&self) -> &Service {
        self.services.get(self.index)
    }

    /// Owned snapshot for a fetch, safe to move onto the worker thread.
    #[must_use]
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            prefer_remote: self.prefer_remote,
            link_up: self.link_up,
            local_cache: self.local_cache.clone(),
        }
    }
}
