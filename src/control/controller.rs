//! One render-loop iteration: poll, refresh, rotate, read switches, scroll, paint.
//!
//! [`BoardController`] owns the [`ControllerState`] and every collaborator.
//! Nothing here is fatal: fetch failures retain the current list, paint
//! failures are logged, and the loop keeps going.

#![allow(missing_docs)]

use std::sync::Arc;

use crate::control::debounce::Switches;
use crate::control::refresh::{self, Dispatch, LocalRead, RefreshContext};
use crate::control::rotation::{self, AdvanceReason};
use crate::control::state::ControllerState;
use crate::control::worker::FetchWorker;
use crate::core::clock::{Clock, ticks_diff};
use crate::core::config::{Config, TimingConfig};
use crate::core::errors::BoardError;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::render::{Display, Frame, TextMeasure};
use crate::schedule::list::ServiceList;
use crate::source::arbiter::{DataSourceArbiter, RefreshResult, ServiceProvider, SourceLabel};
use crate::source::link::Link;

/// External collaborators the controller drives.
pub struct Collaborators {
    pub provider: Arc<dyn ServiceProvider>,
    pub link: Arc<dyn Link>,
    pub clock: Arc<dyn Clock>,
    pub display: Box<dyn Display>,
    pub switches: Box<dyn Switches>,
    pub measure: Box<dyn TextMeasure>,
}

/// Read-only collaborators, split from the state so both can be borrowed at once.
struct Wiring {
    timing: TimingConfig,
    fetch_interval_ms: u32,
    rotate_interval_ms: u32,
    arbiter: DataSourceArbiter,
    link: Arc<dyn Link>,
    clock: Arc<dyn Clock>,
    measure: Box<dyn TextMeasure>,
    activity: Option<ActivityLoggerHandle>,
}

pub struct BoardController {
    wiring: Wiring,
    display: Box<dyn Display>,
    switches: Box<dyn Switches>,
    state: ControllerState,
    paint_failing: bool,
}

fn secs_to_ms(secs: u64) -> u32 {
    u32::try_from(secs.saturating_mul(1_000)).unwrap_or(u32::MAX)
}

impl BoardController {
    #[must_use]
    pub fn new(
        config: &Config,
        collaborators: Collaborators,
        activity: Option<ActivityLoggerHandle>,
    ) -> Self {
        let Collaborators {
            provider,
            link,
            clock,
            display,
            switches,
            measure,
        } = collaborators;

        let worker = if config.sources.background_fetch {
            FetchWorker::new()
        } else {
            FetchWorker::disabled()
        };
        let state = ControllerState::new(
            config.defaults.to_service(),
            config.sources.prefer_remote,
            config.timing.debounce_ms,
            worker,
            measure.as_ref(),
            clock.ticks_ms(),
        );

        Self {
            wiring: Wiring {
                timing: config.timing.clone(),
                fetch_interval_ms: secs_to_ms(config.timing.fetch_interval_secs),
                rotate_interval_ms: secs_to_ms(config.timing.rotate_interval_secs),
                arbiter: DataSourceArbiter::new(provider),
                link,
                clock,
                measure,
                activity,
            },
            display,
            switches,
            state,
            paint_failing: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Connect (when a remote exists), run one synchronous fetch, paint.
    pub fn start(&mut self) {
        let w = &self.wiring;
        let now = w.clock.ticks_ms();
        self.state.last_fetch_ms = now;
        self.state.last_rotate_ms = now;

        if w.arbiter.remote_configured() {
            let up = w.link.connect();
            self.state.link_up = up;
            if up && !w.clock.resync() {
                eprintln!("[DB-LOOP] clock resync failed at start-up");
            }
            eprintln!("[DB-LOOP] link {}", if up { "up" } else { "down" });
            w.emit(ActivityEvent::LinkChanged { up });
        }

        let result = w.arbiter.fetch(&self.state.fetch_request());
        w.apply_result(&mut self.state, result, now);
        let now_secs = w.clock.seconds_past_midnight();
        self.paint(now_secs);
    }

    /// One render-loop iteration.
    pub fn tick(&mut self) {
        let now = self.wiring.clock.ticks_ms();
        let w = &self.wiring;
        let state = &mut self.state;

        if let Some(result) = state.worker.poll() {
            w.apply_result(state, result, now);
        }

        if ticks_diff(now, state.last_fetch_ms) >= w.fetch_interval_ms {
            if state.prefer_remote && w.arbiter.remote_configured() {
                w.request_refresh(state, now, false);
            } else {
                w.local_cadence(state, now);
            }
        }

        let now_secs = w.clock.seconds_past_midnight();
        match now_secs {
            Some(secs) => {
                if rotation::auto_advance(state, secs, w.measure.as_ref()) {
                    w.log_advance(state, AdvanceReason::Schedule);
                    w.request_refresh(state, now, false);
                }
            }
            None => {
                if rotation::periodic_rotate(state, now, w.rotate_interval_ms, w.measure.as_ref())
                {
                    w.log_advance(state, AdvanceReason::Rotation);
                }
            }
        }

        let sample = self.switches.sample(now);
        if state.advance_switch.pressed(sample.advance, now) {
            if rotation::manual_advance(state, now, w.measure.as_ref()) {
                w.log_advance(state, AdvanceReason::Manual);
            }
            w.request_refresh(state, now, false);
        }
        if state.toggle_switch.pressed(sample.toggle, now) {
            state.prefer_remote = !state.prefer_remote;
            eprintln!(
                "[DB-LOOP] data source preference: {}",
                if state.prefer_remote { "remote-first" } else { "local-first" }
            );
            w.emit(ActivityEvent::PreferenceToggled {
                prefer_remote: state.prefer_remote,
            });
            w.request_refresh(state, now, true);
        }

        state
            .ticker
            .advance(now, w.timing.ticker_ms, w.timing.ticker_step_px);

        self.paint(now_secs);
    }

    fn paint(&mut self, now_secs: Option<u32>) {
        let state = &self.state;
        let frame = Frame {
            service: state.current(),
            source: state.source,
            ticker_text: state.ticker.text(),
            ticker_offset: state.ticker.offset(),
            ticker_width: state.ticker.width(),
            clock: now_secs,
            index: state.index,
            count: state.services.len(),
            prefer_remote: state.prefer_remote,
        };
        match self.display.paint(&frame) {
            Ok(()) => self.paint_failing = false,
            Err(err) => {
                if !self.paint_failing {
                    eprintln!("[DB-LOOP] paint failed: {err}");
                    if let Some(activity) = &self.wiring.activity {
                        activity.error(&err);
                    }
                }
                self.paint_failing = true;
            }
        }
    }
}

impl Wiring {
    fn emit(&self, event: ActivityEvent) {
        if let Some(activity) = &self.activity {
            activity.send(event);
        }
    }

    fn refresh_ctx(&self) -> RefreshContext<'_> {
        RefreshContext {
            arbiter: &self.arbiter,
            link: self.link.as_ref(),
            clock: self.clock.as_ref(),
            fetch_interval_ms: self.fetch_interval_ms,
        }
    }

    fn log_advance(&self, state: &ControllerState, reason: AdvanceReason) {
        eprintln!(
            "[DB-LOOP] {reason} advance to service {} of {}",
            state.index + 1,
            state.services.len()
        );
        self.emit(ActivityEvent::ServiceAdvanced {
            index: state.index,
            count: state.services.len(),
            reason: reason.to_string(),
        });
    }

    /// Fold a fetch outcome into the state.
    fn apply_result(&self, state: &mut ControllerState, result: RefreshResult, now_ms: u32) {
        if result.wifi_dropped && state.link_up {
            state.link_up = false;
            eprintln!("[DB-FETCH] remote yielded nothing, marking link down");
            self.emit(ActivityEvent::LinkChanged { up: false });
        }
        if let Some(err) = &result.error {
            eprintln!("[DB-FETCH] {err}");
        }
        if result.local_read
            && let Some(list) = &result.services
        {
            state.local_cache = Some(list.clone());
        }

        match result.services {
            Some(list) => self.install(state, list, result.source, now_ms),
            None => {
                let reason = result
                    .error
                    .unwrap_or_else(|| "no service data available".to_string());
                eprintln!("[DB-FETCH] retaining previous services");
                self.emit(ActivityEvent::RefreshRetained { reason });
            }
        }
    }

    fn install(&self, state: &mut ControllerState, list: ServiceList, source: SourceLabel, now_ms: u32) {
        let changed = state.services != list || state.source != source;
        let count = list.len();
        let now_secs = self.clock.seconds_past_midnight();
        rotation::apply_list(state, list, source, now_secs, now_ms, self.measure.as_ref());
        if changed {
            eprintln!("[DB-FETCH] loaded {count} service(s) from {source}");
            self.emit(ActivityEvent::ServicesLoaded {
                source: source.to_string(),
                count,
            });
        }
    }

    fn request_refresh(&self, state: &mut ControllerState, now_ms: u32, force: bool) {
        let link_before = state.link_up;
        let dispatch = refresh::trigger_fetch(&self.refresh_ctx(), state, now_ms, force);
        if state.link_up != link_before {
            self.emit(ActivityEvent::LinkChanged { up: state.link_up });
        }
        match dispatch {
            Dispatch::Skipped(_) => {}
            Dispatch::Background => self.emit(ActivityEvent::FetchDispatched {
                mode: dispatch.to_string(),
            }),
            Dispatch::Completed(result) => {
                self.emit(ActivityEvent::FetchDispatched {
                    mode: "sync".to_string(),
                });
                self.apply_result(state, result, now_ms);
            }
        }
    }

    /// Local-first cadence: re-read storage directly; fall back to a forced
    /// fetch only when there is nothing local at all.
    fn local_cadence(&self, state: &mut ControllerState, now_ms: u32) {
        match refresh::reread_local(&self.refresh_ctx(), state, now_ms) {
            LocalRead::Loaded(list) => self.install(state, list, SourceLabel::Local, now_ms),
            LocalRead::Retained(err) => {
                if let Some(err) = err {
                    self.report(&err);
                }
            }
            LocalRead::Empty(err) => {
                if let Some(err) = err {
                    self.report(&err);
                }
                self.request_refresh(state, now_ms, true);
            }
        }
    }

    fn report(&self, err: &BoardError) {
        eprintln!("[DB-FETCH] {err}");
        if let Some(activity) = &self.activity {
            activity.error(err);
        }
    }
}
