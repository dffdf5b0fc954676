//! Refresh scheduling: when a fetch is due and where it runs.

#![allow(missing_docs)]

use std::fmt;

use crate::control::state::ControllerState;
use crate::core::clock::{Clock, ticks_diff};
use crate::core::errors::BoardError;
use crate::schedule::list::ServiceList;
use crate::source::arbiter::{DataSourceArbiter, RefreshResult};
use crate::source::link::Link;

/// Collaborators a refresh needs, borrowed from the controller.
pub struct RefreshContext<'a> {
    pub arbiter: &'a DataSourceArbiter,
    pub link: &'a dyn Link,
    pub clock: &'a dyn Clock,
    pub fetch_interval_ms: u32,
}

/// Why `trigger_fetch` did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoRemote,
    NotPreferred,
    NotDue,
}

/// What `trigger_fetch` did.
#[derive(Debug)]
pub enum Dispatch {
    Skipped(SkipReason),
    /// Handed to the worker; the result arrives through `poll()`.
    Background,
    /// Ran on the render loop; apply this result now.
    Completed(RefreshResult),
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped ({reason:?})"),
            Self::Background => f.write_str("background"),
            Self::Completed(_) => f.write_str("sync"),
        }
    }
}

/// Request a remote-capable fetch.
///
/// Skips when no remote is configured, or (unless `force`) when the board is
/// local-first or the fetch interval has not elapsed. A down link gets one
/// reconnect attempt first. The fetch tick is stamped once dispatched.
pub fn trigger_fetch(
    ctx: &RefreshContext<'_>,
    state: &mut ControllerState,
    now_ms: u32,
    force: bool,
) -> Dispatch {
    if !ctx.arbiter.remote_configured() {
        return Dispatch::Skipped(SkipReason::NoRemote);
    }
    if !force && !state.prefer_remote {
        return Dispatch::Skipped(SkipReason::NotPreferred);
    }
    if !force && ticks_diff(now_ms, state.last_fetch_ms) < ctx.fetch_interval_ms {
        return Dispatch::Skipped(SkipReason::NotDue);
    }

    if !state.link_up {
        state.link_up = ctx.link.connect();
        if state.link_up && !ctx.clock.resync() {
            eprintln!("[DB-FETCH] link restored but clock resync failed");
        }
    }

    let request = state.fetch_request();
    state.last_fetch_ms = now_ms;

    let arbiter = ctx.arbiter.clone();
    let background_request = request.clone();
    if state
        .worker
        .start(move || Ok(arbiter.fetch(&background_request)))
    {
        Dispatch::Background
    } else {
        Dispatch::Completed(ctx.arbiter.fetch(&request))
    }
}

/// Outcome of the direct local re-read used by local-first boards.
#[derive(Debug)]
pub enum LocalRead {
    /// Fresh list from storage; the cache has been refreshed.
    Loaded(ServiceList),
    /// Storage empty or unreadable but a cached list exists.
    Retained(Option<BoardError>),
    /// Nothing local at all; the caller should force a fetch.
    Empty(Option<BoardError>),
}

/// Re-read local storage directly, bypassing the arbiter policy.
pub fn reread_local(
    ctx: &RefreshContext<'_>,
    state: &mut ControllerState,
    now_ms: u32,
) -> LocalRead {
    state.last_fetch_ms = now_ms;
    match ctx.arbiter.read_local() {
        (Some(list), _) => {
            state.local_cache = Some(list.clone());
            LocalRead::Loaded(list)
        }
        (None, err) if state.local_cache.is_some() => LocalRead::Retained(err),
        (None, err) => LocalRead::Empty(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::worker::FetchWorker;
    use crate::core::errors::Result;
    use crate::render::BitmapFont;
    use crate::schedule::service::Service;
    use crate::source::arbiter::{ServiceProvider, SourceLabel};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct Provider {
        remote: bool,
        local: Mutex<Vec<Service>>,
        remote_calls: AtomicU32,
    }

    impl ServiceProvider for Provider {
        fn remote_configured(&self) -> bool {
            self.remote
        }
        fn load_local(&self) -> Result<Vec<Service>> {
            Ok(self.local.lock().clone())
        }
        fn load_remote(&self) -> Result<Vec<Service>> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![svc("10:00", "Remote")])
        }
    }

    struct FlagLink(AtomicBool, AtomicU32);

    impl Link for FlagLink {
        fn connect(&self) -> bool {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0.load(Ordering::SeqCst)
        }
    }

    struct FixedClock(AtomicU32);

    impl Clock for FixedClock {
        fn ticks_ms(&self) -> u32 {
            0
        }
        fn seconds_past_midnight(&self) -> Option<u32> {
            None
        }
        fn resync(&self) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn svc(scheduled: &str, destination: &str) -> Service {
        Service {
            scheduled: scheduled.to_string(),
            destination: destination.to_string(),
            status: "On time".to_string(),
            calling: "Rugby".to_string(),
        }
    }

    struct Fixture {
        provider: Arc<Provider>,
        arbiter: DataSourceArbiter,
        link: FlagLink,
        clock: FixedClock,
        state: ControllerState,
    }

    impl Fixture {
        fn new(remote: bool, prefer_remote: bool) -> Self {
            let provider = Arc::new(Provider {
                remote,
                local: Mutex::new(Vec::new()),
                remote_calls: AtomicU32::new(0),
            });
            Self {
                arbiter: DataSourceArbiter::new(provider.clone()),
                provider,
                link: FlagLink(AtomicBool::new(true), AtomicU32::new(0)),
                clock: FixedClock(AtomicU32::new(0)),
                state: ControllerState::new(
                    svc("12:24", "Default"),
                    prefer_remote,
                    200,
                    FetchWorker::disabled(),
                    &BitmapFont::default(),
                    0,
                ),
            }
        }

        fn trigger(&mut self, now: u32, force: bool) -> Dispatch {
            let ctx = RefreshContext {
                arbiter: &self.arbiter,
                link: &self.link,
                clock: &self.clock,
                fetch_interval_ms: 30_000,
            };
            trigger_fetch(&ctx, &mut self.state, now, force)
        }

        fn reread(&mut self, now: u32) -> LocalRead {
            let ctx = RefreshContext {
                arbiter: &self.arbiter,
                link: &self.link,
                clock: &self.clock,
                fetch_interval_ms: 30_000,
            };
            reread_local(&ctx, &mut self.state, now)
        }
    }

    #[test]
    fn no_remote_is_noop_even_when_forced() {
        let mut fx = Fixture::new(false, true);
        assert!(matches!(
            fx.trigger(60_000, true),
            Dispatch::Skipped(SkipReason::NoRemote)
        ));
        assert_eq!(fx.state.last_fetch_ms, 0);
    }

    #[test]
    fn local_first_needs_force() {
        let mut fx = Fixture::new(true, false);
        assert!(matches!(
            fx.trigger(60_000, false),
            Dispatch::Skipped(SkipReason::NotPreferred)
        ));
        assert!(matches!(fx.trigger(60_000, true), Dispatch::Completed(_)));
    }

    #[test]
    fn interval_gates_unforced_fetches() {
        let mut fx = Fixture::new(true, true);
        fx.state.link_up = true;
        assert!(matches!(
            fx.trigger(29_999, false),
            Dispatch::Skipped(SkipReason::NotDue)
        ));
        let Dispatch::Completed(result) = fx.trigger(30_000, false) else {
            panic!("expected sync fetch");
        };
        assert_eq!(result.source, SourceLabel::Remote);
        assert_eq!(fx.state.last_fetch_ms, 30_000);
        assert!(matches!(
            fx.trigger(30_500, false),
            Dispatch::Skipped(SkipReason::NotDue)
        ));
    }

    #[test]
    fn interval_survives_tick_wraparound() {
        let mut fx = Fixture::new(true, true);
        fx.state.link_up = true;
        fx.state.last_fetch_ms = u32::MAX - 10_000;
        assert!(matches!(
            fx.trigger(10_000, false),
            Dispatch::Skipped(SkipReason::NotDue)
        ));
        assert!(matches!(fx.trigger(20_000, false), Dispatch::Completed(_)));
    }

    #[test]
    fn down_link_reconnects_and_resyncs_first() {
        let mut fx = Fixture::new(true, true);
        assert!(!fx.state.link_up);
        let _ = fx.trigger(0, true);
        assert!(fx.state.link_up);
        assert_eq!(fx.link.1.load(Ordering::SeqCst), 1);
        assert_eq!(fx.clock.0.load(Ordering::SeqCst), 1);
        assert_eq!(fx.provider.remote_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_reconnect_still_stamps_fetch() {
        let mut fx = Fixture::new(true, true);
        fx.link.0.store(false, Ordering::SeqCst);
        let Dispatch::Completed(result) = fx.trigger(40_000, false) else {
            panic!("expected sync fetch");
        };
        assert!(result.is_empty());
        assert_eq!(fx.clock.0.load(Ordering::SeqCst), 0);
        assert_eq!(fx.state.last_fetch_ms, 40_000);
        assert_eq!(fx.provider.remote_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn background_dispatch_when_worker_available() {
        let mut fx = Fixture::new(true, true);
        fx.state.worker = FetchWorker::new();
        fx.state.link_up = true;
        assert!(matches!(fx.trigger(0, true), Dispatch::Background));
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let result = loop {
            if let Some(result) = fx.state.worker.poll() {
                break result;
            }
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(std::time::Duration::from_millis(2));
        };
        assert_eq!(result.source, SourceLabel::Remote);
    }

    #[test]
    fn reread_refreshes_cache_or_reports_empty() {
        let mut fx = Fixture::new(false, false);
        assert!(matches!(fx.reread(100), LocalRead::Empty(None)));
        assert_eq!(fx.state.last_fetch_ms, 100);

        *fx.provider.local.lock() = vec![svc("09:00", "Local")];
        assert!(matches!(fx.reread(200), LocalRead::Loaded(_)));
        assert!(fx.state.local_cache.is_some());

        fx.provider.local.lock().clear();
        assert!(matches!(fx.reread(300), LocalRead::Retained(None)));
    }
}
