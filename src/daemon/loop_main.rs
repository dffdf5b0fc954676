//! Board daemon: wires host collaborators to the controller and runs the
//! render loop until SIGINT/SIGTERM.
//!
//! Threads:
//! - **Render loop** (caller's thread): `tick()` then sleep `tick_ms`
//! - **Fetch worker**: spawned per background refresh, see `control::worker`
//! - **Logger thread**: writes JSONL activity events (via `logger::activity`)

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::control::controller::{BoardController, Collaborators};
use crate::core::clock::SystemClock;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::daemon::signals::{SignalHandler, SignalSwitches};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
use crate::logger::jsonl::JsonlConfig;
use crate::render::{BitmapFont, Display};
use crate::source::provider::{BoardProvider, link_from_config};

// ──────────────────── main daemon struct ────────────────────

pub struct BoardDaemon {
    config: Config,
    controller: BoardController,
    logger_handle: Option<ActivityLoggerHandle>,
    logger_join: Option<thread::JoinHandle<()>>,
    signal_handler: SignalHandler,
    start_time: Instant,
}

impl BoardDaemon {
    /// Build the daemon with host collaborators: file + HTTP provider, TCP
    /// link probe, system clock, signal switches, JSONL activity log.
    pub fn init(config: Config, display: Box<dyn Display>) -> Result<Self> {
        // 1. Logger.
        let (logger_handle, logger_join) = spawn_logger(JsonlConfig {
            path: config.paths.activity_log.clone(),
            ..JsonlConfig::default()
        })?;

        // 2. Signal handler.
        let signal_handler = SignalHandler::new();

        // 3. Collaborators.
        let collaborators = Collaborators {
            provider: Arc::new(BoardProvider::from_config(&config)?),
            link: link_from_config(&config)?,
            clock: Arc::new(SystemClock::new(config.clock.utc_offset_hours)),
            display,
            switches: Box::new(SignalSwitches::new(
                signal_handler.clone(),
                config.timing.switch_hold_ms,
            )),
            measure: Box::new(BitmapFont {
                glyph_px: config.display.glyph_px,
            }),
        };

        let controller = BoardController::new(&config, collaborators, Some(logger_handle.clone()));
        Ok(Self {
            config,
            controller,
            logger_handle: Some(logger_handle),
            logger_join: Some(logger_join),
            signal_handler,
            start_time: Instant::now(),
        })
    }

    /// Build the daemon around caller-supplied collaborators, without a
    /// logger thread. `activity`, when given, receives every event.
    #[must_use]
    pub fn with_collaborators(
        config: Config,
        collaborators: Collaborators,
        signal_handler: SignalHandler,
        activity: Option<ActivityLoggerHandle>,
    ) -> Self {
        let controller = BoardController::new(&config, collaborators, activity.clone());
        Self {
            config,
            controller,
            logger_handle: activity,
            logger_join: None,
            signal_handler,
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn signals(&self) -> &SignalHandler {
        &self.signal_handler
    }

    #[must_use]
    pub fn controller(&self) -> &BoardController {
        &self.controller
    }

    /// Run the render loop until shutdown is requested.
    pub fn run(&mut self) -> Result<()> {
        let config_hash = self.config.stable_hash().unwrap_or_default();
        eprintln!(
            "[DB-LOOP] starting v{} (config_hash={config_hash})",
            env!("CARGO_PKG_VERSION")
        );
        self.emit(ActivityEvent::BoardStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash,
        });

        self.controller.start();

        let tick = Duration::from_millis(self.config.timing.tick_ms);
        // ──────── render loop ────────
        loop {
            if self.signal_handler.should_shutdown() {
                eprintln!("[DB-LOOP] shutdown requested");
                break;
            }
            self.controller.tick();
            thread::sleep(tick);
        }

        self.shutdown("clean shutdown");
        Ok(())
    }

    fn emit(&self, event: ActivityEvent) {
        if let Some(handle) = &self.logger_handle {
            handle.send(event);
        }
    }

    fn shutdown(&mut self, reason: &str) {
        let uptime_secs = self.start_time.elapsed().as_secs();
        self.emit(ActivityEvent::BoardStopped {
            reason: reason.to_string(),
            uptime_secs,
        });

        if let Some(handle) = &self.logger_handle {
            let dropped = handle.dropped_events();
            if dropped > 0 {
                eprintln!("[DB-LOOP] {dropped} activity events dropped");
            }
            if self.logger_join.is_some() {
                handle.shutdown();
            }
        }
        if let Some(join) = self.logger_join.take() {
            let _ = join.join();
        }

        eprintln!("[DB-LOOP] shutdown complete (uptime={uptime_secs}s)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::debounce::{SwitchSample, Switches};
    use crate::core::clock::Clock;
    use crate::core::errors::Result as BoardResult;
    use crate::render::Frame;
    use crate::schedule::service::Service;
    use crate::source::arbiter::ServiceProvider;
    use crate::source::link::AlwaysUp;

    struct Empty;

    impl ServiceProvider for Empty {
        fn remote_configured(&self) -> bool {
            false
        }
        fn load_local(&self) -> BoardResult<Vec<Service>> {
            Ok(Vec::new())
        }
        fn load_remote(&self) -> BoardResult<Vec<Service>> {
            Ok(Vec::new())
        }
    }

    struct Frozen;

    impl Clock for Frozen {
        fn ticks_ms(&self) -> u32 {
            0
        }
        fn seconds_past_midnight(&self) -> Option<u32> {
            None
        }
        fn resync(&self) -> bool {
            true
        }
    }

    struct Sink;

    impl Display for Sink {
        fn paint(&mut self, _frame: &Frame<'_>) -> BoardResult<()> {
            Ok(())
        }
    }

    struct Idle;

    impl Switches for Idle {
        fn sample(&mut self, _now_ms: u32) -> SwitchSample {
            SwitchSample::default()
        }
    }

    #[test]
    fn run_returns_once_shutdown_requested() {
        let signals = SignalHandler::unregistered();
        signals.request_shutdown();
        let (activity, rx) = ActivityLoggerHandle::detached(16);
        let mut daemon = BoardDaemon::with_collaborators(
            Config::default(),
            Collaborators {
                provider: Arc::new(Empty),
                link: Arc::new(AlwaysUp),
                clock: Arc::new(Frozen),
                display: Box::new(Sink),
                switches: Box::new(Idle),
                measure: Box::new(BitmapFont::default()),
            },
            signals,
            Some(activity),
        );
        daemon.run().unwrap();

        let events: Vec<ActivityEvent> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(ActivityEvent::BoardStarted { .. })));
        assert!(matches!(events.last(), Some(ActivityEvent::BoardStopped { .. })));
        assert_eq!(daemon.controller().state().current().destination, "London Euston");
    }
}
