//! Activity logging through a dedicated logger thread.
//!
//! The thread owns the [`JsonlWriter`]. Everyone else holds an
//! [`ActivityLoggerHandle`] and sends [`ActivityEvent`]s over a bounded
//! crossbeam channel with `try_send`, so the render loop never waits on I/O.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{BoardError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, LogFields, Severity};

// ──────────────────── channel capacity ────────────────────

const CHANNEL_CAPACITY: usize = 256;

// ──────────────────── public event type ────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    BoardStarted {
        version: String,
        config_hash: String,
    },
    BoardStopped {
        reason: String,
        uptime_secs: u64,
    },
    ServicesLoaded {
        source: String,
        count: usize,
    },
    RefreshRetained {
        reason: String,
    },
    ServiceAdvanced {
        index: usize,
        count: usize,
        reason: String,
    },
    PreferenceToggled {
        prefer_remote: bool,
    },
    LinkChanged {
        up: bool,
    },
    FetchDispatched {
        mode: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

// ──────────────────── public handle ────────────────────

/// Cheaply-cloneable handle for sending log events. Never blocks.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Handle plus the receiving end, without a thread. Used by tests and
    /// embedders that drain events themselves.
    #[must_use]
    pub fn detached(capacity: usize) -> (Self, Receiver<ActivityEvent>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped_events: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Send an event. A full channel drops it and bumps the counter.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }

    /// Log a [`BoardError`] under its stable code.
    pub fn error(&self, err: &BoardError) {
        self.send(ActivityEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        });
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and stop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread. It runs until `shutdown()` or every sender drops.
pub fn spawn_logger(
    config: JsonlConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(CHANNEL_CAPACITY);
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("dboard-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config, &dropped_clone))
        .map_err(|e| BoardError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

// ──────────────────── logger thread ────────────────────

fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            jsonl.write_entry(&LogEntry::with(
                EventType::Error,
                Severity::Warning,
                LogFields {
                    details: Some(format!("{lost} activity events dropped (channel full)")),
                    ..LogFields::default()
                },
            ));
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.fsync();
}

// ──────────────────── event conversion ────────────────────

#[must_use]
pub fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    let (kind, severity, fields) = match event {
        ActivityEvent::BoardStarted {
            version,
            config_hash,
        } => (
            EventType::BoardStart,
            Severity::Info,
            LogFields {
                details: Some(format!("version={version} config_hash={config_hash}")),
                ok: Some(true),
                ..LogFields::default()
            },
        ),
        ActivityEvent::BoardStopped {
            reason,
            uptime_secs,
        } => (
            EventType::BoardStop,
            Severity::Info,
            LogFields {
                reason: Some(reason.clone()),
                details: Some(format!("uptime={uptime_secs}s")),
                ok: Some(true),
                ..LogFields::default()
            },
        ),
        ActivityEvent::ServicesLoaded { source, count } => (
            EventType::ServicesLoaded,
            Severity::Info,
            LogFields {
                source: Some(source.clone()),
                count: Some(*count),
                ok: Some(true),
                ..LogFields::default()
            },
        ),
        ActivityEvent::RefreshRetained { reason } => (
            EventType::RefreshRetained,
            Severity::Warning,
            LogFields {
                reason: Some(reason.clone()),
                ok: Some(false),
                ..LogFields::default()
            },
        ),
        ActivityEvent::ServiceAdvanced {
            index,
            count,
            reason,
        } => (
            EventType::ServiceAdvance,
            Severity::Info,
            LogFields {
                index: Some(*index),
                count: Some(*count),
                reason: Some(reason.clone()),
                ..LogFields::default()
            },
        ),
        ActivityEvent::PreferenceToggled { prefer_remote } => (
            EventType::PreferenceToggle,
            Severity::Info,
            LogFields {
                prefer_remote: Some(*prefer_remote),
                ..LogFields::default()
            },
        ),
        ActivityEvent::LinkChanged { up } => (
            EventType::LinkChange,
            if *up { Severity::Info } else { Severity::Warning },
            LogFields {
                link_up: Some(*up),
                ..LogFields::default()
            },
        ),
        ActivityEvent::FetchDispatched { mode } => (
            EventType::FetchDispatch,
            Severity::Info,
            LogFields {
                mode: Some(mode.clone()),
                ..LogFields::default()
            },
        ),
        ActivityEvent::Error { code, message } => (
            EventType::Error,
            Severity::Critical,
            LogFields {
                error_code: Some(code.clone()),
                error_message: Some(message.clone()),
                ok: Some(false),
                ..LogFields::default()
            },
        ),
        // The thread loop stops on this before converting.
        ActivityEvent::Shutdown => (EventType::BoardStop, Severity::Info, LogFields::default()),
    };
    LogEntry::with(kind, severity, fields)
}
