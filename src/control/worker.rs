//! Background fetch coordinator with a single-slot mailbox.
//!
//! The render loop and at most one worker thread share a capacity-1 channel
//! and an in-flight flag behind one `parking_lot::Mutex`. A new fetch is
//! refused while one is running or its result is still unconsumed, so the
//! worker's send can never find the slot full.

#![allow(missing_docs)]

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;

use crate::core::errors::{BoardError, Result};
use crate::source::arbiter::RefreshResult;

const WORKER_THREAD_NAME: &str = "dboard-fetch";

pub struct FetchWorker {
    enabled: bool,
    tx: Sender<RefreshResult>,
    rx: Receiver<RefreshResult>,
    in_flight: Arc<Mutex<bool>>,
}

impl std::fmt::Debug for FetchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchWorker")
            .field("enabled", &self.enabled)
            .field("in_flight", &self.is_in_flight())
            .field("pending", &!self.rx.is_empty())
            .finish()
    }
}

impl FetchWorker {
    /// Worker backed by a spawned thread per fetch.
    #[must_use]
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Coordinator that never starts a thread; callers fetch synchronously.
    #[must_use]
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        let (tx, rx) = bounded(1);
        Self {
            enabled,
            tx,
            rx,
            in_flight: Arc::new(Mutex::new(false)),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        *self.in_flight.lock()
    }

    /// Start `fetch` on a worker thread.
    ///
    /// Returns `true` when a fetch is already running or pending, or one was
    /// started; `false` only when background execution is unavailable.
    pub fn start<F>(&self, fetch: F) -> bool
    where
        F: FnOnce() -> Result<RefreshResult> + Send + 'static,
    {
        if !self.enabled {
            return false;
        }
        let mut in_flight = self.in_flight.lock();
        if *in_flight || !self.rx.is_empty() {
            return true;
        }

        let tx = self.tx.clone();
        let flag = Arc::clone(&self.in_flight);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_main(fetch, &tx, &flag));
        match spawned {
            Ok(_) => {
                *in_flight = true;
                true
            }
            Err(e) => {
                eprintln!("[DB-FETCH] failed to spawn fetch worker: {e}");
                false
            }
        }
    }

    /// Take the pending result, if any. Never blocks on the fetch itself.
    pub fn poll(&self) -> Option<RefreshResult> {
        let _guard = self.in_flight.lock();
        self.rx.try_recv().ok()
    }
}

impl Default for FetchWorker {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_main<F>(fetch: F, tx: &Sender<RefreshResult>, in_flight: &Mutex<bool>)
where
    F: FnOnce() -> Result<RefreshResult>,
{
    let result = match panic::catch_unwind(AssertUnwindSafe(fetch)) {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => RefreshResult::failed(
            BoardError::WorkerFailure {
                details: err.to_string(),
            }
            .to_string(),
        ),
        Err(payload) => RefreshResult::failed(
            BoardError::WorkerFailure {
                details: format!("fetch panicked: {}", panic_message(payload.as_ref())),
            }
            .to_string(),
        ),
    };

    let mut flag = in_flight.lock();
    *flag = false;
    if let Err(TrySendError::Full(_)) = tx.try_send(result) {
        eprintln!("[DB-FETCH] mailbox occupied, dropping fetch result");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
