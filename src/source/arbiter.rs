//! Data-source arbitration between the local file and the remote endpoint.
//!
//! One [`DataSourceArbiter::fetch`] call produces one [`RefreshResult`]. It
//! never fails: every loader error is folded into the result's `error` text
//! and an empty service list with [`SourceLabel::None`].

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::{BoardError, Result};
use crate::schedule::list::ServiceList;
use crate::schedule::service::Service;

/// Loader seam: the local file and the remote endpoint.
pub trait ServiceProvider: Send + Sync {
    /// Whether a remote endpoint exists at all.
    fn remote_configured(&self) -> bool;

    /// Read and normalize local storage. A missing file is `Ok(vec![])`.
    fn load_local(&self) -> Result<Vec<Service>>;

    /// Fetch and normalize the remote payload.
    fn load_remote(&self) -> Result<Vec<Service>>;
}

/// Which provider supplied a service list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLabel {
    Local,
    Remote,
    None,
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::None => "none",
        };
        f.write_str(label)
    }
}

/// Snapshot of controller state a fetch needs. Owned so it can cross threads.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub prefer_remote: bool,
    /// Connectivity flag at dispatch time.
    pub link_up: bool,
    /// Last successfully read local list.
    pub local_cache: Option<ServiceList>,
}

/// Outcome of one fetch attempt, sync or async.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshResult {
    /// `None` when no provider produced anything.
    pub services: Option<ServiceList>,
    pub source: SourceLabel,
    /// A remote attempt was made and yielded nothing; clear the link flag.
    pub wifi_dropped: bool,
    pub error: Option<String>,
    /// `services` came from a fresh local-storage read (refresh the cache).
    pub local_read: bool,
}

impl RefreshResult {
    /// Empty result carrying a failure message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            services: None,
            source: SourceLabel::None,
            wifi_dropped: false,
            error: Some(message.into()),
            local_read: false,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_none()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.services.as_ref().map_or(0, ServiceList::len)
    }
}

/// Applies the local-first / remote-first policy over a [`ServiceProvider`].
#[derive(Clone)]
pub struct DataSourceArbiter {
    provider: Arc<dyn ServiceProvider>,
}

/// Accumulates the pieces of a result while the policy runs.
#[derive(Default)]
struct Attempt {
    errors: Vec<String>,
    wifi_dropped: bool,
}

impl Attempt {
    fn note(&mut self, err: &BoardError) {
        self.errors.push(err.to_string());
    }

    fn finish(
        self,
        services: Option<ServiceList>,
        source: SourceLabel,
        local_read: bool,
    ) -> RefreshResult {
        let error = if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("; "))
        };
        RefreshResult {
            services,
            source,
            wifi_dropped: self.wifi_dropped,
            error,
            local_read,
        }
    }
}

impl DataSourceArbiter {
    #[must_use]
    pub fn new(provider: Arc<dyn ServiceProvider>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn remote_configured(&self) -> bool {
        self.provider.remote_configured()
    }

    /// Re-read local storage only. Errors become an empty list plus a message.
    #[must_use]
    pub fn read_local(&self) -> (Option<ServiceList>, Option<BoardError>) {
        match self.provider.load_local() {
            Ok(services) => (ServiceList::build(services), None),
            Err(err) => (None, Some(err)),
        }
    }

    /// Run the source policy once.
    #[must_use]
    pub fn fetch(&self, request: &FetchRequest) -> RefreshResult {
        let mut attempt = Attempt::default();

        if request.prefer_remote {
            if let Some(list) = self.try_remote(request, &mut attempt) {
                return attempt.finish(Some(list), SourceLabel::Remote, false);
            }
            if let Some(cache) = &request.local_cache {
                return attempt.finish(Some(cache.clone()), SourceLabel::Local, false);
            }
            if let Some(list) = self.try_local(&mut attempt) {
                return attempt.finish(Some(list), SourceLabel::Local, true);
            }
        } else {
            if let Some(cache) = &request.local_cache {
                return attempt.finish(Some(cache.clone()), SourceLabel::Local, false);
            }
            if let Some(list) = self.try_local(&mut attempt) {
                return attempt.finish(Some(list), SourceLabel::Local, true);
            }
            if let Some(list) = self.try_remote(request, &mut attempt) {
                return attempt.finish(Some(list), SourceLabel::Remote, false);
            }
        }

        attempt.note(&BoardError::DataUnavailable {
            source_name: "all sources",
            details: "no service data available".to_string(),
        });
        attempt.finish(None, SourceLabel::None, false)
    }

    fn try_local(&self, attempt: &mut Attempt) -> Option<ServiceList> {
        let (list, err) = self.read_local();
        if let Some(err) = err {
            attempt.note(&err);
        }
        list
    }

    fn try_remote(&self, request: &FetchRequest, attempt: &mut Attempt) -> Option<ServiceList> {
        if !self.provider.remote_configured() {
            return None;
        }
        if !request.link_up {
            attempt.note(&BoardError::ConnectivityLost {
                details: "link down, remote skipped".to_string(),
            });
            return None;
        }
        let list = match self.provider.load_remote() {
            Ok(services) => ServiceList::build(services),
            Err(err) => {
                attempt.note(&err);
                None
            }
        };
        if list.is_none() {
            attempt.wifi_dropped = true;
        }
        list
    }
}
