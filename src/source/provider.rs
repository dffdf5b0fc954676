//! Host provider wiring: local file + optional remote endpoint.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::core::errors::{BoardError, Result};
use crate::schedule::service::Service;
use crate::source::arbiter::ServiceProvider;
use crate::source::link::{AlwaysUp, Link, TcpProbeLink};
use crate::source::local::LocalFileSource;
use crate::source::remote::RemoteSource;

/// Concrete [`ServiceProvider`] backed by the filesystem and HTTP.
#[derive(Debug, Clone)]
pub struct BoardProvider {
    local: LocalFileSource,
    remote: Option<RemoteSource>,
}

impl BoardProvider {
    #[must_use]
    pub fn new(local: LocalFileSource, remote: Option<RemoteSource>) -> Self {
        Self { local, remote }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = config.defaults.to_service();
        let local = LocalFileSource::new(config.sources.local_path.clone(), defaults.clone());
        let remote = config
            .sources
            .remote_url()
            .map(|url| {
                RemoteSource::new(
                    url,
                    Duration::from_millis(config.sources.http_timeout_ms),
                    config.sources.max_body_bytes,
                    defaults,
                )
            })
            .transpose()?;
        Ok(Self { local, remote })
    }
}

impl ServiceProvider for BoardProvider {
    fn remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    fn load_local(&self) -> Result<Vec<Service>> {
        self.local.load()
    }

    fn load_remote(&self) -> Result<Vec<Service>> {
        match &self.remote {
            Some(remote) => remote.load(),
            None => Err(BoardError::DataUnavailable {
                source_name: "remote",
                details: "no remote endpoint configured".to_string(),
            }),
        }
    }
}

/// Link collaborator matching the configured remote endpoint.
pub fn link_from_config(config: &Config) -> Result<Arc<dyn Link>> {
    match config.sources.remote_url() {
        Some(url) => Ok(Arc::new(TcpProbeLink::for_url(
            url,
            Duration::from_millis(config.sources.http_timeout_ms),
        )?)),
        None => Ok(Arc::new(AlwaysUp)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_remote_reports_unavailable() {
        let mut config = Config::default();
        config.sources.local_path = None;
        let provider = BoardProvider::from_config(&config).unwrap();
        assert!(!provider.remote_configured());
        assert!(provider.load_local().unwrap().is_empty());
        assert_eq!(provider.load_remote().unwrap_err().code(), "DB-2001");
    }

    #[test]
    fn configured_remote_detected() {
        let mut config = Config::default();
        config.sources.remote_url = Some("http://127.0.0.1:9/departures.json".to_string());
        let provider = BoardProvider::from_config(&config).unwrap();
        assert!(provider.remote_configured());
        assert!(link_from_config(&config).is_ok());
    }

    #[test]
    fn local_defaults_come_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("departures.json");
        std::fs::write(&path, r#"{"destination": "Tring"}"#).unwrap();
        let mut config = Config::default();
        config.sources.local_path = Some(path);
        config.defaults.status = "Expected".to_string();
        let provider = BoardProvider::from_config(&config).unwrap();
        let services = provider.load_local().unwrap();
        assert_eq!(services[0].status, "Expected");
        assert_eq!(services[0].scheduled, "12:24");
    }
}
