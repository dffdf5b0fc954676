//! Network link collaborator: "connect" means "the remote endpoint is reachable".

#![allow(missing_docs)]

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::core::errors::{BoardError, Result};

/// Connectivity seam. `connect` may block for up to the probe timeout.
pub trait Link: Send + Sync {
    fn connect(&self) -> bool;
}

/// Link used when there is no remote endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUp;

impl Link for AlwaysUp {
    fn connect(&self) -> bool {
        true
    }
}

/// Probes TCP reachability of the remote URL's host and port.
#[derive(Debug, Clone)]
pub struct TcpProbeLink {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbeLink {
    /// Build a probe for `url`; the port defaults from the scheme.
    pub fn for_url(url: &str, timeout: Duration) -> Result<Self> {
        let parsed = reqwest::Url::parse(url).map_err(|e| BoardError::InvalidConfig {
            details: format!("remote url {url:?}: {e}"),
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| BoardError::InvalidConfig {
                details: format!("remote url {url:?} has no host"),
            })?
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| BoardError::InvalidConfig {
                details: format!("remote url {url:?} has no port"),
            })?;
        Ok(Self {
            host,
            port,
            timeout,
        })
    }

    fn resolve(&self) -> Vec<SocketAddr> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        match (host, self.port).to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                eprintln!("[DB-FETCH] cannot resolve {}: {e}", self.host);
                Vec::new()
            }
        }
    }
}

impl Link for TcpProbeLink {
    fn connect(&self) -> bool {
        self.resolve()
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, self.timeout).is_ok())
    }
}
