//! Remote JSON endpoint loader (blocking HTTP GET).

#![allow(missing_docs)]

use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::core::errors::{BoardError, Result};
use crate::schedule::service::{Service, extract_services};

/// Fetches the departures document over HTTP with a bounded body size.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    url: String,
    client: Client,
    max_body_bytes: usize,
    defaults: Service,
}

impl RemoteSource {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        max_body_bytes: usize,
        defaults: Service,
    ) -> Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("dboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BoardError::Http {
                url: url.clone(),
                details: format!("client init failed: {e}"),
            })?;
        Ok(Self {
            url,
            client,
            max_body_bytes,
            defaults,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn load(&self) -> Result<Vec<Service>> {
        let body = self.fetch_body()?;
        let payload: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| BoardError::Payload {
                context: "remote endpoint",
                details: format!("{}: {e}", self.url),
            })?;
        Ok(extract_services(&payload, &self.defaults))
    }

    fn fetch_body(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(BoardError::Http {
                url: self.url.clone(),
                details: format!("unexpected status {status}"),
            });
        }
        if let Some(len) = response.content_length()
            && len > self.max_body_bytes as u64
        {
            return Err(self.oversize(len));
        }

        let limit = self.max_body_bytes as u64 + 1;
        let mut body = Vec::new();
        response
            .take(limit)
            .read_to_end(&mut body)
            .map_err(|e| BoardError::Http {
                url: self.url.clone(),
                details: format!("body read failed: {e}"),
            })?;
        if body.len() > self.max_body_bytes {
            return Err(self.oversize(body.len() as u64));
        }
        Ok(body)
    }

    fn oversize(&self, len: u64) -> BoardError {
        BoardError::Http {
            url: self.url.clone(),
            details: format!("body of {len} bytes exceeds {} byte cap", self.max_body_bytes),
        }
    }
}
