//! Local JSON file loader.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::errors::{BoardError, Result};
use crate::schedule::service::{Service, extract_services};

/// Reads one JSON document from disk and normalizes it.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: Option<PathBuf>,
    defaults: Service,
}

impl LocalFileSource {
    #[must_use]
    pub fn new(path: Option<PathBuf>, defaults: Service) -> Self {
        Self { path, defaults }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Missing path or missing file is an empty list, not an error.
    pub fn load(&self) -> Result<Vec<Service>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(BoardError::io(path, err)),
        };
        let payload: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| BoardError::Payload {
                context: "local file",
                details: format!("{}: {e}", path.display()),
            })?;
        Ok(extract_services(&payload, &self.defaults))
    }
}
