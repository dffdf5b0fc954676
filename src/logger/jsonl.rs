//! Activity log file: one JSON object per line, appended.
//!
//! Lines are serialized whole and handed to a single `write_all`, so a reader
//! tailing the file only ever sees complete records. When the file cannot be
//! opened or written, output moves to stderr (prefixed `[DB-JSONL]`); if stderr
//! fails as well, records are dropped. The board keeps running either way.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::errors::{BoardError, Result};

const WRITE_BUFFER_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Record kinds written to the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BoardStart,
    BoardStop,
    ServicesLoaded,
    RefreshRetained,
    ServiceAdvance,
    PreferenceToggle,
    LinkChange,
    FetchDispatch,
    Error,
}

/// Optional payload of a record; unset fields are left out of the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFields {
    /// `local`, `remote` or `none`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_remote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_up: Option<bool>,
    /// `background` or `sync`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// One activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC, millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(flatten)]
    pub fields: LogFields,
}

impl LogEntry {
    /// Record stamped now, with no optional fields.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self::with(event, severity, LogFields::default())
    }

    #[must_use]
    pub fn with(event: EventType, severity: Severity, fields: LogFields) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            fields,
        }
    }
}

/// Where the activity log goes and how large it may grow.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Size at which the file is rotated.
    pub max_size_bytes: u64,
    /// Rotated generations kept as `<path>.1` .. `<path>.N`.
    pub max_rotated_files: u32,
    /// Minimum spacing between `sync_data` calls.
    pub sync_interval: Duration,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("activity.jsonl"),
            max_size_bytes: 4 * 1024 * 1024,
            max_rotated_files: 3,
            sync_interval: Duration::from_secs(10),
        }
    }
}

enum Sink {
    File { out: BufWriter<File>, size: u64 },
    Stderr,
    Discard,
}

/// Appending writer with size rotation and the file → stderr → discard chain.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
    last_sync: Instant,
}

impl JsonlWriter {
    /// Open (or create) the log file; falls back to stderr when that fails.
    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        let sink = match open_sink(&config.path) {
            Ok(sink) => sink,
            Err(e) => {
                eprintln!("[DB-JSONL] {e}; activity goes to stderr");
                Sink::Stderr
            }
        };
        Self {
            config,
            sink,
            last_sync: Instant::now(),
        }
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.write_line(&line);
            }
            Err(e) => eprintln!("[DB-JSONL] serialize error: {e}"),
        }
    }

    pub fn flush(&mut self) {
        if let Sink::File { out, .. } = &mut self.sink {
            let _ = out.flush();
        }
    }

    /// Flush and push the file contents to disk.
    pub fn fsync(&mut self) {
        if let Sink::File { out, .. } = &mut self.sink {
            let _ = out.flush();
            let _ = out.get_ref().sync_data();
        }
        self.last_sync = Instant::now();
    }

    /// `file`, `stderr` or `discard`.
    #[must_use]
    pub fn state(&self) -> &'static str {
        match self.sink {
            Sink::File { .. } => "file",
            Sink::Stderr => "stderr",
            Sink::Discard => "discard",
        }
    }

    // ──────────────────── internals ────────────────────

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if let Sink::File { size, .. } = &self.sink
            && *size > 0
            && *size + len > self.config.max_size_bytes
        {
            self.rotate();
        }

        match &mut self.sink {
            Sink::File { out, size } => {
                if let Err(e) = out.write_all(line.as_bytes()) {
                    eprintln!("[DB-JSONL] write to {} failed: {e}", self.config.path.display());
                    self.sink = Sink::Stderr;
                    self.write_line(line);
                    return;
                }
                *size += len;
                if self.last_sync.elapsed() >= self.config.sync_interval {
                    self.fsync();
                }
            }
            Sink::Stderr => {
                if write!(io::stderr(), "[DB-JSONL] {line}").is_err() {
                    self.sink = Sink::Discard;
                }
            }
            Sink::Discard => {}
        }
    }

    /// `<path>.N` is dropped, every other generation shifts up by one, and the
    /// live file becomes `<path>.1`.
    fn rotate(&mut self) {
        self.flush();
        self.sink = Sink::Discard;

        let base = &self.config.path;
        let keep = self.config.max_rotated_files;
        if keep == 0 {
            let _ = fs::remove_file(base);
        } else {
            let _ = fs::remove_file(generation(base, keep));
            for n in (1..keep).rev() {
                let _ = fs::rename(generation(base, n), generation(base, n + 1));
            }
            let _ = fs::rename(base, generation(base, 1));
        }

        self.sink = match open_sink(base) {
            Ok(sink) => sink,
            Err(e) => {
                eprintln!("[DB-JSONL] reopen after rotation failed: {e}");
                Sink::Stderr
            }
        };
    }
}

fn open_sink(path: &Path) -> Result<Sink> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|source| BoardError::io(dir, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| BoardError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok(Sink::File {
        out: BufWriter::with_capacity(WRITE_BUFFER_BYTES, file),
        size,
    })
}

/// `activity.jsonl` → `activity.jsonl.2`.
fn generation(base: &Path, n: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}
