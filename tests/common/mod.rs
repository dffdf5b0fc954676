#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use departure_board::control::controller::{BoardController, Collaborators};
use departure_board::control::debounce::{SwitchSample, Switches};
use departure_board::core::clock::Clock;
use departure_board::core::config::Config;
use departure_board::core::errors::{BoardError, Result};
use departure_board::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use departure_board::render::{BitmapFont, Display, Frame};
use departure_board::schedule::service::Service;
use departure_board::source::arbiter::{ServiceProvider, SourceLabel};
use departure_board::source::link::Link;

// ──────────────────── CLI runner ────────────────────

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_dboard") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "dboard.exe" } else { "dboard" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve dboard binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("dboard-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command.args(args).env("RUST_BACKTRACE", "1");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("execute dboard command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ──────────────────── fakes ────────────────────

pub fn svc(scheduled: &str, destination: &str) -> Service {
    Service {
        scheduled: scheduled.to_string(),
        destination: destination.to_string(),
        status: "On time".to_string(),
        calling: format!("Calling at: {destination} Parkway"),
    }
}

pub fn hm(hours: u32, minutes: u32) -> u32 {
    hours * 3600 + minutes * 60
}

/// Scriptable local + remote provider.
pub struct FakeProvider {
    remote_configured: bool,
    local: Mutex<Vec<Service>>,
    remote: Mutex<std::result::Result<Vec<Service>, String>>,
    pub local_calls: AtomicU32,
    pub remote_calls: AtomicU32,
}

impl FakeProvider {
    pub fn local_only(local: Vec<Service>) -> Arc<Self> {
        Arc::new(Self {
            remote_configured: false,
            local: Mutex::new(local),
            remote: Mutex::new(Ok(Vec::new())),
            local_calls: AtomicU32::new(0),
            remote_calls: AtomicU32::new(0),
        })
    }

    pub fn with_remote(local: Vec<Service>, remote: Vec<Service>) -> Arc<Self> {
        Arc::new(Self {
            remote_configured: true,
            local: Mutex::new(local),
            remote: Mutex::new(Ok(remote)),
            local_calls: AtomicU32::new(0),
            remote_calls: AtomicU32::new(0),
        })
    }

    pub fn set_local(&self, services: Vec<Service>) {
        *self.local.lock() = services;
    }

    pub fn set_remote(&self, services: Vec<Service>) {
        *self.remote.lock() = Ok(services);
    }

    pub fn fail_remote(&self, message: &str) {
        *self.remote.lock() = Err(message.to_string());
    }

    pub fn remote_calls(&self) -> u32 {
        self.remote_calls.load(Ordering::SeqCst)
    }
}

impl ServiceProvider for FakeProvider {
    fn remote_configured(&self) -> bool {
        self.remote_configured
    }

    fn load_local(&self) -> Result<Vec<Service>> {
        self.local_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.local.lock().clone())
    }

    fn load_remote(&self) -> Result<Vec<Service>> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        self.remote
            .lock()
            .clone()
            .map_err(|details| BoardError::Http {
                url: "http://departures.test/api".to_string(),
                details,
            })
    }
}

#[derive(Default)]
pub struct FakeLink {
    pub up: AtomicBool,
    pub connects: AtomicU32,
}

impl FakeLink {
    pub fn up() -> Arc<Self> {
        let link = Self::default();
        link.up.store(true, Ordering::SeqCst);
        Arc::new(link)
    }
}

impl Link for FakeLink {
    fn connect(&self) -> bool {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.up.load(Ordering::SeqCst)
    }
}

/// Clock driven by the test: ticks and wall time are set explicitly.
#[derive(Default)]
pub struct ManualClock {
    ticks: AtomicU32,
    wall: Mutex<Option<u32>>,
}

impl ManualClock {
    pub fn at(ticks_ms: u32, wall: Option<u32>) -> Arc<Self> {
        let clock = Self::default();
        clock.ticks.store(ticks_ms, Ordering::SeqCst);
        *clock.wall.lock() = wall;
        Arc::new(clock)
    }

    pub fn set_ticks(&self, ticks_ms: u32) {
        self.ticks.store(ticks_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: u32) {
        let now = self.ticks.load(Ordering::SeqCst);
        self.ticks.store(now.wrapping_add(delta), Ordering::SeqCst);
    }

    pub fn set_wall(&self, wall: Option<u32>) {
        *self.wall.lock() = wall;
    }
}

impl Clock for ManualClock {
    fn ticks_ms(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn seconds_past_midnight(&self) -> Option<u32> {
        *self.wall.lock()
    }

    fn resync(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Painted {
    pub destination: String,
    pub source: SourceLabel,
    pub ticker_offset: u32,
    pub index: usize,
    pub count: usize,
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub frames: Arc<Mutex<Vec<Painted>>>,
}

impl RecordingDisplay {
    pub fn last(&self) -> Option<Painted> {
        self.frames.lock().last().cloned()
    }
}

impl Display for RecordingDisplay {
    fn paint(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.frames.lock().push(Painted {
            destination: frame.service.destination.clone(),
            source: frame.source,
            ticker_offset: frame.ticker_offset,
            index: frame.index,
            count: frame.count,
        });
        Ok(())
    }
}

/// Switch levels set directly by the test.
#[derive(Clone, Default)]
pub struct LevelSwitches {
    pub levels: Arc<Mutex<SwitchSample>>,
}

impl Switches for LevelSwitches {
    fn sample(&mut self, _now_ms: u32) -> SwitchSample {
        *self.levels.lock()
    }
}

// ──────────────────── controller rig ────────────────────

pub struct Rig {
    pub provider: Arc<FakeProvider>,
    pub link: Arc<FakeLink>,
    pub clock: Arc<ManualClock>,
    pub display: RecordingDisplay,
    pub switches: LevelSwitches,
    pub events: Receiver<ActivityEvent>,
    pub board: BoardController,
}

pub fn sync_config() -> Config {
    let mut config = Config::default();
    config.sources.background_fetch = false;
    config
}

/// Rig whose switch levels are driven through `rig.switches`.
pub fn rig(config: &Config, provider: Arc<FakeProvider>, clock: Arc<ManualClock>) -> Rig {
    let levels = LevelSwitches::default();
    let mut rig = rig_with_switches(config, provider, clock, Box::new(levels.clone()));
    rig.switches = levels;
    rig
}

pub fn rig_with_switches(
    config: &Config,
    provider: Arc<FakeProvider>,
    clock: Arc<ManualClock>,
    switches: Box<dyn Switches>,
) -> Rig {
    let link = FakeLink::up();
    let display = RecordingDisplay::default();
    let levels = LevelSwitches::default();
    let (activity, events) = ActivityLoggerHandle::detached(1024);
    let board = BoardController::new(
        config,
        Collaborators {
            provider: provider.clone(),
            link: link.clone(),
            clock: clock.clone(),
            display: Box::new(display.clone()),
            switches,
            measure: Box::new(BitmapFont::default()),
        },
        Some(activity),
    );
    Rig {
        provider,
        link,
        clock,
        display,
        switches: levels,
        events,
        board,
    }
}

impl Rig {
    pub fn press(&mut self, advance: bool, toggle: bool, delta_ms: u32) {
        *self.switches.levels.lock() = SwitchSample { advance, toggle };
        self.tick_after(delta_ms);
        *self.switches.levels.lock() = SwitchSample::default();
    }

    pub fn tick_after(&mut self, delta_ms: u32) {
        self.clock.advance_ms(delta_ms);
        self.board.tick();
    }

    pub fn drain_events(&self) -> Vec<ActivityEvent> {
        self.events.try_iter().collect()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.board
            .state()
            .services
            .services()
            .iter()
            .map(|s| s.destination.clone())
            .collect()
    }
}
