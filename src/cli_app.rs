//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use departure_board::core::clock::format_clock;
use departure_board::core::config::Config;
use departure_board::core::errors::BoardError;
use departure_board::daemon::loop_main::BoardDaemon;
use departure_board::render::StatusTone;
use departure_board::render::terminal::TerminalDisplay;
use departure_board::schedule::list::ServiceList;
use departure_board::source::arbiter::{DataSourceArbiter, FetchRequest, RefreshResult};
use departure_board::source::provider::{BoardProvider, link_from_config};

/// Departure board: rotates upcoming services on an LED matrix.
#[derive(Debug, Parser)]
#[command(
    name = "dboard",
    author,
    version,
    about = "Departure board controller",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the board on this terminal until interrupted.
    Run(RunArgs),
    /// Fetch once and print the sorted service list.
    Show(ShowArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Local departures JSON file.
    #[arg(long, value_name = "PATH")]
    local: Option<PathBuf>,
    /// Remote departures endpoint (http or https).
    #[arg(long, value_name = "URL")]
    remote: Option<String>,
    /// Start remote-first instead of local-first.
    #[arg(long)]
    prefer_remote: bool,
    /// Fetch on the render loop instead of a background thread.
    #[arg(long)]
    sync_fetch: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ShowArgs {
    /// Local departures JSON file.
    #[arg(long, value_name = "PATH")]
    local: Option<PathBuf>,
    /// Remote departures endpoint (http or https).
    #[arg(long, value_name = "URL")]
    remote: Option<String>,
    /// Try the remote endpoint first.
    #[arg(long)]
    prefer_remote: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration (default).
    Show,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<BoardError> for CliError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::InvalidConfig { .. }
            | BoardError::MissingConfig { .. }
            | BoardError::ConfigParse { .. } => Self::User(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_board(cli, args),
        Command::Show(args) => run_show(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── config helpers ────────────────────

/// Source overrides shared by `run` and `show`.
#[derive(Debug, Clone, Default)]
struct SourceOverrides {
    local: Option<PathBuf>,
    remote: Option<String>,
    prefer_remote: bool,
    sync_fetch: bool,
}

impl From<&RunArgs> for SourceOverrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            local: args.local.clone(),
            remote: args.remote.clone(),
            prefer_remote: args.prefer_remote,
            sync_fetch: args.sync_fetch,
        }
    }
}

impl From<&ShowArgs> for SourceOverrides {
    fn from(args: &ShowArgs) -> Self {
        Self {
            local: args.local.clone(),
            remote: args.remote.clone(),
            prefer_remote: args.prefer_remote,
            sync_fetch: true,
        }
    }
}

/// Command-line flags win over file and environment.
fn apply_overrides(mut config: Config, overrides: &SourceOverrides) -> Result<Config, CliError> {
    if let Some(local) = &overrides.local {
        config.sources.local_path = Some(local.clone());
    }
    if let Some(remote) = &overrides.remote {
        config.sources.remote_url = Some(remote.clone());
    }
    if overrides.prefer_remote {
        config.sources.prefer_remote = true;
    }
    if overrides.sync_fetch {
        config.sources.background_fetch = false;
    }
    config.normalize();
    config.validate()?;
    Ok(config)
}

fn load_config(cli: &Cli, overrides: &SourceOverrides) -> Result<Config, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    apply_overrides(config, overrides)
}

// ──────────────────── run ────────────────────

fn run_board(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = load_config(cli, &SourceOverrides::from(args))?;
    let display = TerminalDisplay::stdout(&config.display, cli.no_color)?;
    let mut daemon = BoardDaemon::init(config, Box::new(display))?;
    daemon.run()?;
    Ok(())
}

// ──────────────────── show ────────────────────

fn run_show(cli: &Cli, args: &ShowArgs) -> Result<(), CliError> {
    let config = load_config(cli, &SourceOverrides::from(args))?;
    let arbiter = DataSourceArbiter::new(Arc::new(BoardProvider::from_config(&config)?));
    let link_up = arbiter.remote_configured() && link_from_config(&config)?.connect();
    let result = arbiter.fetch(&FetchRequest {
        prefer_remote: config.sources.prefer_remote,
        link_up,
        local_cache: None,
    });

    match output_mode(cli) {
        OutputMode::Human => print_show_human(&result),
        OutputMode::Json => write_json_line(&show_payload(&result))?,
    }

    match (&result.services, &result.error) {
        (None, Some(err)) => Err(CliError::Runtime(err.clone())),
        (None, None) => Err(CliError::Runtime("no service data available".to_string())),
        _ => Ok(()),
    }
}

fn show_payload(result: &RefreshResult) -> Value {
    let services: Vec<Value> = result.services.as_ref().map_or_else(Vec::new, |list| {
        list.services()
            .iter()
            .enumerate()
            .map(|(index, svc)| {
                json!({
                    "index": index,
                    "scheduled": svc.scheduled,
                    "seconds": list.schedule_at(index),
                    "destination": svc.destination,
                    "status": svc.status,
                    "calling": svc.calling,
                })
            })
            .collect()
    });
    json!({
        "command": "show",
        "source": result.source,
        "count": result.count(),
        "link_dropped": result.wifi_dropped,
        "error": result.error,
        "services": services,
    })
}

fn print_show_human(result: &RefreshResult) {
    let Some(list) = &result.services else {
        println!("{}", "no service data".red().bold());
        if let Some(err) = &result.error {
            println!("  {err}");
        }
        return;
    };

    println!(
        "{} {} ({} service{})",
        "source:".bold(),
        result.source,
        list.len(),
        if list.len() == 1 { "" } else { "s" }
    );
    print_service_table(list);
    if let Some(err) = &result.error {
        println!("{} {err}", "warning:".yellow().bold());
    }
}

fn print_service_table(list: &ServiceList) {
    println!(
        "{}",
        format!(
            "{:>3}  {:<6} {:>8}  {:<24} {:<14} {}",
            "#", "SCHED", "PARSED", "DESTINATION", "STATUS", "CALLING"
        )
        .bold()
    );
    for (index, svc) in list.services().iter().enumerate() {
        let parsed = list
            .schedule_at(index)
            .map_or_else(|| "-".to_string(), |secs| format_clock(Some(secs)));
        let status = format!("{:<14}", svc.status);
        let status = match StatusTone::classify(&svc.status) {
            StatusTone::OnTime => status.green(),
            StatusTone::Disrupted => status.red(),
            StatusTone::Neutral => status.yellow(),
        };
        println!(
            "{index:>3}  {:<6} {parsed:>8}  {:<24} {status} {}",
            svc.scheduled, svc.destination, svc.calling
        );
    }
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        None | Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml()?),
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config_hash": config.stable_hash()?,
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ──────────────────── output helpers ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DBOARD_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
