//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use kload::core::config::{Config, SourceKind};
use kload::core::errors::KloadError;
use kload::engine::cancel::CancelToken;
use kload::engine::session::Session;
use kload::logger::jsonl::JsonlWriter;
use kload::source::demo::DemoSource;
use kload::source::filter::FilteredSource;
use kload::source::json_file::JsonFileSource;
use kload::source::{Entity, MetricsSource};
use kload::surface::terminal::TerminalSurface;

/// kload: live per-entity CPU and memory load dashboard.
#[derive(Debug, Parser)]
#[command(
    name = "kload",
    author,
    version,
    about = "Live terminal dashboard of per-entity resource load",
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
    /// Open the live dashboard (Esc, q or Ctrl-C to quit).
    Dashboard(DashboardArgs),
    /// Fetch one snapshot and print it.
    Snapshot(SnapshotArgs),
    /// Show the effective configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Source selection shared by `dashboard` and `snapshot`.
#[derive(Debug, Clone, Args, Default)]
struct SourceArgs {
    /// Keep only entities whose name starts with one of these prefixes.
    #[arg(value_name = "PREFIX")]
    prefixes: Vec<String>,
    /// Re-read snapshots from this JSON file on every poll.
    #[arg(long, value_name = "PATH", conflicts_with = "demo")]
    file: Option<PathBuf>,
    /// Generate N random-walk demo entities.
    #[arg(long, value_name = "N")]
    demo: Option<usize>,
    /// Drop entities whose full name matches this regex.
    #[arg(long, value_name = "REGEX")]
    exclude: Option<String>,
    /// Drop entities whose last `/` segment matches this regex.
    #[arg(long, value_name = "REGEX")]
    exclude_member: Option<String>,
    /// Maximum number of panel columns.
    #[arg(long, value_name = "N")]
    columns: Option<usize>,
}

#[derive(Debug, Clone, Args)]
struct DashboardArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Poll and redraw interval in milliseconds.
    #[arg(long, value_name = "MS")]
    poll_ms: Option<u64>,
    /// Samples kept per series.
    #[arg(long, value_name = "N")]
    window: Option<usize>,
    /// Do not write the JSONL session log.
    #[arg(long)]
    no_log: bool,
}

#[derive(Debug, Clone, Args)]
struct SnapshotArgs {
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Print only the config file path.
    #[arg(long)]
    path: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
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

impl From<KloadError> for CliError {
    fn from(err: KloadError) -> Self {
        if err.is_user_error() {
            Self::User(err.to_string())
        } else {
            Self::Runtime(err.to_string())
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Dashboard(args) => run_dashboard(cli, args),
        Command::Snapshot(args) => run_snapshot(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── config + source assembly ────────────────────

fn load_config(cli: &Cli, source: &SourceArgs) -> Result<Config, CliError> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    apply_source_args(&mut cfg, source);
    cfg.validate()?;
    Ok(cfg)
}

/// CLI flags win over file and env.
fn apply_source_args(cfg: &mut Config, args: &SourceArgs) {
    if let Some(path) = &args.file {
        cfg.source.kind = SourceKind::File;
        cfg.source.file = Some(path.clone());
    }
    if let Some(n) = args.demo {
        cfg.source.kind = SourceKind::Demo;
        cfg.source.demo_entities = n;
    }
    if !args.prefixes.is_empty() {
        cfg.source.include.clone_from(&args.prefixes);
    }
    if let Some(pattern) = &args.exclude {
        cfg.source.exclude = Some(pattern.clone());
    }
    if let Some(pattern) = &args.exclude_member {
        cfg.source.exclude_member = Some(pattern.clone());
    }
    if let Some(columns) = args.columns {
        cfg.dashboard.max_columns = columns;
    }
}

fn build_source(cfg: &Config) -> Result<Box<dyn MetricsSource>, CliError> {
    let columns = cfg.dashboard.max_columns;
    let inner: Box<dyn MetricsSource> = match cfg.source.kind {
        SourceKind::Demo => Box::new(DemoSource::new(cfg.source.demo_entities, columns)),
        SourceKind::File => {
            let path = cfg.source.file.as_ref().ok_or_else(|| {
                CliError::User("source.kind = \"file\" requires --file or source.file".to_string())
            })?;
            Box::new(JsonFileSource::new(path, columns))
        }
    };
    let filter = cfg.entity_filter()?;
    if filter.is_pass_through() {
        Ok(inner)
    } else {
        Ok(Box::new(FilteredSource::new(inner, filter)))
    }
}

// ──────────────────── dashboard ────────────────────

fn run_dashboard(cli: &Cli, args: &DashboardArgs) -> Result<(), CliError> {
    let mut cfg = load_config(cli, &args.source)?;
    if let Some(ms) = args.poll_ms {
        cfg.dashboard.poll_interval_ms = ms;
    }
    if let Some(width) = args.window {
        cfg.dashboard.window_width = width;
    }
    if args.no_log {
        cfg.log.enabled = false;
    }
    cfg.validate()?;

    let source = build_source(&cfg)?;
    let cancel = CancelToken::new();
    for failure in cancel.register_signals() {
        eprintln!("[KLD-SIGNAL] WARNING: {failure}");
    }

    // Anything printed after this point would land on the alternate screen.
    let mut session = Session::new(
        source,
        TerminalSurface::new(),
        cfg.session_config(),
        cancel,
    );
    if cfg.log.enabled {
        match JsonlWriter::try_open(cfg.jsonl_config()) {
            Ok(log) => session = session.with_log(log),
            Err(e) => eprintln!("[{}] WARNING: session log disabled: {e}", e.code()),
        }
    }
    if let Ok(hash) = cfg.stable_hash() {
        session = session.with_config_hash(hash);
    }

    let report = session.run()?;
    if output_mode(cli) == OutputMode::Json {
        write_json_line(&json!({
            "command": "dashboard",
            "polls": report.polls,
            "panels": report.panels,
            "tracked_entities": report.tracked_entities,
            "columns": report.layout.columns,
            "rows": report.layout.rows,
        }))?;
    }
    Ok(())
}

// ──────────────────── snapshot ────────────────────

fn run_snapshot(cli: &Cli, args: &SnapshotArgs) -> Result<(), CliError> {
    let cfg = load_config(cli, &args.source)?;
    let mut source = build_source(&cfg)?;
    let entities = source
        .fetch()
        .map_err(|e| e.into_source_unavailable(source.name()))?;
    if entities.is_empty() {
        return Err(KloadError::EmptyResultSet {
            source_name: source.name().to_string(),
        }
        .into());
    }

    let dims = source.dimensions();
    match output_mode(cli) {
        OutputMode::Json => {
            let rows: Vec<Value> = entities.iter().map(entity_json).collect();
            write_json_line(&json!({
                "command": "snapshot",
                "source": source.name(),
                "dimensions": [dims.a.name, dims.b.name],
                "entities": rows,
            }))?;
        }
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            let name_w = entities
                .iter()
                .map(|e| e.name.len())
                .max()
                .unwrap_or(4)
                .max(4);
            writeln!(
                out,
                "{}",
                format!(
                    "{:<name_w$}  {:>16}  {:>6}  {:>16}  {:>6}",
                    "NAME", dims.a.name, "%", dims.b.name, "%"
                )
                .bold()
            )?;
            for e in &entities {
                let usage_a = format!("{:.0}/{:.0}{}", e.current_a, e.capacity_a, dims.a.unit);
                let usage_b = format!("{:.0}/{:.0}{}", e.current_b, e.capacity_b, dims.b.unit);
                writeln!(
                    out,
                    "{:<name_w$}  {usage_a:>16}  {}  {usage_b:>16}  {}",
                    e.name,
                    colored_percent(e.percent_a()),
                    colored_percent(e.percent_b()),
                )?;
            }
        }
    }
    Ok(())
}

fn entity_json(e: &Entity) -> Value {
    json!({
        "name": e.name,
        "current_a": e.current_a,
        "capacity_a": e.capacity_a,
        "percent_a": e.percent_a(),
        "current_b": e.current_b,
        "capacity_b": e.capacity_b,
        "percent_b": e.percent_b(),
    })
}

fn colored_percent(pct: f64) -> String {
    let text = format!("{pct:>5.1}%");
    if pct >= 90.0 {
        text.red().to_string()
    } else if pct >= 70.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let cfg = Config::load(cli.config.as_deref())?;
    if args.path {
        println!("{}", cfg.config_file.display());
        return Ok(());
    }
    match output_mode(cli) {
        OutputMode::Json => write_json_line(&json!({
            "command": "config",
            "path": cfg.config_file,
            "hash": cfg.stable_hash()?,
            "config": serde_json::to_value(&cfg)?,
        })),
        OutputMode::Human => {
            print!("{}", cfg.to_toml()?);
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
    let env_mode = std::env::var("KLOAD_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ if stdout_is_tty => OutputMode::Human,
        _ => OutputMode::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, true), OutputMode::Human);
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dashboard_flags_parse() {
        let cli = Cli::try_parse_from([
            "kload",
            "dashboard",
            "web",
            "api",
            "--demo",
            "5",
            "--columns",
            "2",
            "--exclude-member",
            "^istio-proxy$",
            "--poll-ms",
            "250",
        ])
        .unwrap();
        let Command::Dashboard(args) = cli.command else {
            panic!("expected dashboard");
        };
        assert_eq!(args.source.prefixes, vec!["web", "api"]);
        assert_eq!(args.source.demo, Some(5));
        assert_eq!(args.source.columns, Some(2));
        assert_eq!(args.poll_ms, Some(250));
    }

    #[test]
    fn file_and_demo_conflict() {
        let result = Cli::try_parse_from(["kload", "snapshot", "--file", "x.json", "--demo", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn source_args_override_config() {
        let mut cfg = Config::default();
        let args = SourceArgs {
            prefixes: vec!["web".into()],
            file: Some(PathBuf::from("/tmp/snap.json")),
            columns: Some(4),
            ..SourceArgs::default()
        };
        apply_source_args(&mut cfg, &args);
        assert_eq!(cfg.source.kind, SourceKind::File);
        assert_eq!(cfg.source.include, vec!["web"]);
        assert_eq!(cfg.dashboard.max_columns, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn filtered_source_is_built_only_when_needed() {
        let mut cfg = Config::default();
        cfg.source.demo_entities = 3;
        let mut plain = build_source(&cfg).unwrap();
        assert_eq!(plain.fetch().unwrap().len(), 3);

        cfg.source.include = vec!["nothing-matches".into()];
        let mut filtered = build_source(&cfg).unwrap();
        assert!(filtered.fetch().unwrap().is_empty());
    }

    #[test]
    fn kload_errors_map_to_exit_codes() {
        let user: CliError = KloadError::InvalidConfig {
            details: "x".into(),
        }
        .into();
        assert_eq!(user.exit_code(), 1);
        let runtime: CliError = KloadError::Redraw {
            details: "x".into(),
        }
        .into();
        assert_eq!(runtime.exit_code(), 2);
    }
}
