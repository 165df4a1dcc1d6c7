mod chat;
mod render;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use triage_contracts::report::{report_file_name, write_report};
use triage_contracts::{AnalysisRequest, MediaAttachment, COMMON_CONDITIONS};
use triage_engine::{TriageConfig, TriageEngine};
use tracing_subscriber::EnvFilter;

use crate::render::{
    lookup_failure_message, render_analysis, render_condition, render_history, render_profiles,
};

#[derive(Debug, Parser)]
#[command(name = "triage", version, about = "Multimodal health triage client")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Data directory (history, events, profiles). Overrides TRIAGE_HOME.
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    /// `gemini` or `dryrun`. Overrides TRIAGE_GATEWAY.
    #[arg(long, global = true)]
    gateway: Option<String>,
    #[arg(long, global = true)]
    model: Option<String>,
    /// Emit diagnostics as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    Analyze(AnalyzeArgs),
    Lookup(LookupArgs),
    #[command(subcommand)]
    History(HistoryCommand),
    Report(ReportArgs),
    Profiles,
    Topics,
    Chat(ChatArgs),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    text: Option<String>,
    /// Image or document to attach; repeatable.
    #[arg(long = "file")]
    files: Vec<PathBuf>,
    /// Recorded voice note.
    #[arg(long)]
    audio: Option<PathBuf>,
    #[arg(long)]
    profile: Option<String>,
    /// Also write a plain-text report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    json: bool,
    #[arg(long)]
    elder: bool,
}

#[derive(Debug, Parser)]
struct LookupArgs {
    #[arg(required = true, num_args = 1..)]
    name: Vec<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    List {
        #[arg(long)]
        profile: Option<String>,
    },
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    Clear {
        #[arg(long)]
        profile: Option<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Parser)]
struct ReportArgs {
    /// History item to export.
    #[arg(long)]
    id: String,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    profile: Option<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("triage error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.global.log_json);
    execute(cli)
}

fn execute(cli: Cli) -> Result<i32> {
    let config = load_config(&cli.global)?;
    tracing::debug!(
        gateway = %config.gateway,
        model = %config.model,
        home = %config.home.display(),
        "config loaded"
    );

    // `topics` is static and must work without a usable data directory.
    let engine = || TriageEngine::new(&config);
    match cli.command {
        Command::Analyze(args) => run_analyze(&engine()?, args),
        Command::Lookup(args) => run_lookup(&engine()?, args),
        Command::History(command) => run_history(&engine()?, command),
        Command::Report(args) => run_report(&engine()?, args),
        Command::Profiles => {
            let engine = engine()?;
            let active = engine.profiles().default_profile().id.clone();
            println!("{}", render_profiles(engine.profiles(), &active));
            Ok(0)
        }
        Command::Topics => {
            for topic in COMMON_CONDITIONS {
                println!("{topic}");
            }
            Ok(0)
        }
        Command::Chat(args) => {
            let engine = engine()?;
            let profile = resolve_profile(&engine, args.profile.as_deref())?;
            chat::run_chat(&engine, profile)?;
            Ok(0)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(global: &GlobalArgs) -> Result<TriageConfig> {
    let mut config = TriageConfig::from_env()?;
    if let Some(home) = global.home.as_ref() {
        config.home = home.clone();
    }
    if let Some(gateway) = global.gateway.as_deref() {
        config.gateway = gateway.trim().to_ascii_lowercase();
    }
    if let Some(model) = global.model.as_deref().map(str::trim) {
        if !model.is_empty() {
            config.model = model.to_string();
        }
    }
    Ok(config)
}

/// Accepts a profile id or display name; `None` selects the default.
fn resolve_profile(engine: &TriageEngine, requested: Option<&str>) -> Result<String> {
    let Some(requested) = requested.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(engine.profiles().default_profile().id.clone());
    };
    engine
        .profiles()
        .list()
        .find(|profile| {
            profile.id == requested || profile.display_name.eq_ignore_ascii_case(requested)
        })
        .map(|profile| profile.id.clone())
        .with_context(|| format!("unknown profile '{requested}'"))
}

fn run_analyze(engine: &TriageEngine, args: AnalyzeArgs) -> Result<i32> {
    let profile = resolve_profile(engine, args.profile.as_deref())?;
    let mut attachments = Vec::with_capacity(args.files.len());
    for path in &args.files {
        attachments.push(MediaAttachment::from_path(path)?);
    }
    let audio = match args.audio.as_deref() {
        Some(path) => Some(MediaAttachment::from_path(path)?),
        None => None,
    };
    let request = AnalysisRequest::new(args.text, attachments, audio);

    let result = match engine.analyze(&profile, &request) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{}", err.user_message());
            return Ok(2);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_analysis(&result, args.elder));
    }
    if let Some(path) = args.report.as_deref() {
        write_report(path, &result, Utc::now())?;
        eprintln!("Report written to {}", path.display());
    }
    Ok(0)
}

fn run_lookup(engine: &TriageEngine, args: LookupArgs) -> Result<i32> {
    let name = args.name.join(" ");
    match engine.lookup(&name) {
        Ok(details) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else {
                println!("{}", render_condition(&details));
            }
            Ok(0)
        }
        Err(err) => {
            eprintln!("{}", lookup_failure_message(&err));
            Ok(2)
        }
    }
}

fn run_history(engine: &TriageEngine, command: HistoryCommand) -> Result<i32> {
    match command {
        HistoryCommand::List { profile } => {
            let profile = resolve_profile(engine, profile.as_deref())?;
            println!("{}", render_history(&engine.history().list_for(&profile)));
            Ok(0)
        }
        HistoryCommand::Show { id, json } => {
            let Some(item) = engine.history().get(&id) else {
                bail!("no history item '{id}'");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                println!("{}", render_analysis(&item.full_result, false));
            }
            Ok(0)
        }
        HistoryCommand::Clear { profile, yes } => {
            let profile = resolve_profile(engine, profile.as_deref())?;
            let name = engine
                .profiles()
                .get(&profile)
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| profile.clone());
            if !yes && !confirm(&format!("Clear all history for {name}?"))? {
                println!("Cancelled.");
                return Ok(0);
            }
            let removed = engine.clear_history(&profile)?;
            println!("Removed {removed} item(s) for {name}.");
            Ok(0)
        }
    }
}

fn run_report(engine: &TriageEngine, args: ReportArgs) -> Result<i32> {
    let Some(item) = engine.history().get(&args.id) else {
        bail!("no history item '{}'", args.id);
    };
    let now = Utc::now();
    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(report_file_name(now)));
    write_report(&path, &item.full_result, now)?;
    println!("{}", path.display());
    Ok(0)
}

/// Reads a y/N answer from stdin; anything but `y`/`yes` declines.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn default_report_path(dir: &Path) -> PathBuf {
    dir.join(report_file_name(Utc::now()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn analyze_accepts_repeated_files() {
        let cli = Cli::try_parse_from([
            "triage",
            "--gateway",
            "dryrun",
            "analyze",
            "--text",
            "rash",
            "--file",
            "a.jpg",
            "--file",
            "b.pdf",
        ]);
        let Ok(cli) = cli else {
            panic!("parse failed");
        };
        assert_eq!(cli.global.gateway.as_deref(), Some("dryrun"));
        match cli.command {
            Command::Analyze(args) => {
                assert_eq!(args.files, vec![PathBuf::from("a.jpg"), PathBuf::from("b.pdf")]);
                assert_eq!(args.text.as_deref(), Some("rash"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn lookup_joins_words() {
        let Ok(cli) = Cli::try_parse_from(["triage", "lookup", "Type", "2", "Diabetes"]) else {
            panic!("parse failed");
        };
        match cli.command {
            Command::Lookup(args) => assert_eq!(args.name.join(" "), "Type 2 Diabetes"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn confirmation_requires_explicit_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[test]
    fn topics_needs_no_data_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let blocked = temp.path().join("home");
        std::fs::write(&blocked, b"not a directory")?;
        let home = blocked.display().to_string();

        let Ok(topics) = Cli::try_parse_from(["triage", "--home", home.as_str(), "topics"]) else {
            panic!("parse failed");
        };
        assert_eq!(execute(topics)?, 0);

        let Ok(profiles) = Cli::try_parse_from(["triage", "--home", home.as_str(), "profiles"])
        else {
            panic!("parse failed");
        };
        assert!(execute(profiles).is_err());
        Ok(())
    }

    #[test]
    fn profile_resolves_by_id_or_name() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = TriageConfig {
            home: temp.path().to_path_buf(),
            gateway: "dryrun".to_string(),
            ..TriageConfig::default()
        };
        let engine = TriageEngine::new(&config)?;
        assert_eq!(resolve_profile(&engine, None)?, "p1");
        assert_eq!(resolve_profile(&engine, Some("mom"))?, "p2");
        assert_eq!(resolve_profile(&engine, Some("p4"))?, "p4");
        assert!(resolve_profile(&engine, Some("grandpa")).is_err());
        Ok(())
    }
}
