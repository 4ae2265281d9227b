//! SeniorVoice command-line front end.
//!
//! Drives the transcript-to-intent pipeline from a terminal: one-shot
//! parsing, an interactive loop, and engine-candidate selection. The HTTP
//! layer in front of the real assistant consumes the same library calls.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use intent_pipeline::{Pipeline, PipelineConfig, Transcript};
use transcript_select::{select_best, TranscriptCandidate};

#[derive(Parser, Debug)]
#[command(
    name = "sv",
    version,
    about = "SeniorVoice transcript-to-intent CLI",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse one transcript into an action record
    Parse {
        /// Transcript text; read from stdin when omitted
        text: Option<String>,
        /// Reference date for relative expressions (YYYY-MM-DD, default today)
        #[arg(long)]
        now: Option<String>,
        /// YAML configuration overlay
        #[arg(long)]
        config: Option<PathBuf>,
        /// Known contact name, repeatable
        #[arg(long = "contact")]
        contacts: Vec<String>,
        /// Pretty-print the JSON output
        #[arg(long, action = ArgAction::SetTrue)]
        pretty: bool,
    },
    /// Interactive loop: one transcript per line, 'quit' to exit
    Repl {
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long = "contact")]
        contacts: Vec<String>,
    },
    /// Pick the best engine candidate from JSON lines on stdin
    Select {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Parse {
            text,
            now,
            config,
            contacts,
            pretty,
        } => {
            let pipeline = build_pipeline(config.as_deref(), contacts)?;
            let today = resolve_now(now.as_deref())?;
            let text = match text {
                Some(text) => text,
                None => read_stdin_all()?,
            };
            let record = pipeline.process(&Transcript::new(text), today);
            let rendered = if pretty {
                serde_json::to_string_pretty(&record)?
            } else {
                serde_json::to_string(&record)?
            };
            println!("{rendered}");
            Ok(())
        }
        Commands::Repl {
            now,
            config,
            contacts,
        } => {
            let pipeline = build_pipeline(config.as_deref(), contacts)?;
            let today = resolve_now(now.as_deref())?;
            run_repl(&pipeline, today)
        }
        Commands::Select { config } => {
            let cfg = load_config(config.as_deref())?;
            run_select(&cfg)
        }
    }
}

fn build_pipeline(config: Option<&std::path::Path>, contacts: Vec<String>) -> Result<Pipeline> {
    let mut cfg = load_config(config)?;
    if !contacts.is_empty() {
        cfg.contacts = contacts;
    }
    Ok(Pipeline::new(cfg))
}

fn load_config(path: Option<&std::path::Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let cfg = PipelineConfig::from_yaml_file(path)
                .with_context(|| format!("loading config overlay {}", path.display()))?;
            debug!(path = %path.display(), "loaded config overlay");
            Ok(cfg)
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// The reference date is injected into the pipeline; the CLI is where the
/// wall clock is allowed in.
fn resolve_now(now: Option<&str>) -> Result<Date> {
    let format = format_description!("[year]-[month]-[day]");
    match now {
        Some(raw) => {
            Date::parse(raw, &format).with_context(|| format!("invalid --now date {raw:?}"))
        }
        None => Ok(OffsetDateTime::now_utc().date()),
    }
}

fn read_stdin_all() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .lock()
        .read_to_string(&mut buffer)
        .context("reading transcript from stdin")?;
    Ok(buffer.trim().to_string())
}

fn run_repl(pipeline: &Pipeline, today: Date) -> Result<()> {
    info!("interactive mode, reference date {today}");
    println!("Transcripts, one per line ('quit' to exit):");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let record = pipeline.process(&Transcript::new(line), today);
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn run_select(cfg: &PipelineConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut candidates: Vec<TranscriptCandidate> = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("reading candidates from stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let candidate: TranscriptCandidate =
            serde_json::from_str(line).with_context(|| format!("invalid candidate {line:?}"))?;
        candidates.push(candidate);
    }
    match select_best(&candidates, &cfg.fillers) {
        Some(winner) => println!("{}", serde_json::to_string(winner)?),
        None => info!("no candidates on stdin"),
    }
    Ok(())
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
