//! Entry point for the dockwatch TUI. Parses args, resolves the profile and runs the App.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use dockwatch::app::App;
use dockwatch::demo::DemoSource;
use dockwatch::logging;
use dockwatch::profiles::{
    load_profiles, save_decision, save_profiles, validate_interval, ProfileEntry, ProfileRequest,
    ResolveProfile, SaveDecision,
};
use dockwatch::source::Source;
use dockwatch::ws::Remote;

const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Terminal dashboard for a Docker/Compose manager
#[derive(Parser, Debug)]
#[command(name = "dockwatch", version, about, long_about = None)]
struct Cli {
    /// Backend WebSocket URL (ws://HOST:PORT/ws or wss://...)
    url: Option<String>,

    /// Named connection profile to load or create
    #[arg(short = 'P', long)]
    profile: Option<String>,

    /// Overwrite an existing profile without asking
    #[arg(long)]
    save: bool,

    /// Run against built-in fake containers
    #[arg(long)]
    demo: bool,

    /// Auth token sent to the backend
    #[arg(short, long, env = "DOCKWATCH_TOKEN")]
    token: Option<String>,

    /// Stats refresh interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Compose stack targeted by the deploy action
    #[arg(long)]
    stack: Option<String>,

    /// Log file (defaults to the platform data dir)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Resolve and persist the profile, then exit without connecting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    if let Err(e) = logging::init(&log_path) {
        eprintln!("warning: logging disabled ({}): {e}", log_path.display());
    }

    // Demo mode short-circuit
    if cli.demo || matches!(cli.profile.as_deref(), Some("demo")) {
        if cli.dry_run {
            return Ok(());
        }
        return run_demo(&cli).await;
    }

    let mut profiles = load_profiles();
    let req = ProfileRequest {
        profile_name: cli.profile.clone(),
        url: cli.url.clone(),
        token: cli.token.clone(),
        interval_ms: cli.interval_ms,
    };

    let entry = match req.resolve(&profiles) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = cli.profile.as_ref() {
                let write = match save_decision(&profiles, name, &entry) {
                    SaveDecision::Create => true,
                    SaveDecision::Unchanged => false,
                    SaveDecision::Overwrite => {
                        cli.save || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "))
                    }
                };
                if write {
                    profiles.profiles.insert(name.clone(), entry.clone());
                    if let Err(e) = save_profiles(&profiles) {
                        warn!(error = %e, "could not save profiles");
                    }
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(mut names) => {
            // Always add demo option to list
            if !names.iter().any(|n| n == "demo") {
                names.push("demo".into());
            }
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let Some(name) = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| idx.checked_sub(1))
                .and_then(|idx| names.get(idx))
            else {
                return Ok(());
            };
            if name == "demo" {
                return run_demo(&cli).await;
            }
            match profiles.profiles.get(name) {
                Some(entry) => entry.clone(),
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (ws://HOST:PORT/ws or wss://...): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let token = prompt_string("Enter auth token (or leave blank): ")?;
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                token: Some(token.trim().to_string()).filter(|t| !t.is_empty()),
                interval_ms: cli.interval_ms,
            };
            profiles.profiles.insert(name, entry.clone());
            save_profiles(&profiles).context("saving profiles")?;
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(());
        }
    };

    if cli.dry_run {
        return Ok(());
    }

    let interval = interval_for(entry.interval_ms)?;
    let remote = Remote::connect(&entry.url, entry.token.as_deref())
        .await
        .with_context(|| format!("connecting to {}", entry.url))?;
    info!(url = %entry.url, ?interval, "starting dashboard");

    let stack = cli
        .stack
        .clone()
        .or_else(|| cli.profile.clone())
        .unwrap_or_else(|| "default".into());
    let mut app = App::new(entry.url.clone(), stack, interval);
    app.run(Source::Remote(remote))
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
}

fn interval_for(ms: Option<u64>) -> anyhow::Result<Duration> {
    let ms = validate_interval(ms.unwrap_or(DEFAULT_INTERVAL_MS))?;
    Ok(Duration::from_millis(ms))
}

// --- Demo Mode ---

async fn run_demo(cli: &Cli) -> anyhow::Result<()> {
    let interval = interval_for(cli.interval_ms)?;
    info!("starting demo dashboard");
    let stack = cli.stack.clone().unwrap_or_else(|| "demo".into());
    let mut app = App::new("demo", stack, interval);
    app.run(Source::Demo(DemoSource::new()))
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
