use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use civic_locator::cache::snapshot;
use civic_locator::config::EngineConfig;
use civic_locator::jurisdiction::Level;
use civic_locator::scheduler::RefreshScheduler;
use civic_locator::server::{self, AppState};
use civic_locator::{AggregateResult, Collaborators, ResolutionOrchestrator, ResolveFlags};

/// Civic Locator: who represents a California postal code?
///
/// Resolves a ZIP code to its federal, state, county and municipal
/// officials, deciding which levels apply from incorporation status.
///
/// Examples:
///   civic 95814
///   civic 95608 --committees
///   civic 92501 --refresh --offline
///   civic --serve --port 8080
#[derive(Parser)]
#[command(name = "civic", version, about, long_about = None)]
struct Cli {
    /// Postal code (positional). Example: civic 95814
    #[arg(index = 1)]
    zip: Option<String>,

    /// Attach committee assignments to each representative.
    #[arg(long)]
    committees: bool,

    /// Ignore cached answers and fetch everything again.
    #[arg(long)]
    refresh: bool,

    /// Offline mode: only use the cache and the bundled postal table.
    #[arg(long)]
    offline: bool,

    /// Config file (defaults to ~/.civic/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not read or write the on-disk cache snapshot.
    #[arg(long)]
    no_cache: bool,

    /// Run the HTTP server with background refresh.
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("civic_locator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ── Configuration ───────────────────────────────────────────

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    if cli.offline {
        config.offline = true;
    }

    let collaborators = Collaborators::from_config(&config).context("loading representative sources")?;
    let orchestrator = Arc::new(ResolutionOrchestrator::new(&config, collaborators));

    let snapshot_path = config.snapshot_path.clone().unwrap_or_else(snapshot::default_path);
    if !cli.no_cache {
        match orchestrator.cache().load_snapshot(&snapshot_path) {
            Ok(n) => debug!(entries = n, path = %snapshot_path.display(), "cache snapshot loaded"),
            Err(e) => warn!(error = %e, path = %snapshot_path.display(), "cache snapshot ignored"),
        }
    }

    // ── Serve or resolve ────────────────────────────────────────

    if cli.serve {
        let scheduler = Arc::new(RefreshScheduler::start(config.cadence(), orchestrator.refresh_fn())?);
        let state = Arc::new(AppState::new(Arc::clone(&orchestrator)).with_scheduler(Arc::clone(&scheduler)));
        server::start(state, &cli.host, cli.port)
            .await
            .with_context(|| format!("serving on {}:{}", cli.host, cli.port))?;
        if let Ok(scheduler) = Arc::try_unwrap(scheduler) {
            scheduler.shutdown().await;
        }
    } else {
        let Some(zip) = cli.zip.as_deref() else {
            eprintln!("Error: No postal code specified.");
            eprintln!();
            eprintln!("Usage:");
            eprintln!("  civic 95814");
            eprintln!("  civic 95608 --committees");
            eprintln!("  civic --serve --port 8080");
            std::process::exit(2);
        };

        let flags = ResolveFlags {
            include_committees: cli.committees,
            force_refresh: cli.refresh,
        };
        let result = match orchestrator.resolve_representation(zip, flags).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };

        eprint!("{}", render_banner(&result));
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if !cli.no_cache {
        match orchestrator.cache().save_snapshot(&snapshot_path) {
            Ok(n) => debug!(entries = n, path = %snapshot_path.display(), "cache snapshot saved"),
            Err(e) => warn!(error = %e, path = %snapshot_path.display(), "cache snapshot not saved"),
        }
    }
    orchestrator.shutdown().await;
    Ok(())
}

fn render_banner(result: &AggregateResult) -> String {
    let mut out = String::new();
    match &result.location {
        Some(loc) => out.push_str(&format!("  \u{1F4CD} {}\n", loc.display_line())),
        None => out.push_str(&format!("  \u{1F4CD} {} (location unresolved)\n", result.postal_code)),
    }
    let j = &result.jurisdiction;
    out.push_str(&format!("  \u{1F3DB}  {} ({:.2}): {}\n", j.kind, j.confidence, j.rationale));

    for level in Level::ALL {
        let records = result.records(level);
        let marker = if result.degraded_levels.contains(&level) {
            " [degraded]"
        } else if !j.applicable_levels.contains(level) {
            " [n/a]"
        } else {
            ""
        };
        out.push_str(&format!("  {:<10} {:>2}{}\n", level.as_str(), records.len(), marker));
        for r in records {
            let district = r.district.map(|d| format!(" (district {})", d)).unwrap_or_default();
            out.push_str(&format!("      {} | {}{}\n", r.name, r.title, district));
        }
    }
    for w in &result.warnings {
        out.push_str(&format!("  \u{26A0}\u{FE0F}  {}\n", w));
    }
    out
}
