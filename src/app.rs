//! Application orchestrator.
//! Loads/merges config, initializes logging, installs signal handlers, and
//! dispatches the organize/watch subcommands.

use anyhow::{Result, bail};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use filedog::config::{self, Config, LoadResult, WatchEdit};
use filedog::output as out;
use filedog::{
    Classifier, EngineConfig, Organizer, Outcome, WatchEngine, WatchRegistry, shutdown,
};

use filedog::cli::{Args, Command, WatchCommand};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle print-config before logging init
    if matches!(args.command, Command::PrintConfig) {
        print_config_location(&args);
        return Ok(());
    }

    // Build config; CLI args override file values.
    let load = config::load_or_init(args.config.as_deref())?;
    let created = match &load {
        LoadResult::CreatedTemplate(_, path) => Some(path.clone()),
        _ => None,
    };
    let mut cfg = load.into_config();
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt: Option<tracing_appender::non_blocking::WorkerGuard> =
        init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
            out::print_error(&format!("Failed to initialize logging: {}", e));
            e
        })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; shutting down gracefully...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
        })
        .expect("failed to install signal handler");
    }

    if let Some(path) = created {
        out::print_success(&format!(
            "A template filedog config was written to: {}",
            path.display()
        ));
        out::print_info(
            "Edit it to customize classification rules and watch folders; built-in defaults are in effect for this run.",
        );
    }

    if shutdown::is_requested() {
        return Ok(());
    }

    debug!("Starting filedog: {:?}", args);

    let result = match &args.command {
        Command::Organize {
            dir,
            dry_run,
            verbose,
        } => cmd_organize(&cfg, dir, *dry_run, *verbose),
        Command::Watch(WatchCommand::Start) => cmd_watch_start(&cfg),
        Command::Watch(WatchCommand::Status) => cmd_watch_status(&cfg),
        Command::Watch(WatchCommand::Add { dir }) => {
            if !dir.is_dir() {
                bail!("not a directory: {}", dir.display());
            }
            match config::set_watch_entry(args.config.as_deref(), dir, WatchEdit::Add)? {
                true => out::print_success(&format!("Added to watch list: {}", dir.display())),
                false => out::print_info(&format!("Already being watched: {}", dir.display())),
            }
            Ok(())
        }
        Command::Watch(WatchCommand::Remove { dir }) => {
            match config::set_watch_entry(args.config.as_deref(), dir, WatchEdit::Remove)? {
                true => out::print_success(&format!("Removed from watch list: {}", dir.display())),
                false => out::print_info(&format!("Not in the watch list: {}", dir.display())),
            }
            Ok(())
        }
        Command::Watch(WatchCommand::Enable { dir }) => {
            config::set_watch_entry(args.config.as_deref(), dir, WatchEdit::Enable)?;
            out::print_success(&format!("Enabled: {}", dir.display()));
            Ok(())
        }
        Command::Watch(WatchCommand::Disable { dir }) => {
            config::set_watch_entry(args.config.as_deref(), dir, WatchEdit::Disable)?;
            out::print_success(&format!("Disabled: {}", dir.display()));
            Ok(())
        }
        Command::PrintConfig => unreachable!("handled above"),
    };

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn print_config_location(args: &Args) {
    if let Some(p) = &args.config {
        out::print_info(&format!("Using --config (explicit):\n  {}\n", p.display()));
        return;
    }
    if let Ok(cfg_env) = std::env::var("FILEDOG_CONFIG") {
        out::print_info(&format!("Using FILEDOG_CONFIG (explicit):\n  {}\n", cfg_env));
        out::print_info("To override, unset FILEDOG_CONFIG or set it to another file.");
        return;
    }
    match config::config_path() {
        Ok(p) => {
            out::print_info(&format!("Default filedog config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info(
                    "No config file exists there yet. Run any other command to create a template.",
                );
            }
        }
        Err(e) => {
            out::print_error(&format!("Could not determine a default config path: {e}"));
        }
    }
}

fn cmd_organize(cfg: &Config, dir: &std::path::Path, dry_run: bool, verbose: bool) -> Result<()> {
    let classifier = Arc::new(Classifier::new(cfg.rules.clone()));
    let organizer = Organizer::new(classifier);

    let report = match organizer.organize(dir, dry_run) {
        Ok(r) => r,
        Err(e) => {
            error!(dir = %dir.display(), error = ?e, "organize failed");
            return Err(e);
        }
    };

    if verbose {
        for record in &report.records {
            let line = match (&record.outcome, &record.dest) {
                (Outcome::Moved, Some(dest)) if dry_run => {
                    format!("would move: {} -> {}", record.source.display(), dest.display())
                }
                (Outcome::Moved, Some(dest)) => {
                    format!("moved: {} -> {}", record.source.display(), dest.display())
                }
                (Outcome::Moved, None) => format!("moved: {}", record.source.display()),
                (Outcome::SkippedInBucket, _) => {
                    format!("skipped (already sorted): {}", record.source.display())
                }
                (Outcome::SkippedAlreadyMoved, _) => {
                    format!("skipped (already moved): {}", record.source.display())
                }
                (Outcome::Failed(reason), _) => {
                    format!("failed: {} ({})", record.source.display(), reason)
                }
            };
            out::print_user(&line);
        }
    }

    let summary = format!(
        "{} moved, {} skipped, {} failed",
        report.moved(),
        report.skipped(),
        report.failed()
    );
    if dry_run {
        out::print_info(&format!("Dry-run: {summary} (no files were touched)"));
    } else if report.failed() > 0 {
        out::print_warn(&summary);
    } else {
        out::print_success(&summary);
    }
    Ok(())
}

fn cmd_watch_start(cfg: &Config) -> Result<()> {
    let registry = Arc::new(WatchRegistry::from_config(&cfg.watch_dirs));
    if registry.enabled_dirs().is_empty() {
        bail!("no enabled watch directories configured; add one with `filedog watch add <DIR>`");
    }

    let classifier = Arc::new(Classifier::new(cfg.rules.clone()));
    let organizer = Arc::new(Organizer::new(classifier));
    let engine = WatchEngine::new(Arc::clone(&registry), organizer, EngineConfig::from(cfg));
    engine.start()?;

    for sub in registry.list() {
        info!(dir = %sub.dir.display(), enabled = sub.enabled, "watch subscription");
    }
    out::print_info("Watching; press Ctrl-C to stop.");

    while !shutdown::is_requested() {
        thread::sleep(Duration::from_millis(200));
    }
    engine.stop();
    Ok(())
}

fn cmd_watch_status(cfg: &Config) -> Result<()> {
    if cfg.watch_dirs.is_empty() {
        out::print_info("No watch directories configured.");
        return Ok(());
    }
    for entry in &cfg.watch_dirs {
        let state = if entry.enabled { "enabled " } else { "disabled" };
        let missing = if entry.path.is_dir() { "" } else { " (missing)" };
        out::print_user(&format!("{state}  {}{missing}", entry.path.display()));
    }
    Ok(())
}
