//! Application host.
//! Loads/merges config, initializes logging, installs the crash-cleanup
//! signal handler, runs the startup sweep, and dispatches the requested
//! operation against the migration engine.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use store_shift::config::{self, LoadResult, Settings};
use store_shift::output as out;
use store_shift::{MigrateError, engine, shutdown};

use crate::cli::Args;
use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    let (mut settings, created_template) = match config::load_or_init()? {
        LoadResult::Loaded(s) => (s, None),
        LoadResult::CreatedTemplate(path, s) => (s, Some(path)),
    };
    args.apply_overrides(&mut settings);

    // Initialize logging and capture the guard so logs flush on signal
    let guard_opt =
        init_tracing(&settings.log_level, settings.log_file.as_deref(), args.json).map_err(
            |e| {
                out::print_error(&format!("Failed to initialize logging: {}", e));
                e
            },
        )?;

    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            // Remove the in-flight job's staging/lock artifacts before the
            // process dies; the startup sweep covers anything that survives.
            engine::cleanup_active();
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
            std::process::exit(130);
        })
        .expect("failed to install signal handler");
    }

    if let Some(path) = created_template {
        out::print_success(&format!(
            "A template store_shift config was written to: {}",
            path.display()
        ));
        out::print_info(
            "Edit the file to change `storage_path`, `log_level` or `log_file`, or re-run with a destination to migrate the default location.",
        );
    }

    debug!("Starting store_shift: {:?}", args);

    // Sweep leftovers from a crashed migration before anything else runs.
    if let Some(parent) = settings.migrate_parent.clone() {
        if let Err(e) = engine::remove_stale_artifacts(&parent) {
            out::print_warn(&format!(
                "Could not clean stale migration artifacts under '{}': {}",
                parent.display(),
                e
            ));
        }
    }

    let result = dispatch(&args, &mut settings);

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn dispatch(args: &Args, settings: &mut Settings) -> Result<()> {
    if args.cleanup_only {
        out::print_info("Startup cleanup finished.");
        return Ok(());
    }
    if args.reclaim_previous {
        return reclaim_previous(settings);
    }

    let Some(dest_parent) = args.destination_parent.as_deref() else {
        bail!("no destination given; pass the directory to migrate the data into (see --help)");
    };
    run_migration(settings, dest_parent, args.json)
}

fn run_migration(settings: &mut Settings, dest_parent: &Path, json: bool) -> Result<()> {
    let mut sink = |percent: u8| {
        if json {
            println!(
                "{}",
                serde_json::json!({"event": "progress", "percent": percent})
            );
        } else {
            out::print_progress(percent);
        }
    };

    match engine::migrate(settings, dest_parent, &mut sink) {
        Ok(outcome) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "old_path": outcome.old_path,
                        "new_path": outcome.new_path,
                    })
                );
            } else {
                out::print_success(&format!(
                    "Data migration is completed: '{}' -> '{}'",
                    outcome.old_path.display(),
                    outcome.new_path.display()
                ));
                out::print_info(
                    "Restart any processes using the old location so they pick up the new path.",
                );
            }
            info!(
                old = %outcome.old_path.display(),
                new = %outcome.new_path.display(),
                "migration completed"
            );
            Ok(())
        }
        Err(e) => {
            report_failure(&e, json);
            Err(e.into())
        }
    }
}

fn report_failure(e: &MigrateError, json: bool) {
    let code = e.code();
    match e {
        MigrateError::Validation { path, reason } => {
            error!(code, kind = "validation", path = %path.display(), %reason, "Migration rejected")
        }
        MigrateError::InsufficientSpace {
            required,
            available,
            dest,
        } => {
            error!(code, kind = "insufficient_space", required = *required, available = *available, dest = %dest.display(), "Migration failed")
        }
        MigrateError::Scan { path, .. } => {
            error!(code, kind = "scan", path = %path.display(), error = %e, "Migration failed")
        }
        MigrateError::Copy { path, .. } => {
            error!(code, kind = "copy", path = %path.display(), error = %e, "Migration failed")
        }
        MigrateError::CommitConflict { dest } => {
            error!(code, kind = "commit_conflict", dest = %dest.display(), "Migration failed")
        }
        MigrateError::VolumeQuery { path, .. } => {
            error!(code, kind = "volume_query", path = %path.display(), error = %e, "Migration failed")
        }
        _ => {
            error!(code, error = %e, "Migration failed")
        }
    }
    if json {
        println!(
            "{}",
            serde_json::json!({"success": false, "message": e.to_string()})
        );
    } else {
        out::print_error(&e.to_string());
    }
}

/// Delete the data directory left at the previous location. Kept outside the
/// engine on purpose: relocation never destroys data, reclamation is an
/// explicit user decision.
fn reclaim_previous(settings: &mut Settings) -> Result<()> {
    let Some(previous) = settings.previous_path.clone() else {
        out::print_info("No previous location is recorded; nothing to reclaim.");
        return Ok(());
    };
    if previous == settings.storage_path {
        bail!(
            "previous location '{}' equals the active storage path; refusing to delete it",
            previous.display()
        );
    }
    if !previous.exists() {
        out::print_info(&format!(
            "Previous location '{}' is already gone.",
            previous.display()
        ));
    } else {
        fs::remove_dir_all(&previous)
            .with_context(|| format!("remove previous location '{}'", previous.display()))?;
        out::print_success(&format!(
            "Reclaimed previous location: {}",
            previous.display()
        ));
        info!(path = %previous.display(), "previous location removed");
    }
    settings.previous_path = None;
    settings.save()?;
    Ok(())
}

fn print_config_location() {
    if let Some(env_path) = config::config_env_override() {
        out::print_info(&format!(
            "Using {} (explicit):\n  {}\n",
            config::CONFIG_ENV,
            env_path.display()
        ));
        out::print_info(&format!(
            "To override, unset {} or set it to another file.",
            config::CONFIG_ENV
        ));
        return;
    }
    match config::default_config_path() {
        Ok(p) => {
            out::print_info(&format!(
                "Default store_shift config path:\n  {}\n",
                p.display()
            ));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info(
                    "No config file exists there yet. Run without --print-config to create a template.",
                );
            }
        }
        Err(e) => {
            out::print_error(&format!("Could not determine a default config path: {e}"));
        }
    }
}
