//! Application driver.
//! Loads/merges config, initializes logging, installs the interrupt handler,
//! builds the backends and runs one transfer while rendering its progress.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle};
use tracing::{debug, error, info};

use lumen::cli::Args;
use lumen::config::{load_or_init, LoadResult, CONFIG_ENV};
use lumen::output::{self as out, ProgressLine};
use lumen::{
    default_config_path, BackendKind, BackendRef, Config, LocalBackend, MountedDeviceBackend,
    PendingTransfer, TransferOrchestrator, TransferPhase, TransferState,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        return print_config();
    }

    let mut cfg = match load_or_init()? {
        LoadResult::Loaded(path, cfg) => {
            debug!(path = %path.display(), "Using config file");
            cfg
        }
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!("A template lumen config was written to: {}", path.display()));
            out::print_info("Set <device_root> to the mount point of your device to use mtp:// paths.");
            Config::default()
        }
    };
    args.apply_overrides(&mut cfg);

    let guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {}", e));
        e
    })?;

    debug!("Starting lumen: {:?}", args);
    let result = cfg.validate().and_then(|()| transfer(&args, &cfg));

    // Ensure logs are flushed before exit
    drop(guard);
    result
}

fn print_config() -> Result<()> {
    if let Some(cfg_env) = std::env::var_os(CONFIG_ENV) {
        out::print_info(&format!(
            "Using {} (explicit):\n  {}\n",
            CONFIG_ENV,
            Path::new(&cfg_env).display()
        ));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return Ok(());
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default lumen config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run a transfer to create a template.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
    Ok(())
}

fn backend_for(kind: BackendKind, cfg: &Config) -> Result<BackendRef> {
    let backend: BackendRef = match kind {
        BackendKind::Local => Arc::new(LocalBackend::new(cfg.copy_options())),
        BackendKind::DeviceProtocol => {
            let Some(root) = cfg.device_root.as_ref() else {
                bail!("no device is configured: set <device_root> in the config file or pass --device-root");
            };
            let device = MountedDeviceBackend::new(root, cfg.copy_options());
            debug!(root = %device.root().display(), "Using mounted device");
            Arc::new(device)
        }
    };
    Ok(backend)
}

fn transfer(args: &Args, cfg: &Config) -> Result<()> {
    let source_path = args.source_path().ok_or_else(|| anyhow!("SOURCE is required"))?;
    let dest_path = args.dest_path().ok_or_else(|| anyhow!("DEST_DIR is required"))?;
    let source = backend_for(args.source_kind(), cfg)?;
    let dest = backend_for(args.dest_kind(), cfg)?;

    if dest.kind() == BackendKind::Local && Path::new(&dest_path).is_file() {
        bail!("destination '{}' is a file; expected a directory", dest_path);
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;

    let final_state = runtime.block_on(drive(source, dest, &source_path, &dest_path, cfg))?;
    report(&final_state, &dest_path)
}

async fn drive(
    source: BackendRef,
    dest: BackendRef,
    source_path: &str,
    dest_path: &str,
    cfg: &Config,
) -> Result<TransferState> {
    let item = {
        let source = Arc::clone(&source);
        let path = source_path.to_string();
        tokio::task::spawn_blocking(move || source.stat(&path)).await?
    };
    let item = item.inspect_err(|e| {
        error!(code = e.code(), path = source_path, error = %e, "Cannot read source")
    })?;
    debug!(?item, "Resolved source item");

    let orch = TransferOrchestrator::new(Handle::current()).with_unsupported_delay(cfg.unsupported_delay);
    {
        let orch = orch.clone();
        ctrlc::set_handler(move || {
            out::print_warn("Received interrupt; cancelling transfer...");
            orch.cancel();
        })
        .map_err(|e| anyhow!("failed to install interrupt handler: {e}"))?;
    }

    let mut rx = orch.subscribe();
    let mut line = ProgressLine::new();
    orch.start_transfer(PendingTransfer::new(item, source), dest, dest_path);

    loop {
        let state = rx.borrow_and_update().clone();
        line.update(&state);
        if !state.phase.is_active() {
            line.finish();
            return Ok(state);
        }
        if rx.changed().await.is_err() {
            line.finish();
            return Ok(orch.state());
        }
    }
}

fn report(state: &TransferState, dest_path: &str) -> Result<()> {
    match state.phase {
        TransferPhase::Done => {
            info!(file = %state.filename, dest = dest_path, "Transfer completed");
            out::print_success(&format!("{} -> {}", state.filename, dest_path));
            Ok(())
        }
        TransferPhase::Cancelled => Err(anyhow!("transfer of '{}' was cancelled", state.filename)),
        TransferPhase::Unsupported => Err(anyhow!("{}", state.status)),
        TransferPhase::Error => Err(anyhow!(
            "{}",
            state.status.strip_prefix("Error: ").unwrap_or(&state.status).to_string()
        )),
        phase => Err(anyhow!("transfer ended in unexpected phase '{phase}'")),
    }
}
