//! Taprelay - notification-triggered contract address relay
//!
//! Run with `taprelay` or `taprelay daemon` to start the daemon.
//! Use `taprelay logs` to review recent report outcomes.
//! Use `taprelay set-backend <URL>` to point at a different backend.

use clap::Parser;
use std::path::{Path, PathBuf};
use taprelay::cli::{Cli, Commands};
use taprelay::config::{self, BackendConfigStore, Config};
use taprelay::logstore::{LogEntry, LogStore};
use taprelay::report::{endpoint_url, ReportSink};
use taprelay::{clipboard, daemon};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("taprelay={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut config = config::load_config(cli.config.as_deref())?;

    // A CLI override pins the endpoint for this run; otherwise follow the file
    let backend = match cli.backend_url {
        Some(url) => {
            config.backend.endpoint_base_url = url.clone();
            BackendConfigStore::new(url)
        }
        None => match config_path.clone() {
            Some(path) if std::env::var_os("TAPRELAY_BACKEND_URL").is_none() => {
                BackendConfigStore::with_file(config.backend.endpoint_base_url.clone(), path)
            }
            _ => BackendConfigStore::new(config.backend.endpoint_base_url.clone()),
        },
    };

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon = daemon::Daemon::new(config, backend);
            daemon.run().await?;
        }

        Commands::Logs { json, limit } => {
            show_logs(&config, json, limit)?;
        }

        Commands::ClearLogs => {
            let store = LogStore::open(config.resolve_log_path(), config.log.capacity)?;
            store.clear()?;
            println!("Logs cleared.");
        }

        Commands::SetBackend { url } => {
            let path = config_path
                .ok_or_else(|| anyhow::anyhow!("No config path available; use --config"))?;
            BackendConfigStore::with_file(config.backend.endpoint_base_url.clone(), path.clone())
                .set_endpoint_base_url(&url)?;
            println!("Backend URL saved to {:?}", path);
            println!("Reports will be sent to {}", endpoint_url(&url));
        }

        Commands::Config => {
            show_config(&config, config_path.as_deref());
        }

        Commands::TestConnection { url } => {
            let base = url.unwrap_or_else(|| backend.endpoint_base_url());
            test_connection(&config, backend, &base).await?;
        }

        Commands::Clipboard => {
            let gateway = clipboard::create_gateway(&config.clipboard);
            let text = gateway.read().await?;
            if text.trim().is_empty() {
                println!("Clipboard is empty");
            } else {
                println!("{}", text);
            }
        }

        Commands::Init { force } => {
            let path = config_path
                .ok_or_else(|| anyhow::anyhow!("No config path available; use --config"))?;
            init_config(&path, force)?;
        }
    }

    Ok(())
}

/// Print stored log entries, most recent first
fn show_logs(config: &Config, json: bool, limit: Option<usize>) -> anyhow::Result<()> {
    let store = LogStore::open(config.resolve_log_path(), config.log.capacity)?;
    let mut entries = store.load_all();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No log entries yet.");
        return Ok(());
    }

    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &LogEntry) {
    let address = if entry.contract_address.is_empty() {
        "(none)"
    } else {
        entry.contract_address.as_str()
    };
    let extraction = if entry.extraction_status.is_empty() {
        "-"
    } else {
        entry.extraction_status.as_str()
    };

    println!("[{}] {}", entry.timestamp, entry.status);
    println!("  Notification: {}", entry.notification_text);
    println!("  Address:      {}", address);
    println!("  Extraction:   {}", extraction);
    println!("  Response:     {}", entry.response);
    println!();
}

/// Post the test payload and print the outcome
async fn test_connection(
    config: &Config,
    backend: BackendConfigStore,
    base: &str,
) -> anyhow::Result<()> {
    println!("Testing {}...", endpoint_url(base));

    // Never written to; the test payload bypasses the log store
    let sink = ReportSink::new(
        backend,
        &config.backend,
        std::sync::Arc::new(LogStore::in_memory(1)),
    );
    let base = base.to_string();
    let outcome = tokio::task::spawn_blocking(move || sink.test_connection(&base)).await?;

    println!("{}", outcome.status());
    let response = outcome.response();
    if !response.is_empty() {
        println!("{}", response);
    }

    if !outcome.is_success() {
        anyhow::bail!("Backend test failed");
    }
    Ok(())
}

/// Write the default config template
fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        println!("Config already exists at {:?} (use --force to overwrite)", path);
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config::DEFAULT_CONFIG)?;
    println!("Wrote default config to {:?}", path);
    Ok(())
}

fn show_config(config: &Config, path: Option<&Path>) {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[backend]");
    println!("  endpoint_base_url = {:?}", config.backend.endpoint_base_url);
    println!("  (reports go to {})", endpoint_url(&config.backend.endpoint_base_url));
    println!("  connect_timeout_secs = {}", config.backend.connect_timeout_secs);
    println!("  request_timeout_secs = {}", config.backend.request_timeout_secs);

    println!("\n[target]");
    println!("  app = {:?}", config.target.app);

    println!("\n[pipeline]");
    println!("  app_open_delay_ms = {}", config.pipeline.app_open_delay_ms);
    println!("  session_timeout_ms = {}", config.pipeline.session_timeout_ms);
    println!("  tap_x = {}", config.pipeline.tap_x);
    println!("  tap_y = {}", config.pipeline.tap_y);

    println!("\n[clipboard]");
    println!(
        "  backend = {:?} (resolved: {:?})",
        config.clipboard.backend,
        clipboard::resolve_backend(config.clipboard.backend)
    );

    println!("\n[gesture]");
    println!("  backend = {:?}", config.gesture.backend);
    println!("  press_ms = {}", config.gesture.press_ms);

    println!("\n[launcher]");
    println!("  command = {:?}", config.launcher.command);

    println!("\n[source]");
    println!("  kind = {:?}", config.source.kind);
    println!("  listen = {:?}", config.source.listen);

    println!("\n[log]");
    println!("  path = {:?}", config.log.path);
    println!("  capacity = {}", config.log.capacity);

    println!("\n---");
    match path {
        Some(path) => println!("Config file: {:?}", path),
        None => println!("Config file: (none)"),
    }
    let log_path: PathBuf = config.resolve_log_path();
    println!("Log file: {:?}", log_path);
}
