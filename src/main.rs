//! certsync - SSL certificate sync webhook
//!
//! Main entry point: loads the configuration, sets up logging and serves the
//! webhook until interrupted.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use certsync::api::{AppState, WebhookServer};
use certsync::config::AppConfig;
use certsync::sync::CertificateSyncer;
use cli::{Cli, LogFormat};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if cli.check_config {
        print_summary(&config);
        return Ok(());
    }

    init_logging(config.server.log_filter(), cli.log_format);
    for warning in config.warnings() {
        warn!("{}", warning);
    }

    info!("Starting SSL certificate webhook service v{}", certsync::version());
    info!("Listening on {}", config.server.bind_address());
    info!("Configuration file: {}", cli.config.display());

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(Arc::clone(&config)));

    info!("Initializing application state...");
    state.install_syncer(Arc::new(CertificateSyncer::from_config(&config)));
    info!(
        playbooks_dir = %config.playbooks_dir().display(),
        runner = %config.runner.command,
        "Initialization complete"
    );

    WebhookServer::new(state)
        .run_with_shutdown(shutdown_signal())
        .await
        .context("Webhook server failed")?;

    info!("Application shut down");
    Ok(())
}

/// Initialize logging from the configured level; `RUST_LOG` takes precedence.
fn init_logging(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

/// Print the loaded configuration for `--check-config`.
fn print_summary(config: &AppConfig) {
    println!("Configuration OK");
    println!("  listen:        {}", config.server.bind_address());
    println!("  webhook:       POST {}", config.server.webhook_route());
    println!("  playbooks dir: {}", config.playbooks_dir().display());
    println!("  runner:        {}", config.runner.command);

    println!("Server groups ({}):", config.server_groups.len());
    for (name, group) in &config.server_groups {
        println!("  {} -> {}", name, group.hosts.join(", "));
    }

    println!("Playbook mappings ({}):", config.playbook_mappings.len());
    for rule in &config.playbook_mappings {
        let vars: Vec<_> = rule.ansible_vars().into_keys().collect();
        println!(
            "  {} -> {} on [{}] vars [{}]",
            rule.key,
            rule.playbook_file,
            rule.server_groups.join(", "),
            vars.join(", ")
        );
    }

    for warning in config.warnings() {
        println!("warning: {}", warning);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
