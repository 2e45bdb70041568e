//! sessionlink - resilient session channel client
//!
//! This is the main entry point for the sessionlink binary. The client
//! opens a session-keyed channel to the configured server, logs inbound
//! messages by kind, and keeps the channel alive across disconnects until
//! interrupted.

use clap::Parser;
use tracing::{error, info, warn};
use uuid::Uuid;

use sessionlink::channel::{ChannelSettings, ConnectionManager};
use sessionlink::cli::{Cli, Commands, ConfigSubcommand};
use sessionlink::config::{self, ClientConfig};
use sessionlink::error::{Error, Result};
use sessionlink::protocol::{kind, AudioContent, ChatContent, ErrorContent};
use sessionlink::{logging, version};

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // For commands that don't need full logging, use simple setup
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone());
        }
        _ => {}
    }

    // Load configuration for the run command
    let (config_path, session_override) = match &cli.command {
        Commands::Run { config, session } => (config.clone(), session.clone()),
        _ => (None, None),
    };

    // Load config (or use defaults)
    let config = match ClientConfig::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Use formatted error for terminal
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    };

    // Initialize logging with config settings
    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    // Log version info at startup
    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting sessionlink"
    );

    run_client(config, session_override)
}

/// Handle config subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let config = ClientConfig::load(config.as_deref())?;
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| Error::Internal(format!("Failed to serialize config: {}", e)))?;
            println!("{}", toml_str);
            Ok(())
        }
        ConfigSubcommand::Init { path, force } => config::init_config(path.as_deref(), force),
        ConfigSubcommand::Validate { config } => {
            match ClientConfig::load(config.as_deref()) {
                Ok(_) => {
                    println!("Configuration is valid");
                    Ok(())
                }
                Err(e) => {
                    eprint!("{}", e.format_for_terminal());
                    std::process::exit(e.exit_code());
                }
            }
        }
    }
}

/// Run the client in normal operation mode
fn run_client(config: ClientConfig, session_override: Option<String>) -> Result<()> {
    let session_id = session_override
        .or_else(|| config.session.id.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        session_id = %session_id,
        server_url = %config.server.url,
        "Configuration loaded"
    );

    // Build and run the tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("sessionlink")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    runtime.block_on(async_client_main(config.channel_settings(), session_id))
}

/// Async client main loop
async fn async_client_main(settings: ChannelSettings, session_id: String) -> Result<()> {
    let manager = ConnectionManager::new(settings);

    install_handlers(&manager);

    manager.connect(&session_id).await;

    // Keep the channel alive (reconnecting as needed) until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Internal(format!("Failed to listen for shutdown signal: {}", e)))?;

    info!("Shutdown signal received");
    manager.disconnect();

    Ok(())
}

/// Register logging handlers for the well-known message kinds
fn install_handlers(manager: &ConnectionManager) {
    let _ = manager.on_message(kind::CHAT, |envelope| {
        match envelope.content_as::<ChatContent>() {
            Ok(chat) => info!(
                sender = chat.sender.as_deref().unwrap_or("server"),
                text = %chat.text,
                "chat message"
            ),
            Err(e) => warn!(error = %e, "chat message with unexpected payload"),
        }
    });

    let _ = manager.on_message(kind::AUDIO, |envelope| {
        match envelope
            .content_as::<AudioContent>()
            .and_then(|audio| audio.decode_data())
        {
            Ok(bytes) => info!(bytes = bytes.len(), "audio chunk received"),
            Err(e) => warn!(error = %e, "audio chunk with unexpected payload"),
        }
    });

    let _ = manager.on_message(kind::ERROR, |envelope| {
        match envelope.content_as::<ErrorContent>() {
            Ok(err) => error!(
                code = err.code.as_deref().unwrap_or("unknown"),
                message = %err.message,
                "server reported error"
            ),
            Err(e) => warn!(error = %e, "error message with unexpected payload"),
        }
    });
}
