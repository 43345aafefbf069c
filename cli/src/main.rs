//! CLI entrypoint for turnstile
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use turnstile_application::{
    GenerationSource, SessionController, SessionRegistry, SingleShot, Transport,
};
use turnstile_domain::UserId;
use turnstile_infrastructure::{
    ConfigLoader, InMemoryDialogStore, JsonlConversationLogger, OpenAiGenerationSource,
};
use turnstile_presentation::{ChatRepl, Cli, ConsoleTransport};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let log_file = cli.log_file.as_ref().or(config.logging.log_file.as_ref());
    let _log_guard = init_logging(cli.verbose, log_file.map(|p| p.as_path()))?;

    info!("Starting turnstile");

    let issues = config.validate();
    for issue in &issues {
        warn!("{}", issue);
    }
    if issues.iter().any(|i| i.is_error()) {
        bail!(
            "Invalid configuration:\n{}",
            issues
                .iter()
                .filter(|i| i.is_error())
                .map(|i| format!("  {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut session = config.to_session_config();
    if let Some(model) = &cli.model {
        session = session.with_default_model(model.clone());
    }

    // === Dependency Injection ===
    let backend = OpenAiGenerationSource::from_config(&config.generation)
        .context("Failed to create the generation client")?;
    let streaming = config.session.enable_streaming && !cli.no_stream;
    let source: Arc<dyn GenerationSource> = if streaming {
        Arc::new(backend)
    } else {
        Arc::new(SingleShot(backend))
    };

    let console = ConsoleTransport::stdout();
    let transport: Arc<dyn Transport> = if cli.no_color {
        Arc::new(console.without_color())
    } else {
        Arc::new(console)
    };

    let mut controller = SessionController::new(
        Arc::new(SessionRegistry::new()),
        transport.clone(),
        Arc::new(InMemoryDialogStore::new()),
        source,
        session,
    );

    let conversation_log = cli
        .conversation_log
        .as_ref()
        .or(config.logging.conversation_log.as_ref());
    if let Some(path) = conversation_log {
        match JsonlConversationLogger::new(path) {
            Some(logger) => {
                info!("Conversation log: {}", logger.path().display());
                controller = controller.with_conversation_logger(Arc::new(logger));
            }
            None => warn!("Conversation logging disabled"),
        }
    }

    let user: UserId = cli.user.parse().context("Invalid --user")?;
    if let Some(mode) = &cli.mode {
        controller
            .switch_chat_mode(&user, mode)
            .await
            .with_context(|| format!("Cannot switch to chat mode '{}'", mode))?;
    }

    info!(user = %user, streaming, "Chat session ready");
    ChatRepl::new(controller, transport, user).run().await?;

    Ok(())
}

/// Initialize logging based on verbosity level.
///
/// Logs go to stderr, or to `log_file` when given. The returned guard must
/// live until exit so buffered file output is flushed.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}
