mod config;
mod error;
mod notifier;
mod poller;
mod practicum;
mod telegram;
mod verdict;

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use teloxide::prelude::*;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use config::{Config, ConfigError, check_tokens};
use notifier::Notifier;
use poller::Poller;
use practicum::PracticumClient;
use telegram::TelegramClient;

const DEFAULT_LOG_FILTER: &str = "homework_bot=debug,info";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Stdout logging, plus an appended log file when `log_dir` is set.
///
/// The returned guard must outlive the program for the file writer to flush.
fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let log_file = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok();
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("homework_bot.log"))
            .inspect_err(|e| eprintln!("Failed to open log file in {}: {e}", dir.display()))
            .ok()
    });

    let (file_layer, guard) = match log_file {
        Some(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(log_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stdout).with_filter(log_filter()))
        .with(file_layer)
        .init();

    guard
}

fn fatal(reason: impl Display) -> ! {
    error!(critical = true, "{reason}");
    eprintln!("{reason}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let env_path = std::env::args().nth(1).unwrap_or_else(|| ".env".to_string());
    let (env_vars, env_error) = match config::read_env_file(&env_path) {
        Ok(vars) => (vars, None),
        Err(e) => (HashMap::new(), Some(e)),
    };
    let lookup = config::env_lookup(&env_vars);

    let _guard = init_logging(config::log_dir(&lookup).as_deref());

    if let Some(e) = env_error {
        fatal(e);
    }
    if !check_tokens(&lookup) {
        fatal(ConfigError::MissingVar(config::missing_vars(&lookup)));
    }
    let config = Config::from_lookup(&lookup).unwrap_or_else(|e| fatal(e));

    info!("🚀 Starting homework-bot...");
    info!("Review API: {}", config.endpoint);
    info!("Notifying chat {}", config.chat_id);

    let practicum = PracticumClient::new(
        config.endpoint.clone(),
        config.practicum_token.clone(),
        config.request_timeout,
    )
    .unwrap_or_else(|e| fatal(e));

    let bot = Bot::new(&config.telegram_token);
    let notifier = Notifier::new(TelegramClient::new(bot), config.chat_id);

    let start = chrono::Utc::now().timestamp();
    Poller::new(practicum, notifier, start, config.retry_period)
        .run()
        .await;

    info!("Stopped");
}
