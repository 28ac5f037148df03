use anyhow::{Context, Result};
use replyflow_core::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: a terminal layer, plus a non-ANSI file
/// layer when `logging.file` is set.
pub fn init(debug: bool, logging: &LoggingConfig) -> Result<()> {
    let terminal_filter = terminal_filter(debug, logging);
    let terminal_layer = fmt::layer().with_target(false).with_filter(terminal_filter);

    let file_layer = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new(level_directive(debug, logging))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn level_directive(debug: bool, logging: &LoggingConfig) -> &'static str {
    if debug { "debug" } else { logging.filter_directive() }
}

fn terminal_filter(debug: bool, logging: &LoggingConfig) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(logging.filter_directive()))
    }
}
