// ============================================================================
// camcal-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: fern Dispatch for Console and File Output
//
// The core library logs through the `log` facade only. The CLI installs a fern
// dispatcher that writes timestamped, level-colored lines to stderr and, when
// --log-file is given, plain lines to that file.
//
// KEY COMPONENTS:
// - init_logging: installs the global logger
// - get_timestamp: log line timestamps
//
// LEVELS:
// - default: info for camcal crates, warn for everything else
// - --verbose: debug for camcal crates

use crate::error::CliResult;

use anyhow::Context;
use log::LevelFilter;
use owo_colors::OwoColorize;
use std::path::Path;

/// Returns the current local timestamp formatted as "YYYY-MM-DD HH:MM:SS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Level used for camcal's own log targets.
pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose { LevelFilter::Debug } else { LevelFilter::Info }
}

fn colored_level(level: log::Level) -> String {
    let label = format!("{level:<5}");
    match level {
        log::Level::Error => label.bright_red().to_string(),
        log::Level::Warn => label.yellow().to_string(),
        log::Level::Info => label.green().to_string(),
        log::Level::Debug => label.blue().to_string(),
        log::Level::Trace => label.magenta().to_string(),
    }
}

/// Installs the global logger. Must be called once, before any command runs.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> CliResult<()> {
    let level = level_for(verbose);
    let use_color = crate::terminal::should_use_color();

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = if use_color {
                colored_level(record.level())
            } else {
                format!("{:<5}", record.level())
            };
            out.finish(format_args!("{} {} {}", get_timestamp(), level, message))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level(LevelFilter::Warn)
        .level_for("camcal_core", level)
        .level_for("camcal_cli", level)
        .level_for("camcal", level)
        .chain(console);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = fern::log_file(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} [{}] {}: {}",
                        get_timestamp(),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        );
    }

    dispatch.apply().context("Failed to install logger")?;
    log::debug!("Logger initialized with level: {}", level);
    Ok(())
}
