use std::io;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use berth::cli::Cli;
use berth::config::Config;
use berth::theme::{self, Theme};

fn main() -> ExitCode {
    let config = Config::from(Cli::parse());

    let _log_guard = init_logging(&config);

    let monochrome = config.no_color || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    theme::init(if monochrome { Theme::monochrome() } else { Theme::default() });

    let should_quit = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&should_quit)) {
            tracing::warn!(%err, signal, "could not register signal handler");
        }
    }

    // Leave the terminal usable if anything below panics.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        berth::app::restore_terminal();
        default_hook(info);
    }));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "berth starting");
    match berth::app::run(config, should_quit) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "exiting with error");
            eprintln!("berth: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to a file; the terminal belongs to the UI. Falls back to
/// discarding them if the file cannot be opened.
fn init_logging(config: &Config) -> WorkerGuard {
    let filter = config
        .log_filter
        .as_deref()
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file);
    let (writer, guard) = match file {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(err) => {
            eprintln!("berth: cannot open log file {}: {err}", config.log_file.display());
            tracing_appender::non_blocking(io::sink())
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .init();
    guard
}
