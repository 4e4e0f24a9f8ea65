use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// Settings fixed for the lifetime of the process.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: Option<String>,
    pub debounce: Duration,
    pub monitor_interval: Duration,
    pub status_ttl: Duration,
    pub log_tail: usize,
    pub log_buffer: usize,
    pub show_all: bool,
    pub show_header: bool,
    pub no_color: bool,
    pub log_file: PathBuf,
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            debounce: Duration::from_millis(250),
            monitor_interval: Duration::from_secs(2),
            status_ttl: Duration::from_secs(5),
            log_tail: 200,
            log_buffer: 10_000,
            show_all: false,
            show_header: true,
            no_color: false,
            log_file: default_log_file(),
            log_filter: None,
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host.filter(|h| !h.trim().is_empty()),
            // A zero window would arm a timer per event.
            debounce: Duration::from_millis(cli.debounce_ms.max(10)),
            monitor_interval: Duration::from_millis(cli.monitor_interval_ms.max(250)),
            status_ttl: Duration::from_millis(cli.status_ttl_ms),
            log_tail: cli.log_tail,
            log_buffer: cli.log_buffer.max(1),
            show_all: cli.all,
            show_header: !cli.no_header,
            no_color: cli.no_color,
            log_file: cli.log_file.unwrap_or_else(default_log_file),
            log_filter: cli.log_filter,
        }
    }
}

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("berth.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_values_are_clamped() {
        let cli = Cli::try_parse_from(["berth", "--debounce-ms", "0", "--log-buffer", "0", "-H", " "]).unwrap();
        let config = Config::from(cli);
        assert_eq!(config.debounce, Duration::from_millis(10));
        assert_eq!(config.log_buffer, 1);
        assert!(config.host.is_none());
        assert!(config.show_header);
    }
}
