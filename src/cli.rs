use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "berth",
    version,
    about = "An interactive terminal dashboard for Docker and Docker Swarm."
)]
pub struct Cli {
    /// Daemon endpoint (unix://, tcp:// or http://)
    #[arg(short = 'H', long, env = "DOCKER_HOST")]
    pub host: Option<String>,

    /// Window over which daemon events are merged into one refresh
    #[arg(long, default_value_t = 250)]
    pub debounce_ms: u64,

    /// How often the monitor view re-lists running containers
    #[arg(long, default_value_t = 2_000)]
    pub monitor_interval_ms: u64,

    /// Lifetime of transient status messages
    #[arg(long, default_value_t = 5_000)]
    pub status_ttl_ms: u64,

    /// Lines of history requested when opening logs
    #[arg(long, default_value_t = 200)]
    pub log_tail: usize,

    /// Maximum number of lines a pager keeps
    #[arg(long, default_value_t = 10_000)]
    pub log_buffer: usize,

    /// Show stopped containers too
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Start with the daemon header hidden
    #[arg(long)]
    pub no_header: bool,

    /// Disable colours
    #[arg(long)]
    pub no_color: bool,

    /// Where diagnostics are written (defaults to berth.log in the temp dir)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// tracing filter (for example: info,berth=debug)
    #[arg(long)]
    pub log_filter: Option<String>,
}
