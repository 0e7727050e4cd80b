use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "packagetrack")]
#[command(about = "Identify carriers and track shipments by tracking number")]
pub struct CliConfig {
    /// Tracking numbers to look up
    #[arg(required = true)]
    pub tracking_numbers: Vec<String>,

    /// Carrier credentials file (TOML)
    #[arg(long, env = "PACKAGETRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print carrier and tracking URL only, without calling carrier APIs
    #[arg(long)]
    pub url_only: bool,

    /// Print tracking results as JSON
    #[arg(long)]
    pub json: bool,

    /// Probe ambiguous numbers against all candidate carriers at once
    #[arg(long)]
    pub concurrent_probes: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}
