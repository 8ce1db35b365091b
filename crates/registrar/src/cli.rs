use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use registrar_core::RefreshConfig;

/// Registrar: keeps a chain registry's peer lists and light-client roots fresh.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Outbound RPC requests per second, across all nodes (unlimited if unset).
    #[arg(long, global = true, env = "REGISTRAR_RPC_RPS")]
    pub rpc_rps: Option<u32>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Crawl peers and record a new agreed light root for each chain.
    Update(UpdateArgs),
    /// Initialise a chain directory from a single trusted node.
    Seed(SeedArgs),
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Registry checkout holding one directory per chain.
    #[arg(long, env = "REGISTRAR_REGISTRY")]
    pub registry: PathBuf,

    /// Chain to refresh (repeatable).
    #[arg(long = "chain")]
    pub chains: Vec<String>,

    /// CODEOWNERS file used to select the chains maintained by `--owner`.
    #[arg(long, env = "REGISTRAR_CODEOWNERS", requires = "owner")]
    pub codeowners: Option<PathBuf>,

    /// Maintainer name as listed in CODEOWNERS.
    #[arg(long, env = "REGISTRAR_OWNER", requires = "codeowners")]
    pub owner: Option<String>,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args)]
pub struct SeedArgs {
    /// RPC address of the node to seed from, e.g. `http://1.2.3.4:26657`.
    pub rpc_url: String,

    /// Registry checkout holding one directory per chain.
    #[arg(long, env = "REGISTRAR_REGISTRY")]
    pub registry: PathBuf,

    /// Refuse the node unless it serves this chain.
    #[arg(long)]
    pub chain_id: Option<String>,
}

#[derive(Args)]
pub struct TuningArgs {
    /// Deadline for a known peer's `/net_info` answer, in milliseconds.
    #[arg(long, default_value = "5000", env = "REGISTRAR_CRAWL_TIMEOUT_MS")]
    pub crawl_timeout_ms: u64,

    /// Deadline for a single liveness probe, in milliseconds.
    #[arg(long, default_value = "1000", env = "REGISTRAR_PROBE_TIMEOUT_MS")]
    pub probe_timeout_ms: u64,

    /// Budget per candidate while resolving the settled height, in milliseconds.
    #[arg(long, default_value = "2000", env = "REGISTRAR_HEIGHT_TIMEOUT_MS")]
    pub height_timeout_ms: u64,

    /// Pause between retries against a catching-up node, in milliseconds.
    #[arg(long, default_value = "200", env = "REGISTRAR_CATCH_UP_BACKOFF_MS")]
    pub catch_up_backoff_ms: u64,

    /// Deadline for a single peer's `/commit` answer, in milliseconds.
    #[arg(long, default_value = "1000", env = "REGISTRAR_COMMIT_TIMEOUT_MS")]
    pub commit_timeout_ms: u64,

    /// Maximum concurrent RPC calls within one fan-out.
    #[arg(long, default_value = "64", env = "REGISTRAR_MAX_IN_FLIGHT")]
    pub max_in_flight: usize,
}

impl TuningArgs {
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            crawl_timeout: Duration::from_millis(self.crawl_timeout_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            height_timeout: Duration::from_millis(self.height_timeout_ms),
            catch_up_backoff: Duration::from_millis(self.catch_up_backoff_ms),
            commit_timeout: Duration::from_millis(self.commit_timeout_ms),
            max_in_flight: self.max_in_flight,
        }
    }
}
