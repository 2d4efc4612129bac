pub mod toml_config;

pub use toml_config::GuestBookConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "buku-tamu")]
#[command(about = "Wedding guest book: check invitations, collect wishes, list responses")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Guest list URL (JSON array of records)
    #[arg(long, global = true)]
    pub list_url: Option<String>,

    /// Directory holding the guest book data
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Seconds to wait for the guest list before giving up
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive guest form (Form Tamu)
    Guest,
    /// Check a single name against the invitation list
    Check { name: String },
    /// List every response (Admin Panel)
    Admin {
        /// Print CSV instead of a table
        #[arg(long)]
        csv: bool,
        /// Admin token, required when admin.token is configured
        #[arg(long)]
        token: Option<String>,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Defaults, then the config file, then command line flags.
    pub fn resolve(&self) -> Result<GuestBookConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::debug!("Loading configuration from: {}", path);
                GuestBookConfig::from_file(path)?
            }
            None => GuestBookConfig::default(),
        };

        if let Some(url) = &self.list_url {
            config.source.endpoint = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.store.data_dir = dir.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.source.timeout_seconds = secs;
        }

        Ok(config)
    }
}
