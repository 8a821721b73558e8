use crate::{AppConfig, config::expand_home_in_path};
use dataset::DatasetCommands;
use key::KeyCommands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use confique::Config;
use std::path::PathBuf;

// Re-export PartialAppConfig for public usage
pub use crate::config::confique_app_config_layer::AppConfigLayer as PartialAppConfig;

mod dataset;
mod key;
mod registry;

pub use dataset::{DatasetHandler, DatasetStatus};
pub use key::KeyHandler;
pub use registry::{ProposeArgs, Proposed, RegistryHandler};

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[command(name = "datadao")]
#[command(about = "Propose and approve content-addressed datasets")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "$HOME/.datadao/config.toml")]
    config_path: PathBuf,

    /// Configuration object
    #[command(flatten)]
    config: PartialAppConfig,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Internal helper struct that holds the resolved configuration
pub struct ResolvedCli {
    command: Commands,
    config: AppConfig,
    config_path: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Signing key management
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Create a new registry owned by the current key
    Deploy {
        /// Replace an existing ledger
        #[arg(long)]
        force: bool,
    },
    /// Propose a dataset file or raw identifier
    Propose(ProposeArgs),
    /// Approve a proposed dataset (owner only)
    Approve {
        /// Dataset identifier
        cid: String,
    },
    /// Show the state of a dataset identifier
    Status {
        /// Dataset identifier
        cid: String,
    },
    /// List applied calls
    History,
    /// Inspect the dataset directory against the registry
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
    /// Write the resolved configuration to the config file
    InitConfig,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let log_level = if self.verbose { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(format!("datadao={},{}", log_level, log_level))
            .with_writer(std::io::stderr)
            .init();

        let resolved_cli = self.resolve_config()?;
        resolved_cli.handle_command()
    }

    /// Load the configuration and resolve all $HOME placeholders
    fn resolve_config(self) -> Result<ResolvedCli> {
        let config_path = expand_home_in_path(&self.config_path)?;

        let config = AppConfig::builder()
            .preloaded(self.config)
            .env()
            .file(&config_path)
            .load()?
            .with_resolved_paths()?;

        Ok(ResolvedCli {
            command: self.command,
            config,
            config_path,
        })
    }
}

impl ResolvedCli {
    fn handle_command(&self) -> Result<()> {
        match &self.command {
            Commands::Key { command } => KeyHandler::new(self.config.clone()).handle(command),
            Commands::Deploy { force } => {
                let ledger = RegistryHandler::new(self.config.clone()).deploy(*force)?;
                println!("owner:      {}", ledger.owner());
                println!("state hash: {}", ledger.state_hash());
                println!("ledger:     {}", self.config.ledger.ledger_path.display());
                Ok(())
            }
            Commands::Propose(args) => {
                let handler = RegistryHandler::new(self.config.clone());
                let proposed = handler.propose(args)?;
                println!("proposed {}", proposed.identifier);
                if let Some(path) = proposed.metadata_path {
                    println!("metadata saved to {}", path.display());
                }
                println!("call {} (sequence {})", proposed.receipt.call_id, proposed.receipt.sequence);
                Ok(())
            }
            Commands::Approve { cid } => {
                let receipt = RegistryHandler::new(self.config.clone()).approve(cid)?;
                if receipt.events.is_empty() {
                    println!("{cid} was already approved");
                } else {
                    println!("approved {cid}");
                }
                println!("call {} (sequence {})", receipt.call_id, receipt.sequence);
                Ok(())
            }
            Commands::Status { cid } => {
                let (state, proposal) = RegistryHandler::new(self.config.clone()).status(cid)?;
                println!("{cid}: {state}");
                if let Some(proposal) = proposal {
                    println!("proposer: {}", proposal.proposer);
                }
                Ok(())
            }
            Commands::History => {
                for applied in RegistryHandler::new(self.config.clone()).history()? {
                    let when = chrono::DateTime::from_timestamp_millis(applied.call.timestamp as i64)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:>4}  {}  {}  {}",
                        applied.receipt.sequence, when, applied.call.caller, applied.call.operation
                    );
                }
                Ok(())
            }
            Commands::Dataset { command } => DatasetHandler::new(self.config.clone()).handle(command),
            Commands::InitConfig => {
                self.config.save(&self.config_path)?;
                println!("configuration written to {}", self.config_path.display());
                Ok(())
            }
        }
    }
}
