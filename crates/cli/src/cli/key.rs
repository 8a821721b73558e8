use crate::{AppConfig, store};
use anyhow::Result;
use clap::Subcommand;
use datadao_core::Keypair;
use tracing::info;

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Generate a new signing key
    New {
        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },
    /// Print the address of the current key
    Show,
}

pub struct KeyHandler {
    config: AppConfig,
}

impl KeyHandler {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn handle(&self, command: &KeyCommands) -> Result<()> {
        let keys = match command {
            KeyCommands::New { force } => self.generate(*force)?,
            KeyCommands::Show => store::load_keypair(&self.config.keys.key_path)?,
        };
        println!("{}", keys.address());
        Ok(())
    }

    pub fn generate(&self, force: bool) -> Result<Keypair> {
        let keys = Keypair::generate();
        store::save_keypair(&self.config.keys.key_path, &keys, force)?;
        info!(
            address = %keys.address(),
            path = %self.config.keys.key_path.display(),
            "generated signing key"
        );
        Ok(keys)
    }
}
