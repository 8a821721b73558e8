use anyhow::Result;
use clap::Args;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Utility function to expand $HOME in a PathBuf
pub fn expand_home_in_path(path: &Path) -> Result<PathBuf> {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in path"))?;

    if path_str.contains("$HOME") {
        let expanded = path_str.replace("$HOME", home_dir.to_str().unwrap_or("."));
        Ok(PathBuf::from(expanded))
    } else {
        Ok(path.to_path_buf())
    }
}

#[derive(Config, Clone, Debug, Default, Serialize, Deserialize)]
#[config(layer_attr(derive(Args, Serialize, Clone)))]
pub struct AppConfig {
    #[config(nested, layer_attr(command(flatten)))]
    pub ledger: LedgerConfig,

    #[config(nested, layer_attr(command(flatten)))]
    pub keys: KeyConfig,

    #[config(nested, layer_attr(command(flatten)))]
    pub datasets: DatasetConfig,
}

#[derive(Clone, Config, Debug, Deserialize, Serialize, Default)]
#[config(layer_attr(derive(Args, Clone, Serialize,)))]
pub struct LedgerConfig {
    /// The ledger snapshot file
    #[config(
        env = "DATADAO_LEDGER",
        default = "$HOME/.datadao/ledger.cbor",
        layer_attr(arg(long))
    )]
    pub ledger_path: PathBuf,
}

#[derive(Clone, Config, Debug, Deserialize, Serialize, Default)]
#[config(layer_attr(derive(Args, Clone, Serialize,)))]
pub struct KeyConfig {
    /// The secret key used to sign calls
    #[config(
        env = "DATADAO_KEY",
        default = "$HOME/.datadao/key.hex",
        layer_attr(arg(long))
    )]
    pub key_path: PathBuf,
}

#[derive(Clone, Config, Debug, Deserialize, Serialize, Default)]
#[config(layer_attr(derive(Args, Clone, Serialize,)))]
pub struct DatasetConfig {
    /// Directory scanned for CSV datasets
    #[config(default = "./dataset", layer_attr(arg(long)))]
    pub dataset_dir: PathBuf,

    /// License recorded when a proposal does not name one
    #[config(default = "CC-BY 4.0", layer_attr(arg(long)))]
    pub default_license: String,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve all $HOME placeholders in configuration paths
    pub fn with_resolved_paths(mut self) -> Result<Self> {
        self.ledger.ledger_path = expand_home_in_path(&self.ledger.ledger_path)?;
        self.keys.key_path = expand_home_in_path(&self.keys.key_path)?;
        self.datasets.dataset_dir = expand_home_in_path(&self.datasets.dataset_dir)?;
        Ok(self)
    }
}
