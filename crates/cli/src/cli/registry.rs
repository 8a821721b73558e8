use crate::{AppConfig, DatasetMetadata, store};
use anyhow::{Context, Result, bail};
use clap::Args;
use datadao_core::{Applied, Call, DatasetId, DatasetProposal, Ledger, Operation, ProposalState, Receipt};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Clone, Debug, Default)]
pub struct ProposeArgs {
    /// Dataset file; its SHA-256 becomes the identifier
    #[arg(required_unless_present = "cid")]
    pub file: Option<PathBuf>,

    /// Propose a raw identifier instead of a file
    #[arg(long, conflicts_with = "file")]
    pub cid: Option<String>,

    /// Dataset author (required with a file)
    #[arg(long)]
    pub author: Option<String>,

    /// Task the dataset is meant for (required with a file)
    #[arg(long)]
    pub task: Option<String>,

    /// Dataset license, defaults to the configured license
    #[arg(long)]
    pub license: Option<String>,

    /// Free-form description
    #[arg(long, default_value = "")]
    pub description: String,
}

/// Result of a successful proposal.
#[derive(Debug)]
pub struct Proposed {
    pub identifier: DatasetId,
    pub receipt: Receipt,
    pub metadata_path: Option<PathBuf>,
}

pub struct RegistryHandler {
    config: AppConfig,
}

impl RegistryHandler {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Create a fresh ledger owned by the configured key.
    pub fn deploy(&self, force: bool) -> Result<Ledger> {
        let path = &self.config.ledger.ledger_path;
        let keys = store::load_keypair(&self.config.keys.key_path)?;
        store::with_ledger_lock(path, || {
            if path.exists() && !force {
                bail!("ledger already exists at {} (use --force to replace it)", path.display());
            }
            let ledger = Ledger::deploy(keys.address());
            store::save_ledger(path, &ledger)?;
            info!(owner = %keys.address(), path = %path.display(), "registry deployed");
            Ok(ledger)
        })
    }

    pub fn propose(&self, args: &ProposeArgs) -> Result<Proposed> {
        let Some(file) = &args.file else {
            let cid = args.cid.as_deref().unwrap_or_default();
            let identifier = DatasetId::new(cid)?;
            let receipt = self.submit(Operation::ProposeDataset {
                identifier: identifier.clone(),
            })?;
            return Ok(Proposed {
                identifier,
                receipt,
                metadata_path: None,
            });
        };

        let author = required(&args.author, "--author")?;
        let task = required(&args.task, "--task")?;
        let contents = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        let identifier = DatasetId::digest(&contents);

        let metadata = DatasetMetadata {
            author,
            task,
            license: args
                .license
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| self.config.datasets.default_license.clone()),
            description: args.description.trim().to_string(),
            sha256: identifier.to_string(),
        };

        // Sidecar first; a rejected call restores whatever was there before.
        let metadata_path = DatasetMetadata::sidecar_path(file);
        let previous = std::fs::read(&metadata_path).ok();
        metadata.save(file)?;

        let receipt = match self.submit(Operation::ProposeDataset {
            identifier: identifier.clone(),
        }) {
            Ok(receipt) => receipt,
            Err(e) => {
                let restored = match &previous {
                    Some(bytes) => std::fs::write(&metadata_path, bytes),
                    None => std::fs::remove_file(&metadata_path),
                };
                if let Err(restore_err) = restored {
                    warn!(path = %metadata_path.display(), error = %restore_err, "could not roll back metadata sidecar");
                }
                return Err(e);
            }
        };

        Ok(Proposed {
            identifier,
            receipt,
            metadata_path: Some(metadata_path),
        })
    }

    pub fn approve(&self, cid: &str) -> Result<Receipt> {
        let identifier = DatasetId::new(cid)?;
        self.submit(Operation::ApproveDataset { identifier })
    }

    pub fn status(&self, cid: &str) -> Result<(ProposalState, Option<DatasetProposal>)> {
        let identifier = DatasetId::new(cid)?;
        let ledger = store::load_ledger(&self.config.ledger.ledger_path)?;
        let registry = ledger.registry();
        Ok((registry.state(&identifier), registry.proposal(&identifier).cloned()))
    }

    pub fn history(&self) -> Result<Vec<Applied>> {
        let ledger = store::load_ledger(&self.config.ledger.ledger_path)?;
        Ok(ledger.history().to_vec())
    }

    /// Sign `operation` with the configured key, apply it and persist.
    ///
    /// Load, submit and save run under the ledger lock as one unit.
    fn submit(&self, operation: Operation) -> Result<Receipt> {
        let path = &self.config.ledger.ledger_path;
        let keys = store::load_keypair(&self.config.keys.key_path)?;

        store::with_ledger_lock(path, || {
            let mut ledger = store::load_ledger(path)?;
            let nonce = ledger.next_nonce(&keys.address());
            let receipt = ledger
                .submit(Call::new(&keys, nonce, operation))
                .context("registry rejected the call")?;
            store::save_ledger(path, &ledger)?;
            Ok(receipt)
        })
    }
}

fn required(value: &Option<String>, flag: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => bail!("{flag} is required when proposing a file"),
    }
}
