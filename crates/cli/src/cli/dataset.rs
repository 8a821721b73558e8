use crate::{AppConfig, DatasetMetadata, store};
use anyhow::{Context, Result};
use clap::Subcommand;
use datadao_core::{Address, ApprovalRegistry, DatasetId, ProposalState};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum DatasetCommands {
    /// Show the registry state of every CSV in the dataset directory
    Verify {
        /// Directory to scan instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List CSVs that are proposed but not yet approved
    Pending {
        /// Directory to scan instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// One dataset file checked against the registry.
#[derive(Clone, Debug)]
pub struct DatasetStatus {
    pub path: PathBuf,
    pub identifier: DatasetId,
    pub state: ProposalState,
    pub proposer: Option<Address>,
    pub metadata: Option<DatasetMetadata>,
}

impl DatasetStatus {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub struct DatasetHandler {
    config: AppConfig,
}

impl DatasetHandler {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn handle(&self, command: &DatasetCommands) -> Result<()> {
        match command {
            DatasetCommands::Verify { dir } => {
                let dir = dir.as_deref().unwrap_or(self.config.datasets.dataset_dir.as_path());
                println!("{:<24} {:<64} {:<8} PROPOSER", "FILE", "CID", "APPROVED");
                for status in self.verify(dir)? {
                    let proposer = status
                        .proposer
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "N/A".to_string());
                    println!(
                        "{:<24} {:<64} {:<8} {}",
                        status.file_name(),
                        status.identifier,
                        status.state == ProposalState::Approved,
                        proposer
                    );
                }
                Ok(())
            }
            DatasetCommands::Pending { dir } => {
                let dir = dir.as_deref().unwrap_or(self.config.datasets.dataset_dir.as_path());
                println!("{:<24} {:<16} {:<16} CID", "FILE", "AUTHOR", "TASK");
                for status in self.pending(dir)? {
                    let (author, task) = status
                        .metadata
                        .as_ref()
                        .map(|m| (m.author.as_str(), m.task.as_str()))
                        .unwrap_or(("-", "-"));
                    println!(
                        "{:<24} {:<16} {:<16} {}",
                        status.file_name(),
                        author,
                        task,
                        status.identifier
                    );
                }
                Ok(())
            }
        }
    }

    /// Hash every CSV in `dir` and look it up in the registry.
    pub fn verify(&self, dir: &Path) -> Result<Vec<DatasetStatus>> {
        let ledger = store::load_ledger(&self.config.ledger.ledger_path)?;
        scan(dir, ledger.registry())
    }

    /// Datasets awaiting the owner's approval.
    pub fn pending(&self, dir: &Path) -> Result<Vec<DatasetStatus>> {
        let ledger = store::load_ledger(&self.config.ledger.ledger_path)?;
        let registry = ledger.registry();
        let waiting: BTreeSet<&DatasetId> = registry.pending().map(|p| &p.identifier).collect();

        Ok(scan(dir, registry)?
            .into_iter()
            .filter(|s| waiting.contains(&s.identifier))
            .collect())
    }
}

fn scan(dir: &Path, registry: &ApprovalRegistry) -> Result<Vec<DatasetStatus>> {
    csv_files(dir)?
        .into_iter()
        .map(|path| -> Result<DatasetStatus> {
            let contents = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let identifier = DatasetId::digest(&contents);
            let metadata = DatasetMetadata::load(&path)?;
            Ok(DatasetStatus {
                state: registry.state(&identifier),
                proposer: registry.proposal(&identifier).map(|p| p.proposer),
                path,
                identifier,
                metadata,
            })
        })
        .collect()
}

/// CSV files directly inside `dir`, sorted by name.
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
