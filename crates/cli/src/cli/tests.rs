use super::{DatasetHandler, KeyHandler, ProposeArgs, RegistryHandler, ResolvedCli};
use crate::{AppConfig, DatasetMetadata, config::confique_app_config_layer::AppConfigLayer as PartialAppConfig};
use confique::{Config, Layer};
use datadao_core::{DatasetId, Error, ProposalState};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const SAMPLE_CID: &str = "a9682d2d2f0c3760cf3bfda81421a4babb37f8def6b89029aa09fc5c93fabad3";

/// Test helper that builds a config rooted in `temp_path`, signing with `key`.
fn test_config(temp_path: &Path, key: &str) -> AppConfig {
    let mut partial_config = PartialAppConfig::default_values();
    partial_config.ledger.ledger_path = Some(temp_path.join("ledger.cbor"));
    partial_config.keys.key_path = Some(temp_path.join(key));
    partial_config.datasets.dataset_dir = Some(temp_path.join("dataset"));

    AppConfig::builder()
        .preloaded(partial_config)
        .load()
        .expect("Failed to load test config")
        .with_resolved_paths()
        .expect("Failed to resolve paths in test config")
}

/// Owner and user configs sharing one ledger, with the owner's registry deployed.
fn deployed(temp_path: &Path) -> (AppConfig, AppConfig) {
    let owner = test_config(temp_path, "owner.hex");
    let user = test_config(temp_path, "user.hex");
    KeyHandler::new(owner.clone()).generate(false).unwrap();
    KeyHandler::new(user.clone()).generate(false).unwrap();
    RegistryHandler::new(owner.clone()).deploy(false).unwrap();
    (owner, user)
}

fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn raw_cid(cid: &str) -> ProposeArgs {
    ProposeArgs {
        cid: Some(cid.to_string()),
        ..Default::default()
    }
}

fn file_args(file: &Path, author: &str) -> ProposeArgs {
    ProposeArgs {
        file: Some(file.to_path_buf()),
        author: Some(author.to_string()),
        task: Some("classification".into()),
        ..Default::default()
    }
}

fn core_error(err: &anyhow::Error) -> Option<&Error> {
    err.downcast_ref::<Error>()
}

#[test]
fn test_propose_and_approve_flow() {
    let temp_dir = tempdir().unwrap();
    let (owner, user) = deployed(temp_dir.path());

    RegistryHandler::new(user.clone()).propose(&raw_cid(SAMPLE_CID)).unwrap();
    let (state, proposal) = RegistryHandler::new(user.clone()).status(SAMPLE_CID).unwrap();
    assert_eq!(state, ProposalState::Proposed);
    assert!(!proposal.unwrap().approved);

    let receipt = RegistryHandler::new(owner.clone()).approve(SAMPLE_CID).unwrap();
    assert_eq!(receipt.events.len(), 1);

    let (state, _) = RegistryHandler::new(user).status(SAMPLE_CID).unwrap();
    assert_eq!(state, ProposalState::Approved);
}

#[test]
fn test_non_owner_cannot_approve() {
    let temp_dir = tempdir().unwrap();
    let (_, user) = deployed(temp_dir.path());
    let handler = RegistryHandler::new(user);

    handler.propose(&raw_cid(SAMPLE_CID)).unwrap();
    let err = handler.approve(SAMPLE_CID).unwrap_err();

    assert!(matches!(core_error(&err), Some(Error::Unauthorized { .. })));
    assert_eq!(handler.status(SAMPLE_CID).unwrap().0, ProposalState::Proposed);
}

#[test]
fn test_duplicate_proposal_is_reported() {
    let temp_dir = tempdir().unwrap();
    let (owner, user) = deployed(temp_dir.path());

    RegistryHandler::new(user).propose(&raw_cid(SAMPLE_CID)).unwrap();
    let err = RegistryHandler::new(owner).propose(&raw_cid(SAMPLE_CID)).unwrap_err();

    assert_eq!(
        core_error(&err),
        Some(&Error::DuplicateProposal(DatasetId::new(SAMPLE_CID).unwrap()))
    );
}

#[test]
fn test_unknown_dataset_status() {
    let temp_dir = tempdir().unwrap();
    let (owner, _) = deployed(temp_dir.path());
    let handler = RegistryHandler::new(owner);

    let (state, proposal) = handler.status("never-proposed").unwrap();
    assert_eq!(state, ProposalState::Unproposed);
    assert!(proposal.is_none());

    let err = handler.approve("never-proposed").unwrap_err();
    assert!(matches!(core_error(&err), Some(Error::UnknownDataset(_))));
}

#[test]
fn test_propose_file_writes_metadata() {
    let temp_dir = tempdir().unwrap();
    let (_, user) = deployed(temp_dir.path());
    let csv = write_csv(&user.datasets.dataset_dir, "iris.csv", "a,b\n1,2\n");

    let proposed = RegistryHandler::new(user)
        .propose(&ProposeArgs {
            file: Some(csv.clone()),
            author: Some("ada".into()),
            task: Some("classification".into()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(proposed.identifier, DatasetId::digest(b"a,b\n1,2\n"));
    let metadata = DatasetMetadata::load(&csv).unwrap().unwrap();
    assert_eq!(metadata.author, "ada");
    assert_eq!(metadata.license, "CC-BY 4.0");
    assert_eq!(metadata.sha256, proposed.identifier.as_str());
}

#[test]
fn test_propose_file_requires_author_and_task() {
    let temp_dir = tempdir().unwrap();
    let (_, user) = deployed(temp_dir.path());
    let csv = write_csv(&user.datasets.dataset_dir, "iris.csv", "a,b\n");
    let handler = RegistryHandler::new(user);

    let err = handler
        .propose(&ProposeArgs {
            file: Some(csv.clone()),
            task: Some("t".into()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.to_string().contains("--author"));

    // Nothing was submitted
    assert!(handler.history().unwrap().is_empty());
    assert!(DatasetMetadata::load(&csv).unwrap().is_none());
}

#[test]
fn test_failed_sidecar_write_submits_nothing() {
    let temp_dir = tempdir().unwrap();
    let (_, user) = deployed(temp_dir.path());
    let csv = write_csv(&user.datasets.dataset_dir, "iris.csv", "a,b\n1,2\n");
    let sidecar = DatasetMetadata::sidecar_path(&csv);
    std::fs::create_dir(&sidecar).unwrap();
    let handler = RegistryHandler::new(user);

    let err = handler.propose(&file_args(&csv, "ada")).unwrap_err();
    assert!(err.to_string().contains("iris_metadata.json"));
    assert!(handler.history().unwrap().is_empty());

    // Once the sidecar can be written the proposal goes through
    std::fs::remove_dir(&sidecar).unwrap();
    handler.propose(&file_args(&csv, "ada")).unwrap();
    assert_eq!(handler.history().unwrap().len(), 1);
}

#[test]
fn test_rejected_proposal_restores_sidecar() {
    let temp_dir = tempdir().unwrap();
    let (owner, user) = deployed(temp_dir.path());
    let dir = user.datasets.dataset_dir.clone();

    let iris = write_csv(&dir, "iris.csv", "a,b\n1,2\n");
    RegistryHandler::new(user.clone()).propose(&file_args(&iris, "ada")).unwrap();
    let err = RegistryHandler::new(owner.clone())
        .propose(&file_args(&iris, "eve"))
        .unwrap_err();
    assert!(matches!(core_error(&err), Some(Error::DuplicateProposal(_))));
    assert_eq!(DatasetMetadata::load(&iris).unwrap().unwrap().author, "ada");

    // Same contents proposed by raw identifier first: no sidecar is left behind
    let wine = write_csv(&dir, "wine.csv", "x,y\n");
    let cid = DatasetId::digest(b"x,y\n");
    RegistryHandler::new(user).propose(&raw_cid(cid.as_str())).unwrap();
    assert!(RegistryHandler::new(owner).propose(&file_args(&wine, "eve")).is_err());
    assert!(!DatasetMetadata::sidecar_path(&wine).exists());
}

#[test]
fn test_concurrent_writers_keep_every_call() {
    let temp_dir = tempdir().unwrap();
    let (owner, user) = deployed(temp_dir.path());

    let handles: Vec<_> = [("owner", owner), ("user", user)]
        .into_iter()
        .map(|(who, config)| {
            std::thread::spawn(move || {
                let handler = RegistryHandler::new(config);
                for n in 0..20 {
                    handler.propose(&raw_cid(&format!("{who}-{n}"))).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let history = RegistryHandler::new(test_config(temp_dir.path(), "user.hex"))
        .history()
        .unwrap();
    assert_eq!(history.len(), 40);
    let sequences: Vec<u64> = history.iter().map(|a| a.receipt.sequence).collect();
    assert_eq!(sequences, (0..40).collect::<Vec<_>>());
}

#[test]
fn test_verify_and_pending() {
    let temp_dir = tempdir().unwrap();
    let (owner, user) = deployed(temp_dir.path());
    let dir = user.datasets.dataset_dir.clone();
    let approved = write_csv(&dir, "a.csv", "approved\n");
    let waiting = write_csv(&dir, "b.csv", "waiting\n");
    write_csv(&dir, "c.csv", "unproposed\n");
    write_csv(&dir, "notes.txt", "ignored\n");

    let registry = RegistryHandler::new(user.clone());
    for file in [&approved, &waiting] {
        registry
            .propose(&ProposeArgs {
                file: Some(file.clone()),
                author: Some("ada".into()),
                task: Some("qa".into()),
                ..Default::default()
            })
            .unwrap();
    }
    RegistryHandler::new(owner)
        .approve(DatasetId::digest(b"approved\n").as_str())
        .unwrap();

    let handler = DatasetHandler::new(user.clone());
    let statuses = handler.verify(&dir).unwrap();
    let summary: Vec<_> = statuses.iter().map(|s| (s.file_name(), s.state)).collect();
    assert_eq!(
        summary,
        vec![
            ("a.csv".to_string(), ProposalState::Approved),
            ("b.csv".to_string(), ProposalState::Proposed),
            ("c.csv".to_string(), ProposalState::Unproposed),
        ]
    );
    assert!(statuses[2].proposer.is_none());

    let pending = handler.pending(&dir).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_name(), "b.csv");
    assert_eq!(pending[0].metadata.as_ref().unwrap().task, "qa");
}

#[test]
fn test_deploy_refuses_overwrite() {
    let temp_dir = tempdir().unwrap();
    let (owner, _) = deployed(temp_dir.path());
    let handler = RegistryHandler::new(owner);

    assert!(handler.deploy(false).is_err());
    handler.propose(&raw_cid(SAMPLE_CID)).unwrap();
    let fresh = handler.deploy(true).unwrap();
    assert!(fresh.registry().is_empty());
}

#[test]
fn test_history_lists_calls_in_order() {
    let temp_dir = tempdir().unwrap();
    let (owner, user) = deployed(temp_dir.path());

    RegistryHandler::new(user.clone()).propose(&raw_cid("one")).unwrap();
    RegistryHandler::new(user.clone()).propose(&raw_cid("two")).unwrap();
    RegistryHandler::new(owner).approve("one").unwrap();

    let history = RegistryHandler::new(user).history().unwrap();
    let sequences: Vec<u64> = history.iter().map(|a| a.receipt.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2]);
    assert_eq!(history[1].call.nonce, 1);
}

#[test]
fn test_init_config_writes_file() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path(), "key.hex");
    let config_path = temp_dir.path().join("config.toml");

    let cli = ResolvedCli {
        command: super::Commands::InitConfig,
        config: config.clone(),
        config_path: config_path.clone(),
    };
    cli.handle_command().unwrap();

    let loaded = AppConfig::load(&config_path).unwrap();
    assert_eq!(loaded.ledger.ledger_path, config.ledger.ledger_path);
}

#[test]
fn test_cli_definition_is_valid() {
    use clap::CommandFactory;
    super::Cli::command().debug_assert();
}

#[test]
fn test_parse_config_flags_before_subcommand() {
    use clap::Parser;
    let cli = super::Cli::try_parse_from([
        "datadao",
        "--ledger-path",
        "/tmp/ledger.cbor",
        "propose",
        "--cid",
        SAMPLE_CID,
    ])
    .unwrap();

    assert_eq!(cli.config.ledger.ledger_path, Some(PathBuf::from("/tmp/ledger.cbor")));
    assert!(matches!(
        cli.command,
        super::Commands::Propose(ref args) if args.cid.as_deref() == Some(SAMPLE_CID)
    ));
}

#[test]
fn test_parse_nested_subcommands() {
    use clap::Parser;
    let cli = super::Cli::try_parse_from(["datadao", "key", "new", "--force"]).unwrap();
    assert!(matches!(
        cli.command,
        super::Commands::Key {
            command: super::KeyCommands::New { force: true }
        }
    ));

    let cli = super::Cli::try_parse_from(["datadao", "dataset", "pending", "--dir", "/data"]).unwrap();
    assert!(matches!(
        cli.command,
        super::Commands::Dataset {
            command: super::DatasetCommands::Pending { dir: Some(ref d) }
        } if d == Path::new("/data")
    ));
}
