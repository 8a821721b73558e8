//! On-disk ledger snapshots and signing keys.

use anyhow::{Context, Result, bail};
use datadao_core::{Keypair, Ledger, Snapshot};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Directory holding `path`, `.` for a bare file name.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))
}

/// Lock file guarding writers of the ledger at `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Run `f` while holding the exclusive writer lock for the ledger at `path`.
///
/// Every read-modify-write of the ledger file goes through here so that
/// concurrent `datadao` processes apply their calls one after another.
pub fn with_ledger_lock<T>(path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    ensure_parent(path)?;
    let lock_file = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_file)
        .with_context(|| format!("opening {}", lock_file.display()))?;

    let mut lock = fd_lock::RwLock::new(file);
    let _guard = lock
        .write()
        .with_context(|| format!("locking {}", lock_file.display()))?;
    debug!(path = %lock_file.display(), "ledger lock acquired");
    f()
}

/// Load and replay the ledger stored at `path`.
pub fn load_ledger(path: &Path) -> Result<Ledger> {
    let file = File::open(path).with_context(|| {
        format!(
            "no ledger at {} (run `datadao deploy` first)",
            path.display()
        )
    })?;
    let snapshot = Snapshot::read_from(BufReader::new(file))
        .with_context(|| format!("reading ledger {}", path.display()))?;
    let ledger = snapshot
        .restore()
        .with_context(|| format!("replaying ledger {}", path.display()))?;
    debug!(path = %path.display(), calls = ledger.history().len(), "ledger loaded");
    Ok(ledger)
}

/// Write the ledger to `path`, replacing any previous file atomically.
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<()> {
    ensure_parent(path)?;
    let parent = parent_dir(path);
    let mut tmp = NamedTempFile::new_in(parent).with_context(|| format!("creating temp file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        Snapshot::capture(ledger).write_to(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing {}", path.display()))?;
    debug!(path = %path.display(), calls = ledger.history().len(), "ledger saved");
    Ok(())
}

pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let secret = fs::read_to_string(path).with_context(|| {
        format!("no key at {} (run `datadao key new` first)", path.display())
    })?;
    Ok(Keypair::from_secret_hex(&secret)?)
}

/// Store a secret key. Refuses to overwrite unless `force` is set.
pub fn save_keypair(path: &Path, keys: &Keypair, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("key already exists at {} (use --force to replace it)", path.display());
    }
    ensure_parent(path)?;
    fs::write(path, keys.secret_hex()).with_context(|| format!("writing {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
