//! CBOR persistence for a ledger.
//!
//! A snapshot stores the owner, the applied calls and the state hash they
//! produced. Restoring replays every call through a fresh registry, so a
//! snapshot can never smuggle in state that the rules would not allow.

use crate::{Address, Call, Error, Hash, Ledger};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub owner: Address,
    pub calls: Vec<Call>,
    pub state_hash: Hash,
}

impl Snapshot {
    pub fn capture(ledger: &Ledger) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            owner: *ledger.owner(),
            calls: ledger.history().iter().map(|applied| applied.call.clone()).collect(),
            state_hash: ledger.state_hash(),
        }
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), Error> {
        ciborium::into_writer(self, writer)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, Error> {
        let snapshot: Snapshot = ciborium::from_reader(reader)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Rebuild the ledger and check it matches the recorded state.
    pub fn restore(self) -> Result<Ledger, Error> {
        let ledger = Ledger::replay(self.owner, self.calls)?;
        let found = ledger.state_hash();
        if found != self.state_hash {
            return Err(Error::SnapshotMismatch {
                expected: self.state_hash,
                found,
            });
        }
        Ok(ledger)
    }
}
