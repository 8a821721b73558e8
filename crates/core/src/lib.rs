//! datadao-core: approval registry for content-addressed datasets.
//!
//! - `ApprovalRegistry`: the proposal → approval state machine
//! - `Ledger`: applies signed `Call`s to the registry one at a time
//! - `SharedLedger`: lock-guarded handle for multi-threaded hosts
//! - `Snapshot`: CBOR persistence, restored by replay

mod call;
mod dataset;
mod error;
mod hash;
mod identity;
mod ledger;
mod registry;
mod shared;
mod snapshot;

pub use call::{Call, Operation};
pub use dataset::{DatasetId, DatasetProposal, ProposalState};
pub use error::Error;
pub use hash::Hash;
pub use identity::{Address, Keypair};
pub use ledger::{Applied, Ledger, Receipt};
pub use registry::{ApprovalRegistry, Event};
pub use shared::SharedLedger;
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};

/// CBOR-encode a value for hashing or signing.
pub(crate) fn cbor<T: serde::Serialize>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).expect("serialization should not fail");
    buf
}
