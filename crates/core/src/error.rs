//! Error types for datadao-core.

use thiserror::Error;

use crate::{Address, DatasetId, Hash};

/// Core errors.
///
/// Every variant is a synchronous rejection: the call that produced it left
/// the registry and ledger untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Caller is not the registry owner.
    #[error("caller {caller} is not the registry owner")]
    Unauthorized { caller: Address },

    /// No proposal exists for the identifier.
    #[error("unknown dataset: {0}")]
    UnknownDataset(DatasetId),

    /// A proposal already exists for the identifier.
    #[error("dataset already proposed: {0}")]
    DuplicateProposal(DatasetId),

    /// Identifiers must be non-empty.
    #[error("dataset identifier must not be empty")]
    EmptyIdentifier,

    /// Invalid signature.
    #[error("invalid signature for caller: {0}")]
    InvalidSignature(Address),

    /// Address is not a valid ed25519 public key.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Secret key file does not hold 32 hex-encoded bytes.
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// Call nonce does not match the caller's next nonce.
    #[error("nonce mismatch: expected {expected}, found {found}")]
    NonceMismatch { expected: u64, found: u64 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Replaying a snapshot produced a different state.
    #[error("snapshot state mismatch: recorded {expected}, replayed {found}")]
    SnapshotMismatch { expected: Hash, found: Hash },

    /// Snapshot format version is not understood.
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    /// A writer panicked while holding the ledger lock.
    #[error("ledger lock poisoned")]
    Poisoned,
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        Error::Serialization(e.to_string())
    }
}
