//! Signed calls against the registry.
//!
//! A call is what a caller submits to the ledger:
//! ```text
//! Call {
//!   caller    : Address     // Who is calling
//!   nonce     : u64         // Caller's sequence number
//!   operation : Operation   // What to do
//!   timestamp : u64         // When signed, unix millis
//!   signature : Bytes       // ed25519 over the fields above
//! }
//! ```

use crate::{Address, DatasetId, Hash, Keypair};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A state-changing registry operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    ProposeDataset { identifier: DatasetId },
    ApproveDataset { identifier: DatasetId },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ProposeDataset { identifier } => write!(f, "proposeDataset({identifier})"),
            Operation::ApproveDataset { identifier } => write!(f, "approveDataset({identifier})"),
        }
    }
}

/// A signed call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub caller: Address,
    pub nonce: u64,
    pub operation: Operation,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Ed25519 signature over the signable content.
    pub signature: Vec<u8>,
}

impl Call {
    /// Build and sign a call from `keys`.
    pub fn new(keys: &Keypair, nonce: u64, operation: Operation) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut call = Self {
            caller: keys.address(),
            nonce,
            operation,
            timestamp,
            signature: Vec::new(),
        };
        call.signature = keys.sign(&call.signable_content());
        call
    }

    pub fn propose(keys: &Keypair, nonce: u64, identifier: DatasetId) -> Self {
        Self::new(keys, nonce, Operation::ProposeDataset { identifier })
    }

    pub fn approve(keys: &Keypair, nonce: u64, identifier: DatasetId) -> Self {
        Self::new(keys, nonce, Operation::ApproveDataset { identifier })
    }

    /// Content covered by the signature (everything but the signature).
    fn signable_content(&self) -> Vec<u8> {
        crate::cbor(&SignableCall {
            caller: &self.caller,
            nonce: self.nonce,
            operation: &self.operation,
            timestamp: self.timestamp,
        })
    }

    /// Content hash of this call.
    pub fn id(&self) -> Hash {
        Hash::of(&self.signable_content())
    }

    /// Check the signature against the claimed caller.
    pub fn verify_signature(&self) -> bool {
        self.caller.verify(&self.signable_content(), &self.signature)
    }
}

#[derive(Serialize)]
struct SignableCall<'a> {
    caller: &'a Address,
    nonce: u64,
    operation: &'a Operation,
    timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid() -> DatasetId {
        DatasetId::new("cid").unwrap()
    }

    #[test]
    fn call_signature_valid() {
        let keys = Keypair::generate();
        let call = Call::propose(&keys, 0, cid());
        assert!(call.verify_signature());
        assert_eq!(call.caller, keys.address());
    }

    #[test]
    fn spoofed_caller_rejected() {
        let keys = Keypair::generate();
        let victim = Keypair::generate();
        let mut call = Call::approve(&keys, 0, cid());
        call.caller = victim.address();
        assert!(!call.verify_signature());
    }

    #[test]
    fn tampered_operation_rejected() {
        let keys = Keypair::generate();
        let mut call = Call::propose(&keys, 0, cid());
        call.operation = Operation::ApproveDataset { identifier: cid() };
        assert!(!call.verify_signature());

        let mut call = Call::propose(&keys, 0, cid());
        call.nonce = 1;
        assert!(!call.verify_signature());
    }

    #[test]
    fn id_ignores_signature() {
        let keys = Keypair::generate();
        let call = Call::propose(&keys, 3, cid());
        let mut resigned = call.clone();
        resigned.signature[0] ^= 0xFF;
        assert_eq!(call.id(), resigned.id());
        assert!(!resigned.verify_signature());
    }
}
