//! The ledger: applies signed calls to the registry one at a time.
//!
//! The ledger is the execution substrate the registry relies on. It
//! authenticates callers, orders their calls by nonce, and keeps an
//! append-only history from which the registry can be rebuilt.

use crate::{Address, ApprovalRegistry, Call, DatasetId, DatasetProposal, Error, Event, Hash, Operation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Outcome of an applied call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub call_id: Hash,
    /// Position in the ledger history, starting at 0.
    pub sequence: u64,
    pub events: Vec<Event>,
    /// Registry state hash after the call.
    pub state_hash: Hash,
}

/// A call together with its receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applied {
    pub call: Call,
    pub receipt: Receipt,
}

/// Single-writer ledger over an [`ApprovalRegistry`].
#[derive(Clone, Debug)]
pub struct Ledger {
    registry: ApprovalRegistry,
    nonces: BTreeMap<Address, u64>,
    history: Vec<Applied>,
}

impl Ledger {
    /// Create a ledger with an empty registry owned by `owner`.
    pub fn deploy(owner: Address) -> Self {
        Self {
            registry: ApprovalRegistry::new(owner),
            nonces: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// Rebuild a ledger by reapplying `calls` in order.
    ///
    /// Replayed calls log at `debug` only.
    pub fn replay(owner: Address, calls: impl IntoIterator<Item = Call>) -> Result<Self, Error> {
        let mut ledger = Self::deploy(owner);
        for call in calls {
            ledger.apply(call)?;
        }
        debug!(%owner, calls = ledger.history.len(), "ledger replayed");
        Ok(ledger)
    }

    pub fn registry(&self) -> &ApprovalRegistry {
        &self.registry
    }

    pub fn owner(&self) -> &Address {
        self.registry.owner()
    }

    pub fn history(&self) -> &[Applied] {
        &self.history
    }

    pub fn state_hash(&self) -> Hash {
        self.registry.hash()
    }

    pub fn is_approved(&self, identifier: &DatasetId) -> bool {
        self.registry.is_approved(identifier)
    }

    pub fn proposal(&self, identifier: &DatasetId) -> Option<&DatasetProposal> {
        self.registry.proposal(identifier)
    }

    /// The nonce the next call from `caller` must carry.
    pub fn next_nonce(&self, caller: &Address) -> u64 {
        self.nonces.get(caller).copied().unwrap_or(0)
    }

    /// Authenticate and apply a call.
    ///
    /// On error nothing changes: registry, nonces and history are untouched.
    pub fn submit(&mut self, call: Call) -> Result<Receipt, Error> {
        let (caller, operation) = (call.caller, call.operation.clone());
        match self.apply(call) {
            Ok(receipt) => {
                for event in &receipt.events {
                    info!(?event, "registry event");
                }
                Ok(receipt)
            }
            Err(e) => {
                warn!(%caller, %operation, error = %e, "call rejected");
                Err(e)
            }
        }
    }

    fn apply(&mut self, call: Call) -> Result<Receipt, Error> {
        let events = self.execute(&call)?;

        *self.nonces.entry(call.caller).or_insert(0) += 1;

        let receipt = Receipt {
            call_id: call.id(),
            sequence: self.history.len() as u64,
            events,
            state_hash: self.registry.hash(),
        };

        debug!(
            sequence = receipt.sequence,
            call = %receipt.call_id,
            operation = %call.operation,
            "call applied"
        );

        self.history.push(Applied {
            call,
            receipt: receipt.clone(),
        });

        Ok(receipt)
    }

    fn execute(&mut self, call: &Call) -> Result<Vec<Event>, Error> {
        if !call.verify_signature() {
            return Err(Error::InvalidSignature(call.caller));
        }

        let expected = self.next_nonce(&call.caller);
        if call.nonce != expected {
            return Err(Error::NonceMismatch {
                expected,
                found: call.nonce,
            });
        }

        match &call.operation {
            Operation::ProposeDataset { identifier } => {
                Ok(vec![self.registry.propose_dataset(&call.caller, identifier)?])
            }
            Operation::ApproveDataset { identifier } => {
                Ok(self.registry.approve_dataset(&call.caller, identifier)?.into_iter().collect())
            }
        }
    }
}
