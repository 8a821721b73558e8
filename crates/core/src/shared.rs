//! Thread-safe handle to a ledger.
//!
//! Writers are serialized behind the lock; readers share it and only ever
//! see the state between two complete calls.

use crate::{Address, Call, DatasetId, DatasetProposal, Error, Hash, Ledger, Receipt};
use std::sync::{Arc, RwLock};

#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Apply a call while holding the write lock.
    pub fn submit(&self, call: Call) -> Result<Receipt, Error> {
        self.inner.write().map_err(|_| Error::Poisoned)?.submit(call)
    }

    pub fn is_approved(&self, identifier: &DatasetId) -> Result<bool, Error> {
        self.with_ledger(|ledger| ledger.is_approved(identifier))
    }

    pub fn proposal(&self, identifier: &DatasetId) -> Result<Option<DatasetProposal>, Error> {
        self.with_ledger(|ledger| ledger.proposal(identifier).cloned())
    }

    pub fn next_nonce(&self, caller: &Address) -> Result<u64, Error> {
        self.with_ledger(|ledger| ledger.next_nonce(caller))
    }

    pub fn state_hash(&self) -> Result<Hash, Error> {
        self.with_ledger(Ledger::state_hash)
    }

    /// Run `f` against a consistent view of the ledger.
    pub fn with_ledger<T>(&self, f: impl FnOnce(&Ledger) -> T) -> Result<T, Error> {
        let ledger = self.inner.read().map_err(|_| Error::Poisoned)?;
        Ok(f(&ledger))
    }

    /// Clone the current ledger state.
    pub fn snapshot(&self) -> Result<Ledger, Error> {
        self.with_ledger(Ledger::clone)
    }
}
