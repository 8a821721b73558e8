//! The approval registry: one owner, one identifier → proposal map.
//!
//! Per identifier the registry moves through
//! ```text
//! Unproposed --propose--> Proposed --approve (owner)--> Approved
//! ```
//! `Approved` is terminal. Re-proposing an existing identifier is rejected
//! with [`Error::DuplicateProposal`]. Re-approving an approved identifier is
//! a no-op that emits no event.

use crate::{Address, DatasetId, DatasetProposal, Error, Hash, ProposalState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A notification emitted by a state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    DatasetProposed {
        identifier: DatasetId,
        proposer: Address,
    },
    DatasetApproved {
        identifier: DatasetId,
        approver: Address,
    },
}

/// The approval registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRegistry {
    owner: Address,
    proposals: BTreeMap<DatasetId, DatasetProposal>,
}

impl ApprovalRegistry {
    /// Create an empty registry owned by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            proposals: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Record a new proposal for `identifier` on behalf of `caller`.
    pub fn propose_dataset(&mut self, caller: &Address, identifier: &DatasetId) -> Result<Event, Error> {
        if self.proposals.contains_key(identifier) {
            return Err(Error::DuplicateProposal(identifier.clone()));
        }

        self.proposals.insert(
            identifier.clone(),
            DatasetProposal {
                identifier: identifier.clone(),
                proposer: *caller,
                approved: false,
            },
        );

        Ok(Event::DatasetProposed {
            identifier: identifier.clone(),
            proposer: *caller,
        })
    }

    /// Approve an existing proposal. Only the owner may call this.
    ///
    /// Returns `Ok(None)` when the proposal was already approved.
    pub fn approve_dataset(&mut self, caller: &Address, identifier: &DatasetId) -> Result<Option<Event>, Error> {
        if *caller != self.owner {
            return Err(Error::Unauthorized { caller: *caller });
        }

        let proposal = self
            .proposals
            .get_mut(identifier)
            .ok_or_else(|| Error::UnknownDataset(identifier.clone()))?;

        if proposal.approved {
            return Ok(None);
        }
        proposal.approved = true;

        Ok(Some(Event::DatasetApproved {
            identifier: identifier.clone(),
            approver: *caller,
        }))
    }

    /// True iff a proposal exists for `identifier` and it is approved.
    pub fn is_approved(&self, identifier: &DatasetId) -> bool {
        self.proposals.get(identifier).is_some_and(|p| p.approved)
    }

    pub fn proposal(&self, identifier: &DatasetId) -> Option<&DatasetProposal> {
        self.proposals.get(identifier)
    }

    pub fn state(&self, identifier: &DatasetId) -> ProposalState {
        match self.proposals.get(identifier) {
            None => ProposalState::Unproposed,
            Some(p) if p.approved => ProposalState::Approved,
            Some(_) => ProposalState::Proposed,
        }
    }

    /// Proposals still awaiting approval.
    pub fn pending(&self) -> impl Iterator<Item = &DatasetProposal> {
        self.proposals.values().filter(|p| !p.approved)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Content hash of the owner and every proposal.
    pub fn hash(&self) -> Hash {
        Hash::of_value(self)
    }
}
