//! Bulk import of an ingestion snapshot
//!
//! A snapshot is the JSON document the ingestion side produces: proposals,
//! rubric, voters, groups and any votes already cast. Loading order matters
//! because votes and messages reference the other records.

use super::traits::{IngestStore, StorageResult, VoteStore};
use crate::model::{
    BatchGroup, BatchGroupId, Proposal, ProposalId, Standard, StandardId, Voter, VoterId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// A screening vote as recorded by the ingestion side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: VoterId,
    pub proposal: ProposalId,
    pub scores: BTreeMap<StandardId, i32>,
    #[serde(default)]
    pub nominate: bool,
}

/// A batch vote as recorded by the ingestion side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchVoteRecord {
    pub voter: VoterId,
    pub batchgroup: BatchGroupId,
    #[serde(default)]
    pub accepted: BTreeSet<ProposalId>,
}

/// A batch discussion message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub batchgroup: BatchGroupId,
    pub author: VoterId,
    pub body: String,
}

/// Everything needed to populate a store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub standards: Vec<Standard>,
    pub voters: Vec<Voter>,
    pub batchgroups: Vec<BatchGroup>,
    pub proposals: Vec<Proposal>,
    pub votes: Vec<VoteRecord>,
    pub batch_votes: Vec<BatchVoteRecord>,
    pub messages: Vec<MessageRecord>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text
    pub fn from_json(text: &str) -> StorageResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write every record into `store`
    ///
    /// Votes are stored as-is: the snapshot is trusted ingestion data and
    /// does not go through vote validation.
    pub fn load_into<S>(&self, store: &S) -> StorageResult<()>
    where
        S: IngestStore + VoteStore,
    {
        for standard in &self.standards {
            store.insert_standard(standard)?;
        }
        for voter in &self.voters {
            store.insert_voter(voter)?;
        }
        // Groups first without members so proposals can reference them
        for group in &self.batchgroups {
            store.insert_batchgroup(&BatchGroup {
                members: BTreeSet::new(),
                ..group.clone()
            })?;
        }
        for proposal in &self.proposals {
            store.insert_proposal(proposal)?;
        }
        for group in self.batchgroups.iter().filter(|g| !g.members.is_empty()) {
            store.insert_batchgroup(group)?;
        }
        for vote in &self.votes {
            store.upsert_screening_vote(vote.voter, vote.proposal, &vote.scores, vote.nominate)?;
        }
        for vote in &self.batch_votes {
            store.upsert_batch_vote(vote.voter, vote.batchgroup, &vote.accepted)?;
        }
        for message in &self.messages {
            store.add_batch_message(message.batchgroup, message.author, &message.body)?;
        }

        info!(
            proposals = self.proposals.len(),
            voters = self.voters.len(),
            votes = self.votes.len(),
            batch_votes = self.batch_votes.len(),
            "snapshot loaded"
        );
        Ok(())
    }
}
