//! In-memory store backed by concurrent maps
//!
//! Votes are keyed by their unique pair, so the map's entry API gives the
//! same "insert, or on conflict update" behaviour a database constraint does.

use super::traits::{
    BatchStore, IngestStore, ProposalStore, StandardStore, StorageError, StorageResult,
    VoteStore, VoterStore,
};
use crate::model::{
    BatchGroup, BatchGroupId, BatchMessage, BatchVote, BatchVoteId, MessageId, Proposal,
    ProposalId, Standard, StandardId, Vote, VoteId, Voter, VoterId,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

/// Volatile store for tests and one-shot computations
#[derive(Debug, Default)]
pub struct MemoryStore {
    proposals: DashMap<ProposalId, Proposal>,
    standards: DashMap<StandardId, Standard>,
    voters: DashMap<VoterId, Voter>,
    votes: DashMap<(VoterId, ProposalId), Vote>,
    groups: DashMap<BatchGroupId, BatchGroup>,
    batch_votes: DashMap<(VoterId, BatchGroupId), BatchVote>,
    messages: DashMap<MessageId, BatchMessage>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Attach current members to a stored group
    fn with_members(&self, mut group: BatchGroup) -> BatchGroup {
        group.members = self
            .proposals
            .iter()
            .filter(|p| p.batchgroup == Some(group.id))
            .map(|p| p.id)
            .collect();
        group
    }
}

impl ProposalStore for MemoryStore {
    fn get_proposal(&self, id: ProposalId) -> StorageResult<Option<Proposal>> {
        Ok(self.proposals.get(&id).map(|r| r.clone()))
    }

    fn list_proposals(&self) -> StorageResult<Vec<Proposal>> {
        let mut proposals: Vec<Proposal> = self.proposals.iter().map(|r| r.clone()).collect();
        proposals.sort_by_key(|p| p.id);
        Ok(proposals)
    }

    fn set_batchgroup(&self, id: ProposalId, group: Option<BatchGroupId>) -> StorageResult<()> {
        if let Some(gid) = group {
            if !self.groups.contains_key(&gid) {
                return Err(StorageError::BatchGroupNotFound(gid));
            }
        }
        let mut proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(StorageError::ProposalNotFound(id))?;
        proposal.batchgroup = group;
        Ok(())
    }
}

impl VoteStore for MemoryStore {
    fn upsert_screening_vote(
        &self,
        voter: VoterId,
        proposal: ProposalId,
        scores: &BTreeMap<StandardId, i32>,
        nominate: bool,
    ) -> StorageResult<VoteId> {
        if !self.proposals.contains_key(&proposal) {
            return Err(StorageError::ProposalNotFound(proposal));
        }

        let (id, inserted) = match self.votes.entry((voter, proposal)) {
            Entry::Occupied(mut existing) => {
                let vote = existing.get_mut();
                vote.scores = scores.clone();
                vote.nominate = nominate;
                vote.updated_at = Utc::now();
                (vote.id, false)
            }
            Entry::Vacant(slot) => {
                let id = VoteId::new(self.allocate_id());
                slot.insert(Vote {
                    id,
                    voter,
                    proposal,
                    scores: scores.clone(),
                    nominate,
                    updated_at: Utc::now(),
                });
                (id, true)
            }
        };

        if inserted {
            if let Some(mut p) = self.proposals.get_mut(&proposal) {
                p.vote_count += 1;
            }
        }
        Ok(id)
    }

    fn upsert_batch_vote(
        &self,
        voter: VoterId,
        group: BatchGroupId,
        accepted: &BTreeSet<ProposalId>,
    ) -> StorageResult<BatchVoteId> {
        if !self.groups.contains_key(&group) {
            return Err(StorageError::BatchGroupNotFound(group));
        }

        let id = match self.batch_votes.entry((voter, group)) {
            Entry::Occupied(mut existing) => {
                let vote = existing.get_mut();
                vote.accepted = accepted.clone();
                vote.updated_at = Utc::now();
                vote.id
            }
            Entry::Vacant(slot) => {
                let id = BatchVoteId::new(self.allocate_id());
                slot.insert(BatchVote {
                    id,
                    voter,
                    batchgroup: group,
                    accepted: accepted.clone(),
                    updated_at: Utc::now(),
                });
                id
            }
        };
        Ok(id)
    }

    fn votes_for_proposal(&self, id: ProposalId) -> StorageResult<Vec<Vote>> {
        let mut votes: Vec<Vote> = self
            .votes
            .iter()
            .filter(|v| v.proposal == id)
            .map(|v| v.clone())
            .collect();
        votes.sort_by_key(|v| v.voter);
        Ok(votes)
    }

    fn votes_for_batchgroup(&self, id: BatchGroupId) -> StorageResult<Vec<BatchVote>> {
        let mut votes: Vec<BatchVote> = self
            .batch_votes
            .iter()
            .filter(|v| v.batchgroup == id)
            .map(|v| v.clone())
            .collect();
        votes.sort_by_key(|v| v.voter);
        Ok(votes)
    }

    fn all_votes(&self) -> StorageResult<Vec<Vote>> {
        let mut votes: Vec<Vote> = self.votes.iter().map(|v| v.clone()).collect();
        votes.sort_by_key(|v| (v.proposal, v.voter));
        Ok(votes)
    }

    fn all_batch_votes(&self) -> StorageResult<Vec<BatchVote>> {
        let mut votes: Vec<BatchVote> = self.batch_votes.iter().map(|v| v.clone()).collect();
        votes.sort_by_key(|v| (v.batchgroup, v.voter));
        Ok(votes)
    }

    fn proposals_voted_by(&self, voter: VoterId) -> StorageResult<HashSet<ProposalId>> {
        Ok(self
            .votes
            .iter()
            .filter(|v| v.voter == voter)
            .map(|v| v.proposal)
            .collect())
    }

    fn vote_counts(&self) -> StorageResult<HashMap<ProposalId, u32>> {
        let mut counts = HashMap::new();
        for vote in self.votes.iter() {
            *counts.entry(vote.proposal).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl StandardStore for MemoryStore {
    fn current_standards(&self) -> StorageResult<Vec<Standard>> {
        let mut standards: Vec<Standard> = self.standards.iter().map(|s| s.clone()).collect();
        standards.sort_by_key(|s| s.id);
        Ok(standards)
    }
}

impl VoterStore for MemoryStore {
    fn get_voter(&self, id: VoterId) -> StorageResult<Option<Voter>> {
        Ok(self.voters.get(&id).map(|v| v.clone()))
    }

    fn list_voters(&self) -> StorageResult<Vec<Voter>> {
        let mut voters: Vec<Voter> = self.voters.iter().map(|v| v.clone()).collect();
        voters.sort_by_key(|v| v.id);
        Ok(voters)
    }
}

impl BatchStore for MemoryStore {
    fn get_batchgroup(&self, id: BatchGroupId) -> StorageResult<Option<BatchGroup>> {
        let group = self.groups.get(&id).map(|g| g.clone());
        Ok(group.map(|g| self.with_members(g)))
    }

    fn list_batchgroups(&self) -> StorageResult<Vec<BatchGroup>> {
        let mut groups: Vec<BatchGroup> = self.groups.iter().map(|g| g.clone()).collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups.into_iter().map(|g| self.with_members(g)).collect())
    }

    fn set_batch_lock(&self, id: BatchGroupId, locked: bool) -> StorageResult<()> {
        let mut group = self
            .groups
            .get_mut(&id)
            .ok_or(StorageError::BatchGroupNotFound(id))?;
        group.locked = locked;
        Ok(())
    }

    fn batch_messages(&self, id: BatchGroupId) -> StorageResult<Vec<BatchMessage>> {
        let mut messages: Vec<BatchMessage> = self
            .messages
            .iter()
            .filter(|m| m.batchgroup == id)
            .map(|m| m.clone())
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }
}

impl IngestStore for MemoryStore {
    fn insert_proposal(&self, proposal: &Proposal) -> StorageResult<()> {
        let mut proposal = proposal.clone();
        proposal.vote_count = self
            .votes
            .iter()
            .filter(|v| v.proposal == proposal.id)
            .count() as u32;
        self.proposals.insert(proposal.id, proposal);
        Ok(())
    }

    fn insert_standard(&self, standard: &Standard) -> StorageResult<()> {
        self.standards.insert(standard.id, standard.clone());
        Ok(())
    }

    fn insert_voter(&self, voter: &Voter) -> StorageResult<()> {
        self.voters.insert(voter.id, voter.clone());
        Ok(())
    }

    fn insert_batchgroup(&self, group: &BatchGroup) -> StorageResult<()> {
        if let Some(missing) = group
            .members
            .iter()
            .find(|m| !self.proposals.contains_key(m))
        {
            return Err(StorageError::ProposalNotFound(*missing));
        }
        let mut stored = group.clone();
        stored.members.clear();
        self.groups.insert(group.id, stored);
        for member in &group.members {
            self.set_batchgroup(*member, Some(group.id))?;
        }
        Ok(())
    }

    fn add_batch_message(
        &self,
        group: BatchGroupId,
        author: VoterId,
        body: &str,
    ) -> StorageResult<MessageId> {
        if !self.groups.contains_key(&group) {
            return Err(StorageError::BatchGroupNotFound(group));
        }
        let id = MessageId::new(self.allocate_id());
        self.messages.insert(
            id,
            BatchMessage {
                id,
                batchgroup: group,
                author,
                body: body.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }
}
