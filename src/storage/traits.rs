//! Storage trait definitions
//!
//! The engine reads snapshots and writes votes through these collaborator
//! traits. Uniqueness of (voter, proposal) and (voter, batch group) is the
//! store's job: upserts resolve to "insert, or on conflict update".

use crate::model::{
    BatchGroup, BatchGroupId, BatchMessage, BatchVote, BatchVoteId, MessageId, Proposal,
    ProposalId, Standard, StandardId, Vote, VoteId, Voter, VoterId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Batch group not found: {0}")]
    BatchGroupNotFound(BatchGroupId),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Read access to proposals, plus the batch-group assignment side effect
pub trait ProposalStore: Send + Sync {
    /// Load a proposal by ID
    fn get_proposal(&self, id: ProposalId) -> StorageResult<Option<Proposal>>;

    /// All proposals, ordered by ID
    fn list_proposals(&self) -> StorageResult<Vec<Proposal>>;

    /// All proposals that have not been withdrawn, ordered by ID
    fn list_non_withdrawn(&self) -> StorageResult<Vec<Proposal>> {
        Ok(self
            .list_proposals()?
            .into_iter()
            .filter(|p| !p.withdrawn)
            .collect())
    }

    /// Move a proposal into a batch group, or out of any group with `None`
    fn set_batchgroup(&self, id: ProposalId, group: Option<BatchGroupId>) -> StorageResult<()>;
}

/// Screening and batch vote records
pub trait VoteStore: Send + Sync {
    /// Insert a screening vote, or overwrite the existing one for the pair
    fn upsert_screening_vote(
        &self,
        voter: VoterId,
        proposal: ProposalId,
        scores: &BTreeMap<StandardId, i32>,
        nominate: bool,
    ) -> StorageResult<VoteId>;

    /// Insert a batch vote, or overwrite the existing one for the pair
    fn upsert_batch_vote(
        &self,
        voter: VoterId,
        group: BatchGroupId,
        accepted: &BTreeSet<ProposalId>,
    ) -> StorageResult<BatchVoteId>;

    /// Screening votes cast on a proposal
    fn votes_for_proposal(&self, id: ProposalId) -> StorageResult<Vec<Vote>>;

    /// Batch votes cast on a group
    fn votes_for_batchgroup(&self, id: BatchGroupId) -> StorageResult<Vec<BatchVote>>;

    /// Every screening vote, ordered by proposal then voter
    fn all_votes(&self) -> StorageResult<Vec<Vote>>;

    /// Every batch vote, ordered by group then voter
    fn all_batch_votes(&self) -> StorageResult<Vec<BatchVote>>;

    /// Proposals the voter has already scored
    fn proposals_voted_by(&self, voter: VoterId) -> StorageResult<HashSet<ProposalId>>;

    /// Current screening vote count per proposal (proposals without votes are absent)
    fn vote_counts(&self) -> StorageResult<HashMap<ProposalId, u32>>;
}

/// The rubric in force
pub trait StandardStore: Send + Sync {
    /// Current standards, ordered by ID
    fn current_standards(&self) -> StorageResult<Vec<Standard>>;
}

/// Committee members
pub trait VoterStore: Send + Sync {
    fn get_voter(&self, id: VoterId) -> StorageResult<Option<Voter>>;

    /// All voters, ordered by ID
    fn list_voters(&self) -> StorageResult<Vec<Voter>>;
}

/// Second-round batch groups and their discussion
pub trait BatchStore: Send + Sync {
    /// Load a group with its current members
    fn get_batchgroup(&self, id: BatchGroupId) -> StorageResult<Option<BatchGroup>>;

    /// All groups with their members, ordered by ID
    fn list_batchgroups(&self) -> StorageResult<Vec<BatchGroup>>;

    /// Lock or unlock a group
    fn set_batch_lock(&self, id: BatchGroupId, locked: bool) -> StorageResult<()>;

    /// Discussion messages posted in a group, oldest first
    fn batch_messages(&self, id: BatchGroupId) -> StorageResult<Vec<BatchMessage>>;
}

/// Everything the engine needs from persistence
pub trait ReviewStore: ProposalStore + VoteStore + StandardStore + VoterStore + BatchStore {}

impl<T> ReviewStore for T where T: ProposalStore + VoteStore + StandardStore + VoterStore + BatchStore {}

/// Write access used by the ingestion side to load records
///
/// Group membership lives on the proposal (`Proposal::batchgroup`); a group's
/// `members` are applied to the proposals when the group is inserted.
pub trait IngestStore: Send + Sync {
    /// Insert or replace a proposal
    fn insert_proposal(&self, proposal: &Proposal) -> StorageResult<()>;

    /// Insert or replace a standard
    fn insert_standard(&self, standard: &Standard) -> StorageResult<()>;

    /// Insert or replace a voter
    fn insert_voter(&self, voter: &Voter) -> StorageResult<()>;

    /// Insert or replace a batch group and assign its members to it
    fn insert_batchgroup(&self, group: &BatchGroup) -> StorageResult<()>;

    /// Append a discussion message to a group
    fn add_batch_message(
        &self,
        group: BatchGroupId,
        author: VoterId,
        body: &str,
    ) -> StorageResult<MessageId>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
