//! Second-round batch groups and their votes

use super::ids::{BatchGroupId, BatchVoteId, MessageId, ProposalId, VoterId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of proposals reviewed together in the second round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchGroup {
    pub id: BatchGroupId,
    pub name: String,
    pub members: BTreeSet<ProposalId>,
    /// A locked group accepts no further votes
    #[serde(default)]
    pub locked: bool,
}

impl BatchGroup {
    pub fn new(id: impl Into<BatchGroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: BTreeSet::new(),
            locked: false,
        }
    }

    pub fn with_members(mut self, members: impl IntoIterator<Item = ProposalId>) -> Self {
        self.members.extend(members);
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }
}

/// One voter's decision on a batch group
///
/// An empty `accepted` set means "advance none of these".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchVote {
    pub id: BatchVoteId,
    pub voter: VoterId,
    pub batchgroup: BatchGroupId,
    pub accepted: BTreeSet<ProposalId>,
    pub updated_at: DateTime<Utc>,
}

/// A discussion message posted in a batch group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMessage {
    pub id: MessageId,
    pub batchgroup: BatchGroupId,
    pub author: VoterId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
