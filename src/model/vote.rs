//! Screening-round votes, rubric standards and voters

use super::ids::{ProposalId, StandardId, VoteId, VoterId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rubric criterion every screening vote must score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standard {
    pub id: StandardId,
    pub description: String,
}

impl Standard {
    pub fn new(id: impl Into<StandardId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// A committee member as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: VoterId,
    pub email: String,
    pub display_name: String,
    pub approved: bool,
}

impl Voter {
    /// An approved voter
    pub fn approved(id: impl Into<VoterId>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: id.into(),
            display_name: email.clone(),
            email,
            approved: true,
        }
    }

    /// A registered voter still waiting for approval
    pub fn pending(id: impl Into<VoterId>, email: impl Into<String>) -> Self {
        Self {
            approved: false,
            ..Self::approved(id, email)
        }
    }
}

/// One voter's screening vote on one proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter: VoterId,
    pub proposal: ProposalId,
    /// Score per standard, each in `0..=max_score`
    pub scores: BTreeMap<StandardId, i32>,
    pub nominate: bool,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    /// Score values in standard order
    pub fn values(&self) -> impl Iterator<Item = i32> + '_ {
        self.scores.values().copied()
    }
}
