//! Second-round agreement statistics
//!
//! Every batch vote picks a subset of the group's members; an empty pick is
//! a vote to advance nothing. Percentages are relative to the number of
//! voters in the group, so a vote accepting several proposals contributes to
//! each of them and a group's percentages may sum to more than 100.

use crate::model::{BatchGroup, BatchGroupId, BatchVote, ProposalId};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// What a batch vote can advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Advance none of the group's proposals
    None,
    Proposal(ProposalId),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::None => write!(f, "none"),
            Outcome::Proposal(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "none" {
            return Ok(Outcome::None);
        }
        s.parse::<i64>()
            .map(|id| Outcome::Proposal(ProposalId::new(id)))
            .map_err(|_| format!("invalid outcome: {s}"))
    }
}

// Outcomes are map keys in reports, so they travel as strings
impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Percentage of voters per outcome
pub type GroupCoverage = BTreeMap<Outcome, u32>;

/// Coverage of every batch group
pub type BatchCoverage = BTreeMap<BatchGroupId, GroupCoverage>;

/// Per-group summary of the second round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub voters: usize,
    pub msgs: usize,
    /// Distinct proposals accepted by at least one voter
    pub nominated_talks: usize,
    /// Acceptances across all votes
    pub nominations: usize,
    /// Share of voters behind the most popular outcome
    pub consensus: u32,
}

fn percent(count: usize, voters: usize) -> u32 {
    if voters == 0 {
        return 0;
    }
    (100.0 * count as f64 / voters as f64).round() as u32
}

/// Raw count per outcome; members and `None` start at zero
fn outcome_counts(group: &BatchGroup, votes: &[BatchVote]) -> BTreeMap<Outcome, usize> {
    let mut counts: BTreeMap<Outcome, usize> = group
        .members
        .iter()
        .map(|id| (Outcome::Proposal(*id), 0))
        .collect();
    counts.insert(Outcome::None, 0);

    for vote in votes.iter().filter(|v| v.batchgroup == group.id) {
        if vote.accepted.is_empty() {
            *counts.entry(Outcome::None).or_insert(0) += 1;
        }
        for id in &vote.accepted {
            *counts.entry(Outcome::Proposal(*id)).or_insert(0) += 1;
        }
    }
    counts
}

fn voters_in(group: &BatchGroup, votes: &[BatchVote]) -> usize {
    votes.iter().filter(|v| v.batchgroup == group.id).count()
}

/// Percentage of the group's voters behind each outcome
///
/// Only votes cast on `group` are counted.
pub fn group_coverage(group: &BatchGroup, votes: &[BatchVote]) -> GroupCoverage {
    let voters = voters_in(group, votes);
    outcome_counts(group, votes)
        .into_iter()
        .map(|(outcome, count)| (outcome, percent(count, voters)))
        .collect()
}

/// Summary statistics of one group
pub fn group_stats(group: &BatchGroup, votes: &[BatchVote], messages: usize) -> BatchStats {
    let voters = voters_in(group, votes);
    let counts = outcome_counts(group, votes);

    let mut accepted = BTreeSet::new();
    let mut nominations = 0;
    for vote in votes.iter().filter(|v| v.batchgroup == group.id) {
        nominations += vote.accepted.len();
        accepted.extend(vote.accepted.iter().copied());
    }

    BatchStats {
        voters,
        msgs: messages,
        nominated_talks: accepted.len(),
        nominations,
        consensus: percent(counts.values().copied().max().unwrap_or(0), voters),
    }
}
