//! Whole-process totals for the end-of-review report

use crate::model::{BatchGroupId, BatchVote, Proposal, ProposalId, Vote, Voter, VoterId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningSummary {
    pub proposals: usize,
    /// Voters with at least one screening vote
    pub voters: usize,
    pub reviews: usize,
    pub nominations: usize,
    /// Fewest votes any non-withdrawn proposal received
    pub min_reviews: u32,
    /// Voters who scored every proposal they did not author
    pub full_coverage_voters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondRoundSummary {
    /// Proposals assigned to a batch group
    pub proposals: usize,
    /// Groups with at least one member
    pub batches: usize,
    pub reviews: usize,
    pub messages: usize,
    pub voters: usize,
    /// Fewest votes any group with members received
    pub min_reviews: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub screening: ScreeningSummary,
    pub second_round: SecondRoundSummary,
}

/// Everything the summary is computed from
pub struct SummaryInput<'a> {
    pub proposals: &'a [Proposal],
    pub voters: &'a [Voter],
    pub votes: &'a [Vote],
    pub batch_votes: &'a [BatchVote],
    pub messages: usize,
}

fn screening(input: &SummaryInput<'_>) -> ScreeningSummary {
    let active: Vec<&Proposal> = input.proposals.iter().filter(|p| !p.withdrawn).collect();

    let mut per_proposal: BTreeMap<ProposalId, u32> =
        active.iter().map(|p| (p.id, 0)).collect();
    let mut per_voter: BTreeMap<VoterId, HashSet<ProposalId>> = BTreeMap::new();
    for vote in input.votes {
        if let Some(count) = per_proposal.get_mut(&vote.proposal) {
            *count += 1;
        }
        per_voter.entry(vote.voter).or_default().insert(vote.proposal);
    }

    let full_coverage_voters = input
        .voters
        .iter()
        .filter(|voter| {
            let voted = per_voter.get(&voter.id);
            let mut eligible = active
                .iter()
                .filter(|p| !p.is_authored_by(&voter.email))
                .peekable();
            eligible.peek().is_some()
                && eligible.all(|p| voted.is_some_and(|v| v.contains(&p.id)))
        })
        .count();

    ScreeningSummary {
        proposals: input.proposals.len(),
        voters: per_voter.len(),
        reviews: input.votes.len(),
        nominations: input.votes.iter().filter(|v| v.nominate).count(),
        min_reviews: per_proposal.values().copied().min().unwrap_or(0),
        full_coverage_voters,
    }
}

fn second_round(input: &SummaryInput<'_>) -> SecondRoundSummary {
    let grouped: Vec<BatchGroupId> = input.proposals.iter().filter_map(|p| p.batchgroup).collect();

    let mut per_group: BTreeMap<BatchGroupId, usize> =
        grouped.iter().map(|g| (*g, 0)).collect();
    for vote in input.batch_votes {
        if let Some(count) = per_group.get_mut(&vote.batchgroup) {
            *count += 1;
        }
    }
    let voters: BTreeSet<VoterId> = input.batch_votes.iter().map(|v| v.voter).collect();

    SecondRoundSummary {
        proposals: grouped.len(),
        batches: per_group.len(),
        reviews: input.batch_votes.len(),
        messages: input.messages,
        voters: voters.len(),
        min_reviews: per_group.values().copied().min().unwrap_or(0),
    }
}

/// Totals for both review rounds
pub fn review_summary(input: &SummaryInput<'_>) -> ReviewSummary {
    ReviewSummary {
        screening: screening(input),
        second_round: second_round(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, BatchVoteId, StandardId, VoteId};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn vote(voter: i64, proposal: i64, nominate: bool) -> Vote {
        Vote {
            id: VoteId::new(voter * 100 + proposal),
            voter: VoterId::new(voter),
            proposal: ProposalId::new(proposal),
            scores: BTreeMap::from([(StandardId::new(1), 1)]),
            nominate,
            updated_at: Utc::now(),
        }
    }

    fn ballot(voter: i64, group: i64) -> BatchVote {
        BatchVote {
            id: BatchVoteId::new(voter * 100 + group),
            voter: VoterId::new(voter),
            batchgroup: BatchGroupId::new(group),
            accepted: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    fn grouped(id: i64, group: i64) -> Proposal {
        let mut p = Proposal::new(id, "grouped");
        p.batchgroup = Some(BatchGroupId::new(group));
        p
    }

    #[test]
    fn screening_totals() {
        let proposals = vec![
            Proposal::new(1, "a").with_author(Author::new("Ann", "ann@example.org")),
            Proposal::new(2, "b"),
            Proposal::new(3, "c").withdrawn(),
        ];
        let voters = vec![
            Voter::approved(1, "ann@example.org"),
            Voter::approved(2, "bob@example.org"),
        ];
        let votes = vec![vote(1, 2, true), vote(2, 2, false)];

        let summary = review_summary(&SummaryInput {
            proposals: &proposals,
            voters: &voters,
            votes: &votes,
            batch_votes: &[],
            messages: 0,
        });

        let s = summary.screening;
        assert_eq!(s.proposals, 3);
        assert_eq!(s.voters, 2);
        assert_eq!(s.reviews, 2);
        assert_eq!(s.nominations, 1);
        assert_eq!(s.min_reviews, 0);
        // Ann authored 1 and scored 2; Bob never scored 1
        assert_eq!(s.full_coverage_voters, 1);
    }

    #[test]
    fn second_round_totals() {
        let proposals = vec![grouped(1, 10), grouped(2, 10), grouped(3, 20), Proposal::new(4, "d")];
        let batch_votes = vec![ballot(1, 10), ballot(2, 10), ballot(1, 20)];

        let summary = review_summary(&SummaryInput {
            proposals: &proposals,
            voters: &[],
            votes: &[],
            batch_votes: &batch_votes,
            messages: 5,
        });

        let r = summary.second_round;
        assert_eq!(r.proposals, 3);
        assert_eq!(r.batches, 2);
        assert_eq!(r.reviews, 3);
        assert_eq!(r.messages, 5);
        assert_eq!(r.voters, 2);
        assert_eq!(r.min_reviews, 1);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let summary = review_summary(&SummaryInput {
            proposals: &[],
            voters: &[],
            votes: &[],
            batch_votes: &[],
            messages: 0,
        });
        assert_eq!(summary.screening.min_reviews, 0);
        assert_eq!(summary.second_round.batches, 0);
        assert_eq!(summary.screening.full_coverage_voters, 0);
    }
}
