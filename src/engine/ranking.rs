//! Screening-round ranking
//!
//! Scores are normalised to percentages of the maximum. A nomination counts
//! as a vote at full marks in the weighted score, so a single enthusiastic
//! reviewer can lift a proposal above its raw average.

use crate::model::{BatchGroupId, Proposal, ProposalId, Vote};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredProposal {
    pub id: ProposalId,
    pub title: String,
    pub batchgroup: Option<BatchGroupId>,
    pub vote_count: u32,
    /// Mean of all score values, as a percentage of the maximum
    pub raw_score: u32,
    /// As `raw_score`, with every value of a nominated vote at the maximum
    pub nomination_weighted_score: u32,
    pub nomination_count: u32,
    /// Mean share of top marks per vote, as a percentage
    pub greenness: u32,
    /// Zero-based position in the ranking
    pub rank: usize,
    /// `|raw_score - nomination_weighted_score|`
    pub delta: u32,
}

/// `round(100 * sum / (max * count))`, 0 for an empty set
fn percentage(sum: i64, count: usize, max_score: i32) -> u32 {
    if count == 0 || max_score <= 0 {
        return 0;
    }
    let ratio = sum as f64 / (max_score as f64 * count as f64);
    (100.0 * ratio).round().max(0.0) as u32
}

struct Tally {
    raw_sum: i64,
    weighted_sum: i64,
    values: usize,
    green: f64,
    votes: usize,
    nominations: u32,
}

fn tally(votes: &[&Vote], max_score: i32) -> Tally {
    let mut t = Tally {
        raw_sum: 0,
        weighted_sum: 0,
        values: 0,
        green: 0.0,
        votes: votes.len(),
        nominations: 0,
    };

    for vote in votes {
        let values: Vec<i32> = vote.values().collect();
        t.values += values.len();
        t.raw_sum += values.iter().map(|v| i64::from(*v)).sum::<i64>();

        if vote.nominate {
            t.nominations += 1;
            t.weighted_sum += i64::from(max_score) * values.len() as i64;
            t.green += 1.0;
        } else {
            t.weighted_sum += values.iter().map(|v| i64::from(*v)).sum::<i64>();
            if !values.is_empty() {
                let top = values.iter().filter(|v| **v == max_score).count();
                t.green += top as f64 / values.len() as f64;
            }
        }
    }
    t
}

/// Rank every non-withdrawn proposal that has at least one vote
///
/// Ordered by weighted score descending, ties by proposal id ascending.
pub fn score_proposals(
    proposals: &[Proposal],
    votes: &[Vote],
    max_score: i32,
) -> Vec<ScoredProposal> {
    let mut by_proposal: HashMap<ProposalId, Vec<&Vote>> = HashMap::new();
    for vote in votes {
        by_proposal.entry(vote.proposal).or_default().push(vote);
    }

    let mut scored: Vec<ScoredProposal> = proposals
        .iter()
        .filter(|p| !p.withdrawn)
        .filter_map(|p| {
            let votes = by_proposal.get(&p.id).filter(|v| !v.is_empty())?;
            let t = tally(votes, max_score);
            let raw_score = percentage(t.raw_sum, t.values, max_score);
            let nomination_weighted_score = percentage(t.weighted_sum, t.values, max_score);
            let greenness = (100.0 * t.green / t.votes as f64).round() as u32;

            Some(ScoredProposal {
                id: p.id,
                title: p.content.title.clone(),
                batchgroup: p.batchgroup,
                vote_count: t.votes as u32,
                raw_score,
                nomination_weighted_score,
                nomination_count: t.nominations,
                greenness,
                rank: 0,
                delta: raw_score.abs_diff(nomination_weighted_score),
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.nomination_weighted_score
            .cmp(&a.nomination_weighted_score)
            .then(a.id.cmp(&b.id))
    });
    for (rank, row) in scored.iter_mut().enumerate() {
        row.rank = rank;
    }
    scored
}
