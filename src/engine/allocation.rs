//! Reviewer routing
//!
//! Each call sends the reviewer to one of the least-reviewed proposals they
//! may still score. Fairness is local to the call: only the counts visible
//! right now matter.

use crate::model::{Proposal, ProposalId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// Proposals the reviewer may be sent to
///
/// Excludes withdrawn proposals, proposals the reviewer authored (email
/// compared case-insensitively) and proposals they already voted on.
pub fn candidates<'a>(
    proposals: &'a [Proposal],
    reviewer_email: &str,
    voted: &HashSet<ProposalId>,
) -> Vec<&'a Proposal> {
    proposals
        .iter()
        .filter(|p| !p.withdrawn)
        .filter(|p| !p.is_authored_by(reviewer_email))
        .filter(|p| !voted.contains(&p.id))
        .collect()
}

/// Candidates sharing the minimum vote count, in input order
pub fn least_covered(
    candidates: &[&Proposal],
    counts: &HashMap<ProposalId, u32>,
) -> Vec<ProposalId> {
    let count_of = |id: &ProposalId| counts.get(id).copied().unwrap_or(0);
    let Some(min) = candidates.iter().map(|p| count_of(&p.id)).min() else {
        return Vec::new();
    };
    candidates
        .iter()
        .map(|p| p.id)
        .filter(|id| count_of(id) == min)
        .collect()
}

/// Uniform random tie-break between equally covered proposals
#[derive(Debug)]
pub struct Allocator {
    rng: Mutex<StdRng>,
}

impl Allocator {
    /// Allocator seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Allocator with a fixed seed, for reproducible picks
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pick one of `ids`, or `None` when empty
    pub fn choose(&self, ids: &[ProposalId]) -> Option<ProposalId> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        ids.choose(&mut *rng).copied()
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of proposals that have received a given number of votes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageLevel {
    pub vote_count: u32,
    pub proposals: usize,
}

/// Histogram of vote counts over non-withdrawn proposals, fewest votes first
pub fn coverage_progress(
    proposals: &[Proposal],
    counts: &HashMap<ProposalId, u32>,
) -> Vec<CoverageLevel> {
    let mut histogram: BTreeMap<u32, usize> = BTreeMap::new();
    for proposal in proposals.iter().filter(|p| !p.withdrawn) {
        let count = counts.get(&proposal.id).copied().unwrap_or(0);
        *histogram.entry(count).or_insert(0) += 1;
    }
    histogram
        .into_iter()
        .map(|(vote_count, proposals)| CoverageLevel {
            vote_count,
            proposals,
        })
        .collect()
}
