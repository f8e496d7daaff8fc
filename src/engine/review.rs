//! ReviewEngine: the entry point for reviewers and organisers
//!
//! Every operation reads a fresh snapshot from the store; nothing is cached
//! between calls. Only vote submission (and the two organiser relays) write.

use super::allocation::{self, Allocator, CoverageLevel};
use super::cluster::{self, ClusterAssignment, ClusterError, ClusterParams, Tokenizer};
use super::consensus::{self, BatchCoverage, BatchStats, Outcome};
use super::ranking::{self, ScoredProposal};
use super::scoring::{self, VoteRejection};
use super::summary::{self, ReviewSummary, SummaryInput};
use crate::config::EngineConfig;
use crate::model::{BatchGroupId, BatchVoteId, ProposalId, StandardId, VoteId, VoterId};
use crate::storage::{ReviewStore, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from engine operations
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Vote rejected: {0}")]
    Rejected(#[from] VoteRejection),

    #[error("Insufficient corpus for clustering: {documents} documents, {vocabulary} shared terms")]
    InsufficientCorpus { documents: usize, vocabulary: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<ClusterError> for ReviewError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::InsufficientCorpus {
                documents,
                vocabulary,
            } => ReviewError::InsufficientCorpus {
                documents,
                vocabulary,
            },
            ClusterError::InvalidParameter(msg) => ReviewError::InvalidParameter(msg),
        }
    }
}

/// Result type for engine operations
pub type ReviewResult<T> = Result<T, ReviewError>;

/// A ranking row with the proposal's second-round agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoughScore {
    #[serde(flatten)]
    pub score: ScoredProposal,
    /// Share of its group's voters accepting the proposal; absent when ungrouped
    pub consensus: Option<u32>,
}

/// Review allocation and aggregation over a store
pub struct ReviewEngine<S: ReviewStore> {
    store: Arc<S>,
    config: EngineConfig,
    tokenizer: Tokenizer,
    allocator: Allocator,
}

impl<S: ReviewStore> ReviewEngine<S> {
    /// Engine with the default configuration
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
        let allocator = match config.rng_seed {
            Some(seed) => Allocator::seeded(seed),
            None => Allocator::new(),
        };
        let tokenizer = Tokenizer::new(&config.extra_stop_words);
        Self {
            store,
            config,
            tokenizer,
            allocator,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn reject<T>(&self, rejection: VoteRejection) -> ReviewResult<T> {
        warn!(reason = %rejection, "vote rejected");
        Err(rejection.into())
    }

    // --- Write ---

    /// Record a screening vote, replacing the voter's earlier vote on the proposal
    pub fn submit_vote(
        &self,
        voter: VoterId,
        proposal: ProposalId,
        scores: &BTreeMap<StandardId, i32>,
        nominate: bool,
    ) -> ReviewResult<VoteId> {
        if let Err(r) = scoring::check_voter(voter, self.store.get_voter(voter)?.as_ref()) {
            return self.reject(r);
        }
        if self.store.get_proposal(proposal)?.is_none() {
            return self.reject(VoteRejection::UnknownProposal(proposal));
        }
        let standards = self.store.current_standards()?;
        if let Err(r) = scoring::validate_scores(&standards, scores, self.config.max_score) {
            return self.reject(r);
        }

        let id = self
            .store
            .upsert_screening_vote(voter, proposal, scores, nominate)?;
        debug!(%voter, %proposal, nominate, vote = %id, "vote recorded");
        Ok(id)
    }

    /// Record a second-round vote; an empty `accepted` set advances nothing
    pub fn submit_batch_vote(
        &self,
        voter: VoterId,
        group: BatchGroupId,
        accepted: &BTreeSet<ProposalId>,
    ) -> ReviewResult<BatchVoteId> {
        if let Err(r) = scoring::check_voter(voter, self.store.get_voter(voter)?.as_ref()) {
            return self.reject(r);
        }
        let Some(batchgroup) = self.store.get_batchgroup(group)? else {
            return self.reject(VoteRejection::UnknownBatchGroup(group));
        };
        if let Err(r) = scoring::validate_acceptance(&batchgroup, accepted) {
            return self.reject(r);
        }

        let id = self.store.upsert_batch_vote(voter, group, accepted)?;
        debug!(%voter, %group, accepted = accepted.len(), vote = %id, "batch vote recorded");
        Ok(id)
    }

    /// Lock or unlock a batch group
    pub fn set_batch_lock(&self, group: BatchGroupId, locked: bool) -> ReviewResult<()> {
        self.store.set_batch_lock(group, locked)?;
        info!(%group, locked, "batch group lock changed");
        Ok(())
    }

    /// Move a proposal into a batch group, or out of any with `None`
    pub fn assign_proposal(
        &self,
        proposal: ProposalId,
        group: Option<BatchGroupId>,
    ) -> ReviewResult<()> {
        self.store.set_batchgroup(proposal, group)?;
        info!(%proposal, group = ?group.map(|g| g.get()), "proposal assigned");
        Ok(())
    }

    // --- Allocation ---

    /// The next proposal this reviewer should score, if any remain
    pub fn next_for_reviewer(
        &self,
        reviewer_email: &str,
        reviewer: VoterId,
    ) -> ReviewResult<Option<ProposalId>> {
        let proposals = self.store.list_non_withdrawn()?;
        let voted = self.store.proposals_voted_by(reviewer)?;
        let counts = self.store.vote_counts()?;

        let pool = allocation::candidates(&proposals, reviewer_email, &voted);
        let lowest = allocation::least_covered(&pool, &counts);
        let pick = self.allocator.choose(&lowest);

        debug!(
            %reviewer,
            candidates = pool.len(),
            tied = lowest.len(),
            pick = ?pick.map(|p| p.get()),
            "allocation"
        );
        Ok(pick)
    }

    /// How many proposals sit at each vote count
    pub fn coverage_progress(&self) -> ReviewResult<Vec<CoverageLevel>> {
        let proposals = self.store.list_non_withdrawn()?;
        let counts = self.store.vote_counts()?;
        Ok(allocation::coverage_progress(&proposals, &counts))
    }

    // --- Aggregation ---

    /// Screening ranking, best first
    pub fn score_proposals(&self) -> ReviewResult<Vec<ScoredProposal>> {
        let proposals = self.store.list_proposals()?;
        let votes = self.store.all_votes()?;
        Ok(ranking::score_proposals(
            &proposals,
            &votes,
            self.config.max_score,
        ))
    }

    /// Outcome percentages for every batch group
    pub fn batch_coverage(&self) -> ReviewResult<BatchCoverage> {
        let votes = self.store.all_batch_votes()?;
        Ok(self
            .store
            .list_batchgroups()?
            .iter()
            .map(|group| (group.id, consensus::group_coverage(group, &votes)))
            .collect())
    }

    /// Summary statistics for every batch group
    pub fn batch_stats(&self) -> ReviewResult<BTreeMap<BatchGroupId, BatchStats>> {
        let votes = self.store.all_batch_votes()?;
        self.store
            .list_batchgroups()?
            .iter()
            .map(|group| -> ReviewResult<_> {
                let messages = self.store.batch_messages(group.id)?.len();
                Ok((group.id, consensus::group_stats(group, &votes, messages)))
            })
            .collect()
    }

    /// Ranking joined with each proposal's batch-group agreement
    pub fn rough_scores(&self) -> ReviewResult<Vec<RoughScore>> {
        let coverage = self.batch_coverage()?;
        Ok(self
            .score_proposals()?
            .into_iter()
            .map(|score| {
                let consensus = score.batchgroup.and_then(|group| {
                    coverage
                        .get(&group)?
                        .get(&Outcome::Proposal(score.id))
                        .copied()
                });
                RoughScore { score, consensus }
            })
            .collect())
    }

    /// Advisory topic clusters over non-withdrawn proposals
    pub fn auto_group_proposals(
        &self,
        topic_count: usize,
        similarity_threshold: f64,
    ) -> ReviewResult<ClusterAssignment> {
        let proposals = self.store.list_non_withdrawn()?;
        let assignment = cluster::auto_group(
            &proposals,
            &self.config.text_fields,
            &self.tokenizer,
            ClusterParams::new(topic_count, similarity_threshold),
        )?;
        Ok(assignment)
    }

    /// As `auto_group_proposals`, with the configured parameters
    pub fn auto_group_default(&self) -> ReviewResult<ClusterAssignment> {
        self.auto_group_proposals(self.config.topic_count, self.config.similarity_threshold)
    }

    /// End-of-review totals for both rounds
    pub fn review_summary(&self) -> ReviewResult<ReviewSummary> {
        let proposals = self.store.list_proposals()?;
        let voters = self.store.list_voters()?;
        let votes = self.store.all_votes()?;
        let batch_votes = self.store.all_batch_votes()?;

        let mut messages = 0;
        for group in self.store.list_batchgroups()? {
            messages += self.store.batch_messages(group.id)?.len();
        }

        Ok(summary::review_summary(&SummaryInput {
            proposals: &proposals,
            voters: &voters,
            votes: &votes,
            batch_votes: &batch_votes,
            messages,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, BatchGroup, Proposal, Standard, Voter};
    use crate::storage::{IngestStore, MemoryStore, VoteStore};

    fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.insert_standard(&Standard::new(1, "relevance")).unwrap();
        store.insert_standard(&Standard::new(2, "clarity")).unwrap();
        store.insert_voter(&Voter::approved(1, "ann@example.org")).unwrap();
        store.insert_voter(&Voter::pending(2, "bob@example.org")).unwrap();
        store
            .insert_proposal(
                &Proposal::new(10, "Async IO").with_author(Author::new("Ann", "ann@example.org")),
            )
            .unwrap();
        store.insert_proposal(&Proposal::new(11, "Packaging")).unwrap();
        store.insert_proposal(&Proposal::new(12, "Typing")).unwrap();
        store
            .insert_batchgroup(
                &BatchGroup::new(5, "tooling").with_members([11, 12].map(ProposalId::new)),
            )
            .unwrap();
        Arc::new(store)
    }

    fn engine() -> ReviewEngine<MemoryStore> {
        ReviewEngine::with_config(
            store(),
            EngineConfig {
                rng_seed: Some(7),
                ..Default::default()
            },
        )
    }

    fn scores(a: i32, b: i32) -> BTreeMap<StandardId, i32> {
        BTreeMap::from([(StandardId::new(1), a), (StandardId::new(2), b)])
    }

    #[test]
    fn resubmission_keeps_one_vote() {
        let engine = engine();
        let voter = VoterId::new(1);
        let proposal = ProposalId::new(11);

        let first = engine.submit_vote(voter, proposal, &scores(0, 0), false).unwrap();
        let second = engine.submit_vote(voter, proposal, &scores(2, 1), true).unwrap();
        assert_eq!(first, second);

        let votes = engine.store().votes_for_proposal(proposal).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].scores, scores(2, 1));
        assert!(votes[0].nominate);
    }

    #[test]
    fn rejected_votes_write_nothing() {
        let engine = engine();

        let err = engine
            .submit_vote(VoterId::new(2), ProposalId::new(11), &scores(1, 1), false)
            .unwrap_err();
        assert!(matches!(err, ReviewError::Rejected(VoteRejection::NotApproved(_))));

        let err = engine
            .submit_vote(VoterId::new(1), ProposalId::new(99), &scores(1, 1), false)
            .unwrap_err();
        assert!(matches!(err, ReviewError::Rejected(VoteRejection::UnknownProposal(_))));

        let err = engine
            .submit_vote(VoterId::new(1), ProposalId::new(11), &scores(1, 3), false)
            .unwrap_err();
        assert!(matches!(err, ReviewError::Rejected(VoteRejection::ScoreOutOfRange { .. })));

        assert!(engine.store().all_votes().unwrap().is_empty());
    }

    #[test]
    fn reviewer_never_routed_to_own_or_voted_proposal() {
        let engine = engine();
        let ann = VoterId::new(1);

        let mut seen = BTreeSet::new();
        while let Some(next) = engine.next_for_reviewer("ANN@example.org", ann).unwrap() {
            assert_ne!(next, ProposalId::new(10));
            assert!(seen.insert(next), "routed twice to {}", next);
            engine.submit_vote(ann, next, &scores(1, 1), false).unwrap();
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn locked_group_refuses_batch_votes() {
        let engine = engine();
        let group = BatchGroupId::new(5);
        let accepted = BTreeSet::from([ProposalId::new(11)]);

        engine.submit_batch_vote(VoterId::new(1), group, &accepted).unwrap();
        engine.set_batch_lock(group, true).unwrap();

        let err = engine
            .submit_batch_vote(VoterId::new(1), group, &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, ReviewError::Rejected(VoteRejection::Locked(_))));
    }

    #[test]
    fn batch_vote_for_unknown_group_or_outsider() {
        let engine = engine();
        let err = engine
            .submit_batch_vote(VoterId::new(1), BatchGroupId::new(77), &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, ReviewError::Rejected(VoteRejection::UnknownBatchGroup(_))));

        let err = engine
            .submit_batch_vote(
                VoterId::new(1),
                BatchGroupId::new(5),
                &BTreeSet::from([ProposalId::new(10)]),
            )
            .unwrap_err();
        assert!(matches!(err, ReviewError::Rejected(VoteRejection::NotAMember { .. })));
    }

    #[test]
    fn rough_scores_join_consensus() {
        let engine = engine();
        let ann = VoterId::new(1);
        engine.submit_vote(ann, ProposalId::new(11), &scores(2, 2), false).unwrap();
        engine.submit_vote(ann, ProposalId::new(12), &scores(1, 1), false).unwrap();
        engine
            .submit_batch_vote(ann, BatchGroupId::new(5), &BTreeSet::from([ProposalId::new(12)]))
            .unwrap();
        engine.assign_proposal(ProposalId::new(11), None).unwrap();

        let rows = engine.rough_scores().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score.id, ProposalId::new(11));
        assert_eq!(rows[0].consensus, None);
        assert_eq!(rows[1].score.id, ProposalId::new(12));
        assert_eq!(rows[1].consensus, Some(100));
    }

    #[test]
    fn clustering_errors_surface_as_review_errors() {
        let engine = engine();
        let err = engine.auto_group_proposals(0, 0.5).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidParameter(_)));

        let err = engine.auto_group_proposals(3, 0.5).unwrap_err();
        assert!(matches!(err, ReviewError::InsufficientCorpus { documents: 3, .. }));
    }

    #[test]
    fn batch_stats_count_messages() {
        let engine = engine();
        engine
            .store()
            .add_batch_message(BatchGroupId::new(5), VoterId::new(1), "thoughts?")
            .unwrap();
        let stats = engine.batch_stats().unwrap();
        assert_eq!(stats[&BatchGroupId::new(5)].msgs, 1);
        assert_eq!(stats[&BatchGroupId::new(5)].voters, 0);
    }
}
