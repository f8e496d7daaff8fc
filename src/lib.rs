//! Conclave: review allocation and consensus aggregation
//!
//! Supports a two-round crowd review of submitted proposals: reviewers score
//! proposals against a rubric and may nominate favourites, then a committee
//! votes on batch groups of the survivors.
//!
//! # Core Concepts
//!
//! - **Allocation**: routes each reviewer to a least-reviewed proposal they may score
//! - **Ranking**: normalised scores where a nomination counts as full marks
//! - **Consensus**: per-group agreement among second-round voters
//! - **Clustering**: advisory topic groups from proposal text (TF-IDF + LSA)
//!
//! # Example
//!
//! ```
//! use conclave::{MemoryStore, ReviewEngine};
//! use std::sync::Arc;
//!
//! let engine = ReviewEngine::new(Arc::new(MemoryStore::new()));
//! assert!(engine.score_proposals().unwrap().is_empty());
//! ```

pub mod config;
pub mod engine;
pub mod model;
pub mod storage;

pub use config::{ConfigError, EngineConfig};
pub use engine::{
    BatchCoverage, BatchStats, ClusterAssignment, CoverageLevel, Outcome, ReviewEngine,
    ReviewError, ReviewResult, ReviewSummary, RoughScore, ScoredProposal, VoteRejection,
};
pub use model::{
    Author, BatchGroup, BatchGroupId, BatchMessage, BatchVote, BatchVoteId, MessageId, Proposal,
    ProposalContent, ProposalId, Standard, StandardId, TextField, Vote, VoteId, Voter, VoterId,
};
pub use storage::{
    IngestStore, MemoryStore, OpenStore, ReviewStore, Snapshot, SqliteStore, StorageError,
    StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
