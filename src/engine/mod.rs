//! Review allocation and consensus aggregation
//!
//! The pure computations live in their own modules and take plain slices of
//! records; [`ReviewEngine`] wires them to a store.

pub mod allocation;
pub mod cluster;
pub mod consensus;
pub mod ranking;
mod review;
pub mod scoring;
pub mod summary;

pub use allocation::{Allocator, CoverageLevel};
pub use cluster::{ClusterAssignment, ClusterError, ClusterParams, Tokenizer};
pub use consensus::{BatchCoverage, BatchStats, GroupCoverage, Outcome};
pub use ranking::ScoredProposal;
pub use review::{ReviewEngine, ReviewError, ReviewResult, RoughScore};
pub use scoring::VoteRejection;
pub use summary::{ReviewSummary, ScreeningSummary, SecondRoundSummary};
