//! Typed records for the review process
//!
//! Every entity the engine reads (proposals, standards, voters, votes,
//! batch groups) has a fixed-field record here. Stores hand these out;
//! the engine never sees untyped rows.

mod batch;
mod ids;
mod proposal;
mod vote;


pub use batch::{BatchGroup, BatchMessage, BatchVote};
pub use ids::{BatchGroupId, BatchVoteId, MessageId, ProposalId, StandardId, VoteId, VoterId};
pub use proposal::{Author, Proposal, ProposalContent, TextField};
pub use vote::{Standard, Vote, Voter};
