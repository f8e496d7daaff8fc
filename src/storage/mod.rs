//! Storage backends for the review engine
//!
//! The engine talks to persistence through the collaborator traits in
//! `traits`. `SqliteStore` is the persistent implementation; `MemoryStore`
//! serves tests and one-shot computations.

mod memory;
mod snapshot;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use snapshot::{BatchVoteRecord, MessageRecord, Snapshot, VoteRecord};
pub use sqlite::SqliteStore;
pub use traits::{
    BatchStore, IngestStore, OpenStore, ProposalStore, ReviewStore, StandardStore, StorageError,
    StorageResult, VoteStore, VoterStore,
};
