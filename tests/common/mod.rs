//! Shared fixtures for the integration tests
//!
//! Builds small review pools on any store that accepts ingestion writes, so
//! the same scenario can run against `MemoryStore` and `SqliteStore`.

#![allow(dead_code)]

use conclave::{
    Author, BatchGroup, EngineConfig, IngestStore, MemoryStore, Proposal, ProposalContent,
    ProposalId, ReviewEngine, ReviewStore, Standard, StandardId, Voter, VoterId,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Seed used wherever a test needs reproducible allocation
pub const SEED: u64 = 20_240_517;

/// Two standards, ids 1 and 2
pub fn rubric() -> Vec<Standard> {
    vec![Standard::new(1, "Relevance"), Standard::new(2, "Clarity")]
}

/// Score map for standards 1 and 2
pub fn scores(first: i32, second: i32) -> BTreeMap<StandardId, i32> {
    BTreeMap::from([(StandardId::new(1), first), (StandardId::new(2), second)])
}

/// Approved voter `id` with address `voter{id}@example.org`
pub fn voter(id: i64) -> Voter {
    Voter::approved(id, format!("voter{}@example.org", id))
}

/// A proposal with title and description
pub fn proposal(id: i64, title: &str, description: &str) -> Proposal {
    Proposal::new(id, title).with_content(ProposalContent {
        title: title.to_string(),
        description: description.to_string(),
        ..Default::default()
    })
}

/// A proposal authored by voter `author`
pub fn authored(id: i64, title: &str, author: i64) -> Proposal {
    Proposal::new(id, title).with_author(Author::new(
        format!("Voter {}", author),
        format!("voter{}@example.org", author),
    ))
}

/// Builder for a store pre-loaded with a review pool
pub struct PoolBuilder<S: IngestStore> {
    store: S,
}

impl<S: IngestStore> PoolBuilder<S> {
    pub fn new(store: S) -> Self {
        for standard in rubric() {
            store.insert_standard(&standard).expect("insert standard");
        }
        Self { store }
    }

    pub fn voters(self, ids: impl IntoIterator<Item = i64>) -> Self {
        for id in ids {
            self.store.insert_voter(&voter(id)).expect("insert voter");
        }
        self
    }

    pub fn proposals(self, proposals: impl IntoIterator<Item = Proposal>) -> Self {
        for p in proposals {
            self.store.insert_proposal(&p).expect("insert proposal");
        }
        self
    }

    pub fn group(self, id: i64, name: &str, members: &[i64]) -> Self {
        let group = BatchGroup::new(id, name).with_members(members.iter().map(|m| ProposalId::new(*m)));
        self.store.insert_batchgroup(&group).expect("insert group");
        self
    }

    pub fn build(self) -> S {
        self.store
    }
}

/// Memory-backed pool builder
pub fn memory_pool() -> PoolBuilder<MemoryStore> {
    PoolBuilder::new(MemoryStore::new())
}

/// Engine over `store` with a fixed allocation seed
pub fn seeded_engine<S: ReviewStore>(store: S) -> ReviewEngine<S> {
    ReviewEngine::with_config(
        Arc::new(store),
        EngineConfig {
            rng_seed: Some(SEED),
            ..Default::default()
        },
    )
}

pub fn vid(id: i64) -> VoterId {
    VoterId::new(id)
}

pub fn pid(id: i64) -> ProposalId {
    ProposalId::new(id)
}
