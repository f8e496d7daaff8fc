//! Advisory topic clustering through the engine

mod common;

use common::{memory_pool, pid, proposal};
use conclave::engine::cluster::cluster_members;
use conclave::storage::ProposalStore;
use conclave::{EngineConfig, MemoryStore, ReviewEngine, ReviewError, TextField};
use std::collections::BTreeSet;
use std::sync::Arc;

fn conference() -> MemoryStore {
    memory_pool()
        .voters([1])
        .proposals([
            proposal(1, "Django ORM deep dive", "querysets django orm migrations database"),
            proposal(2, "Scaling Django", "django database caching querysets"),
            proposal(3, "Pandas for analysts", "pandas dataframe groupby notebook analysis"),
            proposal(4, "Fast dataframes", "dataframe pandas arrow analysis performance"),
            proposal(5, "MicroPython robots", "micropython microcontroller robots sensors"),
            proposal(6, "Sensors with MicroPython", "sensors micropython microcontroller hardware"),
            proposal(7, "Old Django talk", "django orm querysets").withdrawn(),
        ])
        .build()
}

fn engine() -> ReviewEngine<MemoryStore> {
    ReviewEngine::with_config(
        Arc::new(conference()),
        EngineConfig {
            text_fields: vec![TextField::Title, TextField::Description],
            ..Default::default()
        },
    )
}

fn partition(engine: &ReviewEngine<MemoryStore>, topics: usize, threshold: f64) -> Vec<BTreeSet<i64>> {
    let assignment = engine.auto_group_proposals(topics, threshold).unwrap();
    cluster_members(&assignment)
        .into_iter()
        .map(|ids| ids.into_iter().map(|id| id.get()).collect())
        .collect()
}

#[test]
fn topics_fall_into_separate_clusters() {
    let groups = partition(&engine(), 3, 0.7);
    assert_eq!(
        groups,
        vec![
            BTreeSet::from([1, 2]),
            BTreeSet::from([3, 4]),
            BTreeSet::from([5, 6]),
        ]
    );
}

#[test]
fn withdrawn_proposals_are_not_clustered() {
    let assignment = engine().auto_group_proposals(3, 0.7).unwrap();
    assert!(!assignment.contains_key(&pid(7)));
    assert_eq!(assignment.len(), 6);
}

#[test]
fn clustering_is_idempotent() {
    let engine = engine();
    let first = engine.auto_group_proposals(4, 0.5).unwrap();
    let second = engine.auto_group_proposals(4, 0.5).unwrap();
    assert_eq!(first, second);
}

#[test]
fn clustering_never_writes_back() {
    let engine = engine();
    let before = engine.store().list_proposals().unwrap();
    engine.auto_group_proposals(3, 0.7).unwrap();
    assert_eq!(engine.store().list_proposals().unwrap(), before);
}

#[test]
fn low_threshold_merges_everything_related() {
    // Every pair scores above -1, so all proposals join one component
    let groups = partition(&engine(), 3, -1.0);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 6);
}

#[test]
fn empty_pool_is_an_insufficient_corpus() {
    let engine = ReviewEngine::new(Arc::new(MemoryStore::new()));
    let err = engine.auto_group_proposals(3, 0.5).unwrap_err();
    assert!(matches!(
        err,
        ReviewError::InsufficientCorpus {
            documents: 0,
            vocabulary: 0
        }
    ));
}

#[test]
fn configured_defaults_are_used() {
    let engine = ReviewEngine::with_config(
        Arc::new(conference()),
        EngineConfig::from_yaml_str("text_fields: [title, description]\ntopic_count: 3\nsimilarity_threshold: 0.7\n")
            .unwrap(),
    );
    let assignment = engine.auto_group_default().unwrap();
    assert_eq!(cluster_members(&assignment).len(), 3);
}
