//! End-to-end review scenarios over the in-memory store
//!
//! Each test walks one documented behaviour through the public engine API:
//! vote submission, routing, ranking and second-round consensus.

mod common;

use common::{authored, memory_pool, pid, proposal, scores, seeded_engine, vid};
use conclave::storage::VoteStore;
use conclave::{BatchGroupId, Outcome, Proposal, ReviewError, VoteRejection};
use std::collections::{BTreeSet, HashMap};

#[test]
fn nomination_doubles_a_split_decision() {
    let store = memory_pool()
        .voters([1, 2])
        .proposals([proposal(42, "Structural pattern matching", "match statements")])
        .build();
    let engine = seeded_engine(store);

    engine.submit_vote(vid(1), pid(42), &scores(2, 2), false).unwrap();
    engine.submit_vote(vid(2), pid(42), &scores(0, 0), true).unwrap();

    let ranking = engine.score_proposals().unwrap();
    assert_eq!(ranking.len(), 1);
    let row = &ranking[0];
    assert_eq!(row.id, pid(42));
    assert_eq!(row.raw_score, 50);
    assert_eq!(row.nomination_weighted_score, 100);
    assert_eq!(row.delta, 50);
    assert_eq!(row.nomination_count, 1);
    assert_eq!(row.rank, 0);
}

#[test]
fn three_of_four_voters_advance_one_talk() {
    let store = memory_pool()
        .voters([1, 2, 3, 4])
        .proposals([proposal(7, "Packaging", ""), proposal(8, "Wheels", "")])
        .group(1, "G", &[7, 8])
        .build();
    let engine = seeded_engine(store);
    let g = BatchGroupId::new(1);

    for voter in [1, 2, 3] {
        engine
            .submit_batch_vote(vid(voter), g, &BTreeSet::from([pid(7)]))
            .unwrap();
    }
    engine.submit_batch_vote(vid(4), g, &BTreeSet::new()).unwrap();

    let coverage = engine.batch_coverage().unwrap();
    assert_eq!(coverage[&g][&Outcome::Proposal(pid(7))], 75);
    assert_eq!(coverage[&g][&Outcome::None], 25);
    assert_eq!(coverage[&g][&Outcome::Proposal(pid(8))], 0);

    let stats = engine.batch_stats().unwrap();
    assert_eq!(stats[&g].consensus, 75);
    assert_eq!(stats[&g].voters, 4);
    assert_eq!(stats[&g].nominated_talks, 1);
    assert_eq!(stats[&g].nominations, 3);
}

#[test]
fn routing_prefers_the_least_reviewed() {
    let store = memory_pool()
        .voters([1, 9])
        .proposals([
            proposal(1, "one", ""),
            proposal(2, "two", ""),
            proposal(3, "three", ""),
        ])
        .build();
    let engine = seeded_engine(store);
    engine.submit_vote(vid(1), pid(2), &scores(1, 1), false).unwrap();

    let mut picks: HashMap<i64, usize> = HashMap::new();
    for _ in 0..1000 {
        let pick = engine
            .next_for_reviewer("voter9@example.org", vid(9))
            .unwrap()
            .expect("candidates remain");
        *picks.entry(pick.get()).or_insert(0) += 1;
    }

    assert_eq!(picks.keys().copied().collect::<BTreeSet<_>>(), BTreeSet::from([1, 3]));
    for count in picks.values() {
        assert!((400..=600).contains(count), "unbalanced picks: {:?}", picks);
    }
}

#[test]
fn reviewer_works_through_the_whole_pool() {
    let store = memory_pool()
        .voters([1, 2])
        .proposals([
            authored(1, "mine", 1),
            proposal(2, "b", ""),
            proposal(3, "c", ""),
            proposal(4, "d", "").withdrawn(),
            proposal(5, "e", ""),
        ])
        .build();
    let engine = seeded_engine(store);

    // Voter 2 reviews 3 first, so it is never the least covered for voter 1
    engine.submit_vote(vid(2), pid(3), &scores(1, 1), false).unwrap();

    let mut order = Vec::new();
    while let Some(next) = engine.next_for_reviewer("VOTER1@example.org", vid(1)).unwrap() {
        order.push(next.get());
        engine.submit_vote(vid(1), next, &scores(2, 1), false).unwrap();
    }

    assert_eq!(order.len(), 3);
    assert_eq!(order[2], 3);
    assert!(!order.contains(&1));
    assert!(!order.contains(&4));
}

#[test]
fn repeated_submissions_leave_a_single_vote() {
    let store = memory_pool().voters([1]).proposals([proposal(1, "a", "")]).build();
    let engine = seeded_engine(store);

    let ids: BTreeSet<_> = (0..5)
        .map(|i| {
            engine
                .submit_vote(vid(1), pid(1), &scores(i % 3, 2), i % 2 == 0)
                .unwrap()
        })
        .collect();
    assert_eq!(ids.len(), 1);

    let votes = engine.store().votes_for_proposal(pid(1)).unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].scores, scores(1, 2));
    assert!(votes[0].nominate);
    assert_eq!(engine.store().vote_counts().unwrap()[&pid(1)], 1);
}

#[test]
fn incomplete_rubric_is_rejected_without_writing() {
    let store = memory_pool().voters([1]).proposals([proposal(1, "a", "")]).build();
    let engine = seeded_engine(store);

    let mut partial = scores(1, 1);
    partial.remove(&conclave::StandardId::new(2));
    let err = engine.submit_vote(vid(1), pid(1), &partial, false).unwrap_err();

    assert!(matches!(
        err,
        ReviewError::Rejected(VoteRejection::StandardMismatch { .. })
    ));
    assert!(engine.store().all_votes().unwrap().is_empty());
}

#[test]
fn progress_tracks_coverage_levels() {
    let store = memory_pool()
        .voters([1, 2])
        .proposals((1..=4).map(|i| Proposal::new(i, format!("p{}", i))))
        .build();
    let engine = seeded_engine(store);

    engine.submit_vote(vid(1), pid(1), &scores(1, 1), false).unwrap();
    engine.submit_vote(vid(2), pid(1), &scores(1, 1), false).unwrap();
    engine.submit_vote(vid(1), pid(2), &scores(1, 1), false).unwrap();

    let levels: Vec<(u32, usize)> = engine
        .coverage_progress()
        .unwrap()
        .iter()
        .map(|l| (l.vote_count, l.proposals))
        .collect();
    assert_eq!(levels, vec![(0, 2), (1, 1), (2, 1)]);
}

#[test]
fn summary_reports_both_rounds() {
    let store = memory_pool()
        .voters([1, 2])
        .proposals([authored(1, "a", 1), proposal(2, "b", ""), proposal(3, "c", "")])
        .group(10, "finalists", &[2, 3])
        .build();
    let engine = seeded_engine(store);

    engine.submit_vote(vid(1), pid(2), &scores(2, 2), true).unwrap();
    engine.submit_vote(vid(1), pid(3), &scores(1, 2), false).unwrap();
    engine.submit_vote(vid(2), pid(1), &scores(0, 1), false).unwrap();
    engine
        .submit_batch_vote(vid(2), BatchGroupId::new(10), &BTreeSet::from([pid(2)]))
        .unwrap();

    let summary = engine.review_summary().unwrap();
    assert_eq!(summary.screening.proposals, 3);
    assert_eq!(summary.screening.reviews, 3);
    assert_eq!(summary.screening.nominations, 1);
    assert_eq!(summary.screening.voters, 2);
    assert_eq!(summary.screening.min_reviews, 1);
    assert_eq!(summary.screening.full_coverage_voters, 1);
    assert_eq!(summary.second_round.proposals, 2);
    assert_eq!(summary.second_round.batches, 1);
    assert_eq!(summary.second_round.reviews, 1);
    assert_eq!(summary.second_round.voters, 1);
}
