//! Vote validation
//!
//! Pure checks run before anything is written. A rejected vote leaves the
//! store untouched.

use crate::model::{BatchGroup, BatchGroupId, ProposalId, Standard, StandardId, Voter, VoterId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Why a vote was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteRejection {
    #[error("Unknown voter: {0}")]
    UnknownVoter(VoterId),

    #[error("Voter {0} has not been approved")]
    NotApproved(VoterId),

    #[error("Unknown proposal: {0}")]
    UnknownProposal(ProposalId),

    #[error("Scores do not match the current standards (missing {missing:?}, unexpected {unexpected:?})")]
    StandardMismatch {
        missing: Vec<StandardId>,
        unexpected: Vec<StandardId>,
    },

    #[error("Score {score} for standard {standard} is outside 0..={max}")]
    ScoreOutOfRange {
        standard: StandardId,
        score: i32,
        max: i32,
    },

    #[error("Unknown batch group: {0}")]
    UnknownBatchGroup(BatchGroupId),

    #[error("Batch group {0} is locked")]
    Locked(BatchGroupId),

    #[error("Proposal {proposal} is not a member of batch group {group}")]
    NotAMember {
        group: BatchGroupId,
        proposal: ProposalId,
    },
}

/// The voter must exist and be approved
pub fn check_voter(id: VoterId, voter: Option<&Voter>) -> Result<(), VoteRejection> {
    match voter {
        None => Err(VoteRejection::UnknownVoter(id)),
        Some(v) if !v.approved => Err(VoteRejection::NotApproved(id)),
        Some(_) => Ok(()),
    }
}

/// Scores must cover exactly `standards`, each within `0..=max_score`
pub fn validate_scores(
    standards: &[Standard],
    scores: &BTreeMap<StandardId, i32>,
    max_score: i32,
) -> Result<(), VoteRejection> {
    let expected: BTreeSet<StandardId> = standards.iter().map(|s| s.id).collect();
    let given: BTreeSet<StandardId> = scores.keys().copied().collect();

    if expected != given {
        return Err(VoteRejection::StandardMismatch {
            missing: expected.difference(&given).copied().collect(),
            unexpected: given.difference(&expected).copied().collect(),
        });
    }

    if let Some((standard, score)) = scores
        .iter()
        .find(|(_, score)| !(0..=max_score).contains(*score))
    {
        return Err(VoteRejection::ScoreOutOfRange {
            standard: *standard,
            score: *score,
            max: max_score,
        });
    }

    Ok(())
}

/// The group must be open and every accepted proposal one of its members
pub fn validate_acceptance(
    group: &BatchGroup,
    accepted: &BTreeSet<ProposalId>,
) -> Result<(), VoteRejection> {
    if group.locked {
        return Err(VoteRejection::Locked(group.id));
    }
    match accepted.iter().find(|p| !group.members.contains(p)) {
        Some(proposal) => Err(VoteRejection::NotAMember {
            group: group.id,
            proposal: *proposal,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> Vec<Standard> {
        vec![Standard::new(1, "relevance"), Standard::new(2, "clarity")]
    }

    fn scores(pairs: &[(i64, i32)]) -> BTreeMap<StandardId, i32> {
        pairs.iter().map(|(s, v)| (StandardId::new(*s), *v)).collect()
    }

    #[test]
    fn accepts_complete_in_range_scores() {
        assert!(validate_scores(&rubric(), &scores(&[(1, 0), (2, 2)]), 2).is_ok());
    }

    #[test]
    fn reports_missing_and_unexpected_standards() {
        let err = validate_scores(&rubric(), &scores(&[(1, 1), (3, 1)]), 2).unwrap_err();
        assert_eq!(
            err,
            VoteRejection::StandardMismatch {
                missing: vec![StandardId::new(2)],
                unexpected: vec![StandardId::new(3)],
            }
        );
    }

    #[test]
    fn rejects_scores_outside_range() {
        let err = validate_scores(&rubric(), &scores(&[(1, 3), (2, 0)]), 2).unwrap_err();
        assert!(matches!(err, VoteRejection::ScoreOutOfRange { score: 3, max: 2, .. }));

        let err = validate_scores(&rubric(), &scores(&[(1, 1), (2, -1)]), 2).unwrap_err();
        assert!(matches!(err, VoteRejection::ScoreOutOfRange { score: -1, .. }));
    }

    #[test]
    fn empty_rubric_requires_empty_scores() {
        assert!(validate_scores(&[], &BTreeMap::new(), 2).is_ok());
        assert!(validate_scores(&[], &scores(&[(1, 1)]), 2).is_err());
    }

    #[test]
    fn voter_must_exist_and_be_approved() {
        let id = VoterId::new(4);
        assert_eq!(check_voter(id, None), Err(VoteRejection::UnknownVoter(id)));
        assert_eq!(
            check_voter(id, Some(&Voter::pending(4, "p@example.org"))),
            Err(VoteRejection::NotApproved(id))
        );
        assert!(check_voter(id, Some(&Voter::approved(4, "a@example.org"))).is_ok());
    }

    #[test]
    fn acceptance_limited_to_open_group_members() {
        let group = BatchGroup::new(9, "web").with_members([ProposalId::new(1), ProposalId::new(2)]);
        let accept = |ids: &[i64]| ids.iter().map(|i| ProposalId::new(*i)).collect::<BTreeSet<_>>();

        assert!(validate_acceptance(&group, &accept(&[])).is_ok());
        assert!(validate_acceptance(&group, &accept(&[1, 2])).is_ok());
        assert_eq!(
            validate_acceptance(&group, &accept(&[1, 5])),
            Err(VoteRejection::NotAMember {
                group: BatchGroupId::new(9),
                proposal: ProposalId::new(5),
            })
        );
        assert_eq!(
            validate_acceptance(&group.clone().locked(), &accept(&[])),
            Err(VoteRejection::Locked(BatchGroupId::new(9)))
        );
    }
}
